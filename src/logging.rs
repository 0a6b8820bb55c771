//! 日志系统模块
//!
//! 提供结构化日志配置和探测、通知事件的日志辅助函数

use crate::health::result::Classification;
use log::LevelFilter;
use serde_json::json;
use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};
use tracing_subscriber::{fmt, prelude::*, registry, EnvFilter, Layer};

/// 全局日志初始化状态
#[derive(Debug, Default)]
struct GlobalLoggingState {
    /// 是否已初始化
    initialized: bool,
    /// 当前配置
    current_config: Option<LogConfig>,
}

/// 全局日志状态管理器
static GLOBAL_LOGGING_STATE: OnceLock<Mutex<GlobalLoggingState>> = OnceLock::new();

/// 日志配置结构
#[derive(Debug, Clone, PartialEq)]
pub struct LogConfig {
    /// 日志级别
    pub level: LevelFilter,
    /// 日志文件路径（可选）
    pub file_path: Option<PathBuf>,
    /// 是否输出到控制台
    pub console: bool,
    /// 是否使用JSON格式
    pub json_format: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LevelFilter::Info,
            file_path: None,
            console: true,
            json_format: false,
        }
    }
}

/// 日志系统管理器
#[derive(Debug)]
pub struct LoggingSystem {
    config: LogConfig,
}

impl LoggingSystem {
    /// 初始化日志系统
    ///
    /// 重复调用不会重复安装 subscriber，只更新记录的配置。
    pub fn setup_logging(config: LogConfig) -> anyhow::Result<Self> {
        let state_mutex =
            GLOBAL_LOGGING_STATE.get_or_init(|| Mutex::new(GlobalLoggingState::default()));
        let mut state = state_mutex.lock().unwrap_or_else(|e| e.into_inner());

        if !state.initialized {
            Self::init_log_tracer()?;
            Self::init_tracing_subscriber(&config)?;
            state.initialized = true;
        }
        state.current_config = Some(config.clone());

        Ok(Self { config })
    }

    pub fn config(&self) -> &LogConfig {
        &self.config
    }

    /// 初始化 LogTracer（log crate 到 tracing 的桥接）
    fn init_log_tracer() -> anyhow::Result<()> {
        use tracing_log::LogTracer;

        static LOG_TRACER_INIT: OnceLock<Result<(), String>> = OnceLock::new();

        let result = LOG_TRACER_INIT.get_or_init(|| LogTracer::init().map_err(|e| e.to_string()));
        result
            .as_ref()
            .map_err(|e| anyhow::anyhow!("LogTracer初始化失败: {}", e))?;
        Ok(())
    }

    /// 初始化 tracing subscriber
    fn init_tracing_subscriber(config: &LogConfig) -> anyhow::Result<()> {
        let env_filter = EnvFilter::from_default_env()
            .add_directive(Self::convert_level_to_directive(config.level));

        let result = match (&config.file_path, config.console) {
            (Some(file_path), false) => {
                let file = std::fs::File::create(file_path)
                    .map_err(|e| anyhow::anyhow!("创建日志文件失败: {}", e))?;
                let file_layer = fmt::layer()
                    .with_writer(Mutex::new(file))
                    .with_ansi(false)
                    .with_timer(fmt::time::ChronoUtc::rfc_3339());
                let file_layer = if config.json_format {
                    file_layer.json().boxed()
                } else {
                    file_layer.boxed()
                };
                registry().with(env_filter).with(file_layer).try_init()
            }
            _ => {
                let fmt_layer = if config.json_format {
                    fmt::layer()
                        .json()
                        .with_timer(fmt::time::ChronoUtc::rfc_3339())
                        .boxed()
                } else {
                    fmt::layer()
                        .with_timer(fmt::time::ChronoUtc::rfc_3339())
                        .with_target(false)
                        .boxed()
                };
                registry().with(env_filter).with(fmt_layer).try_init()
            }
        };

        match result {
            Ok(()) => {
                tracing::debug!("日志配置: {:?}", config);
                Ok(())
            }
            Err(e) => {
                let error_msg = e.to_string();
                if error_msg.contains("global default trace dispatcher has already been set") {
                    tracing::debug!("日志系统已经初始化过了");
                    Ok(())
                } else {
                    Err(anyhow::anyhow!("tracing subscriber初始化失败: {}", error_msg))
                }
            }
        }
    }

    /// 将 log::LevelFilter 转换为 tracing 的指令
    fn convert_level_to_directive(level: LevelFilter) -> tracing_subscriber::filter::Directive {
        use tracing_subscriber::filter::{Directive, LevelFilter as TracingLevel};
        let level = match level {
            LevelFilter::Off => TracingLevel::OFF,
            LevelFilter::Error => TracingLevel::ERROR,
            LevelFilter::Warn => TracingLevel::WARN,
            LevelFilter::Info => TracingLevel::INFO,
            LevelFilter::Debug => TracingLevel::DEBUG,
            LevelFilter::Trace => TracingLevel::TRACE,
        };
        Directive::from(level)
    }

    /// 检查日志系统是否已初始化
    pub fn is_initialized() -> bool {
        GLOBAL_LOGGING_STATE
            .get()
            .map(|m| m.lock().unwrap_or_else(|e| e.into_inner()).initialized)
            .unwrap_or(false)
    }

    /// 获取当前日志配置（如果已初始化）
    pub fn current_config() -> Option<LogConfig> {
        GLOBAL_LOGGING_STATE
            .get()
            .and_then(|m| m.lock().unwrap_or_else(|e| e.into_inner()).current_config.clone())
    }

    fn json_enabled() -> bool {
        Self::current_config().map(|c| c.json_format).unwrap_or(false)
    }

    /// 记录一次探测结果
    pub fn probe_log(
        service_name: &str,
        status: Classification,
        status_code: Option<u16>,
        latency_ms: Option<u64>,
    ) {
        if Self::json_enabled() {
            let entry = json!({
                "type": "probe",
                "service": service_name,
                "status": status,
                "status_code": status_code,
                "latency_ms": latency_ms,
            });
            tracing::info!("{entry}");
        } else {
            tracing::info!(
                "PROBE: {} - {} (HTTP {}, {})",
                service_name,
                status,
                status_code.map(|c| c.to_string()).unwrap_or_else(|| "-".to_string()),
                latency_ms
                    .map(|l| format!("{l}ms"))
                    .unwrap_or_else(|| "-".to_string())
            );
        }
    }

    /// 记录一次告警投递
    pub fn notification_log(
        service_name: &str,
        status: Classification,
        channel: &str,
        success: bool,
        error: Option<&str>,
    ) {
        let entry = json!({
            "type": "notification",
            "service": service_name,
            "status": status,
            "channel": channel,
            "success": success,
            "error": error.unwrap_or(""),
        });

        match (Self::json_enabled(), success) {
            (true, true) => tracing::info!("{entry}"),
            (true, false) => tracing::error!("{entry}"),
            (false, true) => tracing::info!(
                "NOTIFICATION: {} {} via {} - SUCCESS",
                service_name,
                status,
                channel
            ),
            (false, false) => tracing::error!(
                "NOTIFICATION: {} {} via {} - FAILED {}",
                service_name,
                status,
                channel,
                error.unwrap_or("")
            ),
        }
    }
}
