//! 命令行参数定义
//!
//! 使用clap定义应用程序的命令行接口

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Service Pulse - HTTP 服务状态监控工具
#[derive(Parser, Debug, Clone)]
#[command(
    name = "service-pulse",
    version = crate::VERSION,
    about = crate::APP_DESCRIPTION,
    long_about = None
)]
pub struct Args {
    /// 配置文件路径
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "配置文件路径",
        env = "SERVICE_PULSE_CONFIG"
    )]
    pub config: Option<PathBuf>,

    /// 日志级别，未指定时使用配置文件中的 log_level
    #[arg(
        short,
        long,
        value_enum,
        help = "日志级别",
        env = "SERVICE_PULSE_LOG_LEVEL"
    )]
    pub log_level: Option<LogLevel>,

    /// 日志文件路径
    #[arg(long, value_name = "FILE", help = "日志文件路径（不再输出到控制台）")]
    pub log_file: Option<PathBuf>,

    /// 是否使用JSON日志
    #[arg(long, help = "以JSON格式输出日志")]
    pub json_logs: bool,

    /// 子命令
    #[command(subcommand)]
    pub command: Commands,
}

/// 日志级别枚举
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogLevel {
    /// 跟踪级别
    Trace,
    /// 调试级别
    Debug,
    /// 信息级别
    Info,
    /// 警告级别
    Warn,
    /// 错误级别
    Error,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => log::LevelFilter::Trace,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Error => log::LevelFilter::Error,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "trace"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

/// 子命令定义
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// 启动监控服务（前台运行，Ctrl+C 停止）
    Start {
        /// 检测间隔（分钟），覆盖配置文件
        #[arg(
            short,
            long,
            value_name = "MINUTES",
            help = "检测间隔（分钟）",
            env = "SERVICE_PULSE_INTERVAL"
        )]
        interval: Option<u64>,

        /// 不启动Web服务器
        #[arg(long, help = "不启动状态页和指标端点")]
        no_web: bool,
    },

    /// 执行一次性检测
    Check {
        /// 服务名称（可选，不指定则检测所有服务）
        #[arg(value_name = "SERVICE", help = "服务名称")]
        service: Option<String>,

        /// 输出格式
        #[arg(short, long, value_enum, default_value = "text", help = "输出格式")]
        format: OutputFormat,

        /// 超时时间（秒），覆盖配置文件
        #[arg(short, long, value_name = "SECONDS", help = "超时时间（秒）")]
        timeout: Option<u64>,
    },

    /// 初始化配置文件
    Init {
        /// 配置文件路径
        #[arg(
            value_name = "FILE",
            help = "配置文件路径",
            default_value = "config.toml"
        )]
        config_path: PathBuf,

        /// 是否覆盖现有文件
        #[arg(short, long, help = "覆盖现有文件")]
        force: bool,
    },

    /// 验证配置文件
    Validate {
        /// 配置文件路径
        #[arg(value_name = "FILE", help = "配置文件路径")]
        config_path: Option<PathBuf>,

        /// 是否显示详细信息
        #[arg(short, long, help = "显示详细信息")]
        verbose: bool,
    },

    /// 显示版本信息
    Version {
        /// 输出格式
        #[arg(short, long, value_enum, default_value = "text", help = "输出格式")]
        format: OutputFormat,
    },

    /// 测试通知功能
    TestNotification {
        /// 测试消息内容
        #[arg(short, long, default_value = "这是一条测试消息", help = "测试消息内容")]
        message: String,
    },
}

/// 输出格式枚举
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    /// 文本格式
    Text,
    /// JSON格式
    Json,
    /// 表格格式
    Table,
}

impl Args {
    /// 解析命令行参数
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// 获取配置文件路径
    pub fn get_config_path(&self) -> PathBuf {
        self.config
            .clone()
            .unwrap_or_else(crate::config::get_default_config_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_start_with_overrides() {
        let args = Args::try_parse_from([
            "service-pulse",
            "--config",
            "/etc/pulse.toml",
            "--log-level",
            "debug",
            "start",
            "--interval",
            "1",
            "--no-web",
        ])
        .unwrap();

        assert_eq!(args.get_config_path(), PathBuf::from("/etc/pulse.toml"));
        assert_eq!(args.log_level, Some(LogLevel::Debug));
        match args.command {
            Commands::Start { interval, no_web } => {
                assert_eq!(interval, Some(1));
                assert!(no_web);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_check_defaults() {
        let args = Args::try_parse_from(["service-pulse", "check", "HELB"]).unwrap();

        match args.command {
            Commands::Check {
                service,
                format,
                timeout,
            } => {
                assert_eq!(service.as_deref(), Some("HELB"));
                assert_eq!(format, OutputFormat::Text);
                assert_eq!(timeout, None);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_log_level_conversion() {
        assert_eq!(log::LevelFilter::from(LogLevel::Trace), log::LevelFilter::Trace);
        assert_eq!(log::LevelFilter::from(LogLevel::Warn), log::LevelFilter::Warn);
        assert_eq!(LogLevel::Error.to_string(), "error");
    }

    #[test]
    fn test_missing_subcommand_is_error() {
        assert!(Args::try_parse_from(["service-pulse"]).is_err());
    }
}
