//! 命令处理逻辑
//!
//! 实现各种CLI命令的处理逻辑

use crate::cli::args::{Args, Commands, OutputFormat};
use crate::config::{validate_config, Config, ConfigLoader, TomlConfigLoader};
use crate::error::{ConfigError, Result, ServicePulseError};
use crate::health::prober::HttpProber;
use crate::health::result::Classification;
use crate::health::scheduler::Scheduler;
use crate::monitor::{EndpointStatus, Monitor, MonitorSettings};
use crate::notification::{AlertSink, NotificationSender, WebhookSender};
use crate::persistence::HistoryFile;
use crate::web::{WebServer, WebState};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{error, info};

/// `init` 命令写入的配置模板
pub const DEFAULT_CONFIG_TEMPLATE: &str = include_str!("../../demos/config.toml");

/// 命令处理器trait
#[async_trait]
pub trait Command: Send + Sync {
    /// 执行命令
    async fn execute(&self, args: &Args) -> Result<()>;
}

/// 加载并验证配置文件
async fn load_config(path: &Path) -> Result<Config> {
    TomlConfigLoader::new(true).load_from_file(path).await
}

/// 版本命令
pub struct VersionCommand;

#[async_trait]
impl Command for VersionCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        if let Commands::Version { format } = &args.command {
            match format {
                OutputFormat::Json => {
                    let version_info = serde_json::json!({
                        "name": crate::APP_NAME,
                        "version": crate::VERSION,
                        "description": crate::APP_DESCRIPTION
                    });
                    println!("{}", serde_json::to_string_pretty(&version_info)?);
                }
                OutputFormat::Text | OutputFormat::Table => {
                    println!("{} v{}", crate::APP_NAME, crate::VERSION);
                    println!("{}", crate::APP_DESCRIPTION);
                }
            }
        }
        Ok(())
    }
}

/// 初始化命令
pub struct InitCommand;

#[async_trait]
impl Command for InitCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        if let Commands::Init { config_path, force } = &args.command {
            if self.create_config_file(config_path, *force).await? {
                println!("配置文件已创建: {}", config_path.display());
                println!("请编辑配置文件以添加您的服务配置");
            } else {
                eprintln!("配置文件已存在: {}", config_path.display());
                eprintln!("使用 --force 参数覆盖现有文件");
            }
        }
        Ok(())
    }
}

impl InitCommand {
    /// 写入配置模板
    ///
    /// 文件已存在且未指定 `force` 时不写入，返回 `false`。
    pub async fn create_config_file(&self, config_path: &Path, force: bool) -> Result<bool> {
        if config_path.exists() && !force {
            return Ok(false);
        }

        if let Some(parent) = config_path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        tokio::fs::write(config_path, DEFAULT_CONFIG_TEMPLATE).await?;
        Ok(true)
    }
}

/// 验证命令
pub struct ValidateCommand;

#[async_trait]
impl Command for ValidateCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        if let Commands::Validate {
            config_path,
            verbose,
        } = &args.command
        {
            let config_file = config_path
                .clone()
                .unwrap_or_else(|| args.get_config_path());

            self.validate_config_file(&config_file, *verbose).await
        } else {
            Ok(())
        }
    }
}

impl ValidateCommand {
    /// 验证配置文件
    async fn validate_config_file(&self, config_path: &Path, verbose: bool) -> Result<()> {
        println!("验证配置文件: {}", config_path.display());

        let config = load_config(config_path).await?;
        let global = &config.global;

        if verbose {
            println!("配置验证通过！");
            println!("全局配置:");
            println!("  请求超时: {}秒", global.timeout_seconds);
            println!("  慢响应阈值: {}ms", global.slow_threshold_ms);
            println!("  检测间隔: {}分钟", global.check_interval_minutes);
            println!("  保存间隔: {}分钟", global.save_interval_minutes);
            println!("  历史条数: {}", global.history_entries);
            println!("  状态文件: {}", global.state_file.display());
            println!("  日志级别: {}", global.log_level);
            if global.web.enabled {
                println!("  Web服务器: {}:{}", global.web.bind_address, global.web.port);
            } else {
                println!("  Web服务器: 已禁用");
            }
            println!(
                "  通知webhook: {}",
                global
                    .notification
                    .webhook_url
                    .as_deref()
                    .unwrap_or("未配置")
            );

            println!("服务配置:");
            for (i, service) in config.services.iter().enumerate() {
                println!("  {}. {} ({})", i + 1, service.name, service.url);
            }
        } else {
            println!("✓ 配置文件验证通过");
            println!("✓ 找到 {} 个服务配置", config.services.len());
        }

        Ok(())
    }
}

/// 检测命令
pub struct CheckCommand;

#[async_trait]
impl Command for CheckCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        if let Commands::Check {
            service,
            format,
            timeout,
        } = &args.command
        {
            let config = load_config(&args.get_config_path()).await?;
            let Some(statuses) = self
                .perform_check(&config, service.as_deref(), *timeout)
                .await?
            else {
                if let Some(name) = service {
                    eprintln!("未找到名为 '{name}' 的服务");
                }
                return Ok(());
            };

            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&statuses)?),
                OutputFormat::Table => self.print_table_results(&statuses),
                OutputFormat::Text => self.print_text_results(&statuses),
            }
        }
        Ok(())
    }
}

impl CheckCommand {
    /// 对配置中的服务执行一次检测
    ///
    /// 一次性检测不发送告警。指定的服务不存在时返回 `None`。
    pub async fn perform_check(
        &self,
        config: &Config,
        service_name: Option<&str>,
        timeout: Option<u64>,
    ) -> Result<Option<Vec<EndpointStatus>>> {
        let endpoints: Vec<_> = config
            .services
            .iter()
            .filter(|s| service_name.map_or(true, |name| s.name == name))
            .cloned()
            .collect();

        if endpoints.is_empty() {
            return Ok(None);
        }

        let mut settings = MonitorSettings::from_global(&config.global);
        if let Some(seconds) = timeout {
            settings.timeout = Duration::from_secs(seconds);
        }

        let prober = HttpProber::new()
            .map_err(|e| ServicePulseError::Other(anyhow::anyhow!("创建HTTP客户端失败: {}", e)))?;
        let monitor = Monitor::new(endpoints, settings, Arc::new(prober), AlertSink::NoOp)?;

        monitor.tick().await;
        Ok(Some(monitor.statuses().await))
    }

    fn status_icon(status: Classification) -> &'static str {
        match status {
            Classification::Ok => "✓",
            Classification::Slow => "⚠",
            Classification::Down => "✗",
        }
    }

    /// 打印文本格式结果
    fn print_text_results(&self, statuses: &[EndpointStatus]) {
        for status in statuses {
            println!(
                "{} {} ({}) - {} - HTTP {} - {}",
                Self::status_icon(status.status),
                status.name,
                status.url,
                status.status,
                status
                    .status_code
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "N/A".to_string()),
                status
                    .latency_ms
                    .map(|l| format!("{l}ms"))
                    .unwrap_or_else(|| "N/A".to_string())
            );
        }
    }

    /// 打印表格格式结果
    fn print_table_results(&self, statuses: &[EndpointStatus]) {
        println!(
            "{:<20} {:<8} {:<8} {:<12} {:<40}",
            "服务名称", "状态", "状态码", "响应时间", "URL"
        );
        println!("{}", "-".repeat(92));

        for status in statuses {
            println!(
                "{:<20} {:<8} {:<8} {:<12} {:<40}",
                status.name,
                status.status.to_string(),
                status
                    .status_code
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "N/A".to_string()),
                status
                    .latency_ms
                    .map(|l| format!("{l}ms"))
                    .unwrap_or_else(|| "N/A".to_string()),
                status.url
            );
        }
    }
}

/// 启动命令
pub struct StartCommand;

#[async_trait]
impl Command for StartCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        if let Commands::Start { interval, no_web } = &args.command {
            let config_path = args.get_config_path();
            let mut config = load_config(&config_path).await?;

            if let Some(minutes) = interval {
                info!("使用命令行指定的检测间隔: {}分钟", minutes);
                config.global.check_interval_minutes = *minutes;
                validate_config(&config).map_err(ConfigError::ValidationError)?;
            }

            let (shutdown_tx, _) = broadcast::channel(1);

            let signal_tx = shutdown_tx.clone();
            tokio::spawn(async move {
                match signal::ctrl_c().await {
                    Ok(()) => {
                        info!("收到中断信号，正在停止服务...");
                        let _ = signal_tx.send(());
                    }
                    Err(err) => {
                        error!("监听中断信号失败: {}", err);
                        return;
                    }
                }

                // 第二次中断直接退出，不再等待最终保存
                if signal::ctrl_c().await.is_ok() {
                    error!("再次收到中断信号，强制退出");
                    std::process::exit(130);
                }
            });

            run_service(config, !*no_web, shutdown_tx).await?;
        }
        Ok(())
    }
}

/// 运行监控服务直到收到关闭信号
///
/// 启动时从状态文件恢复历史记录；停止时等待调度任务退出并保存最终快照。
pub async fn run_service(
    config: Config,
    enable_web: bool,
    shutdown_tx: broadcast::Sender<()>,
) -> Result<()> {
    // 所有接收端在第一个 await 之前订阅，之后发送的关闭信号不会丢失
    let mut shutdown_rx = shutdown_tx.subscribe();
    let check_shutdown_rx = shutdown_tx.subscribe();
    let persist_shutdown_rx = shutdown_tx.subscribe();
    let web_shutdown_rx = shutdown_tx.subscribe();

    let monitor = Arc::new(Monitor::from_config(&config)?);
    let history_file = HistoryFile::new(config.global.state_file.clone());
    history_file.restore_into(monitor.history()).await;

    let web_task = if enable_web && config.global.web.enabled {
        let server = WebServer::new(config.global.web.clone(), WebState::new(Arc::clone(&monitor)));
        Some(tokio::spawn(async move { server.run(web_shutdown_rx).await }))
    } else {
        info!("Web服务器已禁用");
        None
    };

    let handle = Scheduler::new(
        Arc::clone(&monitor),
        history_file,
        config.global.check_interval(),
        config.global.save_interval(),
    )
    .spawn_with(check_shutdown_rx, persist_shutdown_rx);

    info!("监控服务已启动");

    let _ = shutdown_rx.recv().await;
    info!("正在停止监控服务...");

    handle.finish().await?;

    if let Some(task) = web_task {
        match task.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!("Web服务器运行失败: {}", e),
            Err(e) => error!("Web服务器任务异常退出: {}", e),
        }
    }

    info!("监控服务已停止");
    Ok(())
}

/// 测试通知命令
pub struct TestNotificationCommand;

#[async_trait]
impl Command for TestNotificationCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        if let Commands::TestNotification { message } = &args.command {
            let config = load_config(&args.get_config_path()).await?;
            self.test_notification(&config, message).await
        } else {
            Ok(())
        }
    }
}

impl TestNotificationCommand {
    /// 通过配置的webhook发送测试消息
    async fn test_notification(&self, config: &Config, message: &str) -> Result<()> {
        let Some(sender) = WebhookSender::from_config(&config.global.notification)? else {
            println!("❌ 未配置通知webhook URL");
            println!("请在配置文件中设置 global.notification.webhook_url");
            return Ok(());
        };

        println!("🔗 使用webhook URL: {}", sender.webhook_url());

        let text = format!(
            "🧪 {} 通知测试 – {}\n{}",
            crate::APP_NAME,
            chrono::Local::now().format("%b %d %H:%M"),
            message
        );

        println!("📤 发送测试消息...");
        match sender.send(&text).await {
            Ok(()) => println!("✅ 测试消息发送成功！"),
            Err(e) => {
                println!("❌ 测试消息发送失败: {e}");
                println!("请检查webhook URL是否正确以及网络连接是否正常");
            }
        }

        Ok(())
    }
}
