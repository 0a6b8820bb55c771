//! Service Pulse 主程序入口
//!
//! HTTP 服务状态监控工具

use anyhow::{Context, Result};
use clap::Parser;
use service_pulse::cli::args::{Args, Commands};
use service_pulse::cli::commands::{
    CheckCommand, Command, InitCommand, StartCommand, TestNotificationCommand, ValidateCommand,
    VersionCommand,
};
use service_pulse::config::{ConfigLoader, TomlConfigLoader};
use service_pulse::logging::{LogConfig, LoggingSystem};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_config = LogConfig {
        level: resolve_log_level(&args).await,
        file_path: args.log_file.clone(),
        console: args.log_file.is_none(),
        json_format: args.json_logs,
    };

    let _logging_system = LoggingSystem::setup_logging(log_config).context("初始化日志系统失败")?;

    info!("Service Pulse v{} 启动", service_pulse::VERSION);

    if let Err(e) = execute_command(&args).await {
        error!("命令执行失败: {}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// 确定日志级别
///
/// 命令行参数优先，其次是配置文件中的 `log_level`，都不可用时为 info。
async fn resolve_log_level(args: &Args) -> log::LevelFilter {
    if let Some(level) = args.log_level {
        return level.into();
    }

    TomlConfigLoader::new(true)
        .load_from_file(args.get_config_path())
        .await
        .ok()
        .and_then(|config| config.global.log_level.parse().ok())
        .unwrap_or(log::LevelFilter::Info)
}

/// 执行CLI命令
async fn execute_command(args: &Args) -> Result<()> {
    let command: Box<dyn Command> = match &args.command {
        Commands::Start { .. } => Box::new(StartCommand),
        Commands::Check { .. } => Box::new(CheckCommand),
        Commands::Init { .. } => Box::new(InitCommand),
        Commands::Validate { .. } => Box::new(ValidateCommand),
        Commands::Version { .. } => Box::new(VersionCommand),
        Commands::TestNotification { .. } => Box::new(TestNotificationCommand),
    };

    command.execute(args).await.map_err(|e| anyhow::anyhow!(e))
}
