//! Service Pulse - HTTP 服务状态监控工具
//!
//! 周期性探测一组 HTTP 端点，支持：
//! - OK / SLOW / DOWN 三态分类
//! - 每个服务固定长度的历史记录及 JSON 持久化
//! - 状态变化时的 webhook 告警
//! - Prometheus 指标和状态页

pub mod cli;
pub mod config;
pub mod error;
pub mod health;
pub mod logging;
pub mod monitor;
pub mod notification;
pub mod persistence;
pub mod web;

// 重新导出主要类型
pub use config::{Config, GlobalConfig, ServiceConfig};
pub use error::ServicePulseError;
pub use health::{Classification, Sample};
pub use monitor::{EndpointStatus, Monitor, MonitorSettings};

/// 应用程序版本信息
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// 应用程序名称
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");

/// 应用程序描述
pub const APP_DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
