//! Web界面和指标模块
//!
//! 提供状态页、Prometheus 指标和 JSON 状态接口

use crate::monitor::Monitor;
use std::sync::Arc;

pub mod handlers;
pub mod metrics;
pub mod server;

pub use metrics::MetricsCollector;
pub use server::WebServer;

/// 状态页默认标题
pub const DEFAULT_TITLE: &str = "Kenya Service Status";

/// Web 处理器共享状态
#[derive(Debug, Clone)]
pub struct WebState {
    /// 监控引擎
    pub monitor: Arc<Monitor>,
    /// 状态页标题
    pub title: String,
}

impl WebState {
    pub fn new(monitor: Arc<Monitor>) -> Self {
        Self {
            monitor,
            title: DEFAULT_TITLE.to_string(),
        }
    }
}
