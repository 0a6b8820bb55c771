//! 消息模板模块
//!
//! 使用 handlebars 渲染 DOWN / SLOW 告警消息

use crate::error::NotificationError;
use crate::health::result::Classification;
use handlebars::Handlebars;
use serde::Serialize;
use tracing::error;

const DOWN_TEMPLATE_NAME: &str = "down";
const SLOW_TEMPLATE_NAME: &str = "slow";

/// 默认的 DOWN 告警模板
pub const DEFAULT_DOWN_TEMPLATE: &str =
    "❌ {{service}} seems DOWN (timeout >{{timeout_seconds}}s) – {{time}}";

/// 默认的 SLOW 告警模板
pub const DEFAULT_SLOW_TEMPLATE: &str = "⚠️ {{service}} is *slow* ({{latency_s}}s, HTTP {{status_code}}) – {{time}}\nHang tight or try off-peak 🕒";

/// 模板上下文数据
#[derive(Debug, Clone, Serialize)]
pub struct TemplateContext {
    /// 服务名称
    pub service: String,
    /// 状态分类
    pub status: String,
    /// HTTP状态码，缺失时为 "N/A"
    pub status_code: String,
    /// 响应时间（毫秒），缺失时为 "N/A"
    pub latency_ms: String,
    /// 响应时间（秒，一位小数），缺失时为 "N/A"
    pub latency_s: String,
    /// 探测超时（秒）
    pub timeout_seconds: u64,
    /// 格式化后的检测时间
    pub time: String,
}

impl TemplateContext {
    pub fn new(
        service: &str,
        status: Classification,
        status_code: Option<u16>,
        latency_ms: Option<u64>,
        timeout_seconds: u64,
        time: String,
    ) -> Self {
        Self {
            service: service.to_string(),
            status: status.to_string(),
            status_code: status_code
                .map(|c| c.to_string())
                .unwrap_or_else(|| "N/A".to_string()),
            latency_ms: latency_ms
                .map(|l| l.to_string())
                .unwrap_or_else(|| "N/A".to_string()),
            latency_s: latency_ms
                .map(|l| format!("{:.1}", l as f64 / 1000.0))
                .unwrap_or_else(|| "N/A".to_string()),
            timeout_seconds,
            time,
        }
    }
}

/// 告警消息模板集合
#[derive(Debug)]
pub struct AlertTemplates {
    registry: Handlebars<'static>,
}

impl AlertTemplates {
    /// 创建模板集合，未提供的模板使用默认值
    ///
    /// # 返回
    /// * `Result<Self, NotificationError>` - 模板语法错误时返回错误
    pub fn new(
        down_template: Option<&str>,
        slow_template: Option<&str>,
    ) -> Result<Self, NotificationError> {
        let mut registry = Handlebars::new();
        registry.register_escape_fn(handlebars::no_escape);

        registry
            .register_template_string(
                DOWN_TEMPLATE_NAME,
                down_template.unwrap_or(DEFAULT_DOWN_TEMPLATE),
            )
            .map_err(|e| NotificationError::TemplateError(format!("DOWN模板: {}", e)))?;
        registry
            .register_template_string(
                SLOW_TEMPLATE_NAME,
                slow_template.unwrap_or(DEFAULT_SLOW_TEMPLATE),
            )
            .map_err(|e| NotificationError::TemplateError(format!("SLOW模板: {}", e)))?;

        Ok(Self { registry })
    }

    /// 渲染告警消息，OK 状态没有告警模板，返回空字符串
    pub fn render(
        &self,
        classification: Classification,
        context: &TemplateContext,
    ) -> Result<String, NotificationError> {
        let name = match classification {
            Classification::Down => DOWN_TEMPLATE_NAME,
            Classification::Slow => SLOW_TEMPLATE_NAME,
            Classification::Ok => return Ok(String::new()),
        };

        self.registry
            .render(name, context)
            .map_err(|e| NotificationError::TemplateError(e.to_string()))
    }
}

impl Default for AlertTemplates {
    fn default() -> Self {
        match Self::new(None, None) {
            Ok(templates) => templates,
            Err(e) => {
                // 渲染时返回错误，由调用方使用兜底消息
                error!("内置告警模板注册失败: {}", e);
                Self {
                    registry: Handlebars::new(),
                }
            }
        }
    }
}
