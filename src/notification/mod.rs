//! 通知模块
//!
//! 提供告警消息模板、webhook 发送器和告警投递入口

pub mod sender;
pub mod template;
pub mod webhook;

// 重新导出主要类型
pub use sender::{AlertSink, NoOpSender, NotificationSender};
pub use template::{AlertTemplates, TemplateContext};
pub use webhook::WebhookSender;
