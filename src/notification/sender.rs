//! 通知发送器模块
//!
//! 定义通知发送的trait、空实现以及告警投递入口

use crate::error::NotificationError;
use crate::health::alert::AlertEvent;
use crate::logging::LoggingSystem;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

/// 通知发送器trait
#[async_trait]
pub trait NotificationSender: Send + Sync {
    /// 发送一条已格式化的消息
    ///
    /// # 参数
    /// * `message` - 消息文本
    ///
    /// # 返回
    /// * `Result<(), NotificationError>` - 发送结果
    async fn send(&self, message: &str) -> Result<(), NotificationError>;

    /// 发送器名称，用于日志
    fn name(&self) -> &str;
}

/// 空的通知发送器实现（用于测试或禁用通知）
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpSender;

#[async_trait]
impl NotificationSender for NoOpSender {
    async fn send(&self, _message: &str) -> Result<(), NotificationError> {
        Ok(())
    }

    fn name(&self) -> &str {
        "noop"
    }
}

/// 告警投递目标
///
/// 未配置通知渠道时为 `NoOp`，告警只写入日志。
#[derive(Clone)]
pub enum AlertSink {
    /// 通过发送器投递
    Active(Arc<dyn NotificationSender>),
    /// 不投递
    NoOp,
}

impl AlertSink {
    pub fn active<S: NotificationSender + 'static>(sender: S) -> Self {
        AlertSink::Active(Arc::new(sender))
    }

    pub fn is_active(&self) -> bool {
        matches!(self, AlertSink::Active(_))
    }

    /// 投递告警事件，失败只记录日志，不向调用方传播
    pub async fn deliver(&self, event: &AlertEvent) {
        match self {
            AlertSink::Active(sender) => match sender.send(&event.message).await {
                Ok(()) => LoggingSystem::notification_log(
                    &event.service,
                    event.classification,
                    sender.name(),
                    true,
                    None,
                ),
                Err(e) => LoggingSystem::notification_log(
                    &event.service,
                    event.classification,
                    sender.name(),
                    false,
                    Some(&e.to_string()),
                ),
            },
            AlertSink::NoOp => info!(
                service = %event.service,
                status = %event.classification,
                "未配置通知渠道，告警仅记录: {}",
                event.message
            ),
        }
    }
}

impl std::fmt::Debug for AlertSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertSink::Active(sender) => f.debug_tuple("Active").field(&sender.name()).finish(),
            AlertSink::NoOp => f.write_str("NoOp"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::result::Classification;
    use chrono::Utc;
    use std::sync::Mutex;

    struct FailingSender;

    #[async_trait]
    impl NotificationSender for FailingSender {
        async fn send(&self, _message: &str) -> Result<(), NotificationError> {
            Err(NotificationError::SendError("webhook unreachable".to_string()))
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    #[derive(Default)]
    struct RecordingSender {
        messages: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl NotificationSender for RecordingSender {
        async fn send(&self, message: &str) -> Result<(), NotificationError> {
            self.messages.lock().unwrap().push(message.to_string());
            Ok(())
        }

        fn name(&self) -> &str {
            "recording"
        }
    }

    fn event() -> AlertEvent {
        AlertEvent {
            service: "HELB".to_string(),
            classification: Classification::Down,
            status_code: None,
            latency_ms: None,
            timestamp: Utc::now(),
            message: "❌ HELB seems DOWN".to_string(),
        }
    }

    #[tokio::test]
    async fn test_deliver_sends_message() {
        let recorder = Arc::new(RecordingSender::default());
        let sink = AlertSink::Active(recorder.clone());

        sink.deliver(&event()).await;

        assert_eq!(*recorder.messages.lock().unwrap(), vec!["❌ HELB seems DOWN"]);
    }

    #[tokio::test]
    async fn test_deliver_swallows_send_failure() {
        let sink = AlertSink::active(FailingSender);
        assert!(sink.is_active());
        sink.deliver(&event()).await;
    }

    #[tokio::test]
    async fn test_noop_sink() {
        let sink = AlertSink::NoOp;
        assert!(!sink.is_active());
        sink.deliver(&event()).await;
        assert!(NoOpSender.send("hello").await.is_ok());
    }
}
