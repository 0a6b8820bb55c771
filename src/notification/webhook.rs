//! Webhook通知发送器模块
//!
//! 将告警消息以 JSON 形式 POST 到聊天机器人 webhook

use crate::config::types::{NotificationConfig, WebhookFormat};
use crate::error::NotificationError;
use crate::notification::sender::NotificationSender;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, error};

/// Webhook通知发送器
#[derive(Debug, Clone)]
pub struct WebhookSender {
    /// HTTP客户端
    client: Client,
    /// webhook URL
    webhook_url: String,
    /// 消息体格式
    format: WebhookFormat,
}

impl WebhookSender {
    /// 创建新的webhook发送器
    ///
    /// # 参数
    /// * `webhook_url` - webhook URL
    /// * `format` - 消息体格式
    pub fn new(webhook_url: String, format: WebhookFormat) -> Result<Self, NotificationError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| NotificationError::ConfigError(format!("创建HTTP客户端失败: {}", e)))?;

        Ok(Self {
            client,
            webhook_url,
            format,
        })
    }

    /// 根据通知配置创建发送器，未配置 webhook 时返回 `None`
    pub fn from_config(config: &NotificationConfig) -> Result<Option<Self>, NotificationError> {
        match &config.webhook_url {
            Some(url) if !url.trim().is_empty() => Ok(Some(Self::new(url.clone(), config.format)?)),
            _ => Ok(None),
        }
    }

    pub fn webhook_url(&self) -> &str {
        &self.webhook_url
    }

    /// 构建消息体
    fn build_message_body(&self, message: &str) -> Value {
        match self.format {
            WebhookFormat::Plain => json!({ "text": message }),
            WebhookFormat::Feishu => json!({
                "msg_type": "text",
                "content": { "text": message }
            }),
        }
    }
}

#[async_trait]
impl NotificationSender for WebhookSender {
    async fn send(&self, message: &str) -> Result<(), NotificationError> {
        debug!("发送消息到webhook: {}", self.webhook_url);

        let body = self.build_message_body(message);
        let response = self.client.post(&self.webhook_url).json(&body).send().await?;

        if response.status().is_success() {
            Ok(())
        } else {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            error!("webhook消息发送失败: {} - {}", status, text);
            Err(NotificationError::SendError(format!(
                "webhook返回状态码 {}",
                status
            )))
        }
    }

    fn name(&self) -> &str {
        "webhook"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    #[test]
    fn test_plain_body() {
        let sender = WebhookSender::new("http://localhost/hook".to_string(), WebhookFormat::Plain).unwrap();
        assert_eq!(sender.build_message_body("hi"), json!({ "text": "hi" }));
    }

    #[test]
    fn test_feishu_body() {
        let sender = WebhookSender::new("http://localhost/hook".to_string(), WebhookFormat::Feishu).unwrap();
        assert_eq!(
            sender.build_message_body("hi"),
            json!({ "msg_type": "text", "content": { "text": "hi" } })
        );
    }

    #[test]
    fn test_from_config_without_url() {
        let config = NotificationConfig::default();
        assert!(WebhookSender::from_config(&config).unwrap().is_none());

        let config = NotificationConfig {
            webhook_url: Some("  ".to_string()),
            ..NotificationConfig::default()
        };
        assert!(WebhookSender::from_config(&config).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_send_posts_json() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/hook")
            .match_header("content-type", "application/json")
            .match_body(Matcher::Json(json!({ "text": "❌ KRA iTax seems DOWN" })))
            .with_status(200)
            .create_async()
            .await;

        let sender = WebhookSender::new(format!("{}/hook", server.url()), WebhookFormat::Plain).unwrap();
        sender.send("❌ KRA iTax seems DOWN").await.unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_send_reports_http_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/hook")
            .with_status(500)
            .with_body("internal error")
            .create_async()
            .await;

        let sender = WebhookSender::new(format!("{}/hook", server.url()), WebhookFormat::Feishu).unwrap();
        let result = sender.send("test").await;

        assert!(matches!(result, Err(NotificationError::SendError(_))));
    }
}
