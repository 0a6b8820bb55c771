//! HTTP探测器实现
//!
//! 对单个URL发起一次带超时的GET请求，失败不会向上传播

use crate::health::result::ProbeOutcome;
use async_trait::async_trait;
use reqwest::Client;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::debug;

/// 探测器trait
#[async_trait]
pub trait Prober: Send + Sync {
    /// 执行一次探测
    ///
    /// # 参数
    /// * `url` - 目标URL
    /// * `timeout_duration` - 整个请求（含重定向和响应体）的超时时间
    ///
    /// # 返回
    /// * `ProbeOutcome` - 探测结果，网络错误与超时均表示为 `Failure`
    async fn probe(&self, url: &str, timeout_duration: Duration) -> ProbeOutcome;
}

/// 基于 reqwest 的 HTTP 探测器
#[derive(Debug, Clone)]
pub struct HttpProber {
    /// HTTP客户端
    client: Client,
}

impl HttpProber {
    /// 创建新的HTTP探测器
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(format!("{}/{}", crate::APP_NAME, crate::VERSION))
            .build()?;

        Ok(Self { client })
    }

    /// 使用已有客户端创建探测器
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// 发送请求并读取完整响应体
    async fn fetch(&self, url: &str) -> Result<u16, reqwest::Error> {
        let response = self.client.get(url).send().await?;
        let status_code = response.status().as_u16();
        response.bytes().await?;
        Ok(status_code)
    }

    /// 格式化请求错误信息
    fn format_request_error(error: &reqwest::Error) -> String {
        if error.is_timeout() {
            "Request timeout".to_string()
        } else if error.is_connect() {
            "Connection refused".to_string()
        } else if error.is_redirect() {
            "Too many redirects".to_string()
        } else if error.is_builder() || error.is_request() {
            "Invalid request".to_string()
        } else if error.is_body() || error.is_decode() {
            "Response decode error".to_string()
        } else {
            let error_str = error.to_string();
            if error_str.contains("dns") || error_str.contains("DNS") {
                "DNS resolution failed".to_string()
            } else if error_str.contains("certificate")
                || error_str.contains("tls")
                || error_str.contains("ssl")
            {
                "SSL/TLS certificate error".to_string()
            } else {
                format!("Request failed: {}", error_str)
            }
        }
    }
}

#[async_trait]
impl Prober for HttpProber {
    async fn probe(&self, url: &str, timeout_duration: Duration) -> ProbeOutcome {
        let start_time = Instant::now();

        let outcome = match timeout(timeout_duration, self.fetch(url)).await {
            Ok(Ok(status_code)) => ProbeOutcome::Success {
                status_code,
                latency_ms: start_time.elapsed().as_millis() as u64,
            },
            Ok(Err(e)) => ProbeOutcome::Failure {
                reason: Self::format_request_error(&e),
            },
            Err(_) => ProbeOutcome::Failure {
                reason: format!("Request timeout (>{}s)", timeout_duration.as_secs_f64()),
            },
        };

        debug!(url = %url, outcome = ?outcome, "探测完成");
        outcome
    }
}
