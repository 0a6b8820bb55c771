//! Web服务器实现
//!
//! axum 路由与带优雅关闭的服务循环

use super::{handlers, WebState};
use crate::config::types::WebConfig;
use crate::error::{Result, ServicePulseError};
use axum::{routing::get, Router};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Web服务器
#[derive(Debug)]
pub struct WebServer {
    /// 配置
    config: WebConfig,
    /// 共享状态
    state: WebState,
}

impl WebServer {
    /// 创建新的Web服务器
    pub fn new(config: WebConfig, state: WebState) -> Self {
        Self { config, state }
    }

    /// 构建路由
    pub fn router(state: WebState) -> Router {
        Router::new()
            .route("/", get(handlers::status_page))
            .route("/metrics", get(handlers::metrics))
            .route(
                "/api/status",
                get(handlers::api_status).layer(CorsLayer::permissive()),
            )
            .with_state(state)
            .layer(TraceLayer::new_for_http())
    }

    /// 绑定地址并运行，直到收到关闭信号
    pub async fn run(self, mut shutdown_rx: broadcast::Receiver<()>) -> Result<()> {
        let addr = self
            .config
            .socket_addr()
            .map_err(|e| ServicePulseError::Other(anyhow::anyhow!(e)))?;
        let listener = TcpListener::bind(addr).await?;

        info!("Web服务器已启动: http://{}", addr);
        info!("Prometheus指标: http://{}/metrics", addr);

        axum::serve(listener, Self::router(self.state))
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
                info!("接收到关闭信号，正在关闭Web服务器...");
            })
            .await?;

        info!("Web服务器已关闭");
        Ok(())
    }
}
