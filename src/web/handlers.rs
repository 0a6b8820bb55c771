//! Web 路由处理函数
//!
//! 状态页、Prometheus 指标和 JSON 状态接口，均只读取监控引擎的当前快照

use super::WebState;
use crate::health::result::Classification;
use crate::monitor::EndpointStatus;
use crate::web::metrics::METRICS_CONTENT_TYPE;
use askama::Template;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{Html, IntoResponse, Json},
};
use chrono::{DateTime, Local, Utc};
use serde::Serialize;
use tracing::error;

/// 缺失值占位符
const PLACEHOLDER: &str = "—";

/// 状态页模板
#[derive(Template)]
#[template(path = "status.html")]
struct StatusTemplate {
    title: String,
    updated: String,
    services: Vec<StatusRow>,
}

/// 状态页中的一行
struct StatusRow {
    name: String,
    status: String,
    tag_class: &'static str,
    latency: String,
    code: String,
}

impl From<&EndpointStatus> for StatusRow {
    fn from(status: &EndpointStatus) -> Self {
        let tag_class = match status.status {
            Classification::Ok => "is-success",
            Classification::Slow => "is-warning",
            Classification::Down => "is-danger",
        };

        Self {
            name: status.name.clone(),
            status: status.status.to_string(),
            tag_class,
            latency: status
                .latency_ms
                .map(format_thousands)
                .unwrap_or_else(|| PLACEHOLDER.to_string()),
            code: status
                .status_code
                .map(|c| c.to_string())
                .unwrap_or_else(|| PLACEHOLDER.to_string()),
        }
    }
}

/// API 状态响应结构
#[derive(Debug, Serialize)]
pub struct ApiStatusResponse {
    pub services: Vec<EndpointStatus>,
    pub last_updated: DateTime<Utc>,
    pub total_services: usize,
    pub ok_services: usize,
    pub slow_services: usize,
    pub down_services: usize,
}

/// 状态页处理函数
pub async fn status_page(State(state): State<WebState>) -> impl IntoResponse {
    let statuses = state.monitor.statuses().await;

    let template = StatusTemplate {
        title: state.title.clone(),
        updated: Local::now().format("%b %d %H:%M:%S").to_string(),
        services: statuses.iter().map(StatusRow::from).collect(),
    };

    match template.render() {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            error!("模板渲染失败: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "模板渲染失败").into_response()
        }
    }
}

/// Prometheus 指标处理函数
pub async fn metrics(State(state): State<WebState>) -> impl IntoResponse {
    match state.monitor.metrics().gather_metrics() {
        Ok(body) => ([(header::CONTENT_TYPE, METRICS_CONTENT_TYPE)], body).into_response(),
        Err(e) => {
            error!("收集指标失败: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to gather metrics").into_response()
        }
    }
}

/// API 状态端点处理函数
pub async fn api_status(State(state): State<WebState>) -> Json<ApiStatusResponse> {
    let services = state.monitor.statuses().await;
    let count = |c: Classification| services.iter().filter(|s| s.status == c).count();

    Json(ApiStatusResponse {
        total_services: services.len(),
        ok_services: count(Classification::Ok),
        slow_services: count(Classification::Slow),
        down_services: count(Classification::Down),
        last_updated: Utc::now(),
        services,
    })
}

/// 千位分隔格式化
fn format_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
