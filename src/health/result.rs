//! 探测结果数据结构
//!
//! 定义探测结果、历史样本和状态分类枚举

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 服务状态分类
///
/// 由最新样本在读取时推导得出，不单独存储。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Classification {
    /// 服务正常
    Ok,
    /// 服务降级（5xx 或响应过慢）
    Slow,
    /// 服务不可达
    Down,
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Classification::Ok => write!(f, "OK"),
            Classification::Slow => write!(f, "SLOW"),
            Classification::Down => write!(f, "DOWN"),
        }
    }
}

impl Classification {
    /// 判断状态是否为健康
    pub fn is_healthy(&self) -> bool {
        matches!(self, Classification::Ok)
    }

    /// 判断状态是否需要告警
    pub fn needs_alert(&self) -> bool {
        matches!(self, Classification::Slow | Classification::Down)
    }
}

/// 单次探测的结果
///
/// 探测失败不会以错误形式向上传播，而是以 `Failure` 表示。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// 收到完整的 HTTP 响应（任意状态码）
    Success { status_code: u16, latency_ms: u64 },
    /// 超时、连接失败或响应无效
    Failure { reason: String },
}

impl ProbeOutcome {
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ProbeOutcome::Success { status_code, .. } => Some(*status_code),
            ProbeOutcome::Failure { .. } => None,
        }
    }

    pub fn latency_ms(&self) -> Option<u64> {
        match self {
            ProbeOutcome::Success { latency_ms, .. } => Some(*latency_ms),
            ProbeOutcome::Failure { .. } => None,
        }
    }

    /// 失败原因（成功时为空）
    pub fn failure_reason(&self) -> Option<&str> {
        match self {
            ProbeOutcome::Success { .. } => None,
            ProbeOutcome::Failure { reason } => Some(reason),
        }
    }
}

/// 历史样本
///
/// 每个检测周期为每个服务创建一次，追加后不可修改。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
    /// 检测时间戳
    pub timestamp: DateTime<Utc>,
    /// HTTP状态码，探测失败时为空
    pub status_code: Option<u16>,
    /// 响应时间（毫秒），探测失败时为空
    pub latency_ms: Option<u64>,
}

impl Sample {
    pub fn new(timestamp: DateTime<Utc>, status_code: Option<u16>, latency_ms: Option<u64>) -> Self {
        Self {
            timestamp,
            status_code,
            latency_ms,
        }
    }

    /// 根据探测结果创建样本
    pub fn from_outcome(timestamp: DateTime<Utc>, outcome: &ProbeOutcome) -> Self {
        Self::new(timestamp, outcome.status_code(), outcome.latency_ms())
    }
}
