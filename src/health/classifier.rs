//! 状态分类器
//!
//! 将一次探测的 (状态码, 延迟) 映射为 OK / SLOW / DOWN

use crate::health::result::{Classification, ProbeOutcome, Sample};

/// 默认慢响应阈值（毫秒）
pub const DEFAULT_SLOW_THRESHOLD_MS: u64 = 4_000;

/// 纯函数分类器，只携带慢响应阈值
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classifier {
    slow_threshold_ms: u64,
}

impl Classifier {
    pub fn new(slow_threshold_ms: u64) -> Self {
        Self { slow_threshold_ms }
    }

    pub fn slow_threshold_ms(&self) -> u64 {
        self.slow_threshold_ms
    }

    /// 分类
    ///
    /// 状态码或延迟缺失即为 DOWN（优先判断）；状态码 >= 500 或延迟超过阈值为 SLOW；
    /// 其余为 OK。
    pub fn classify(&self, status_code: Option<u16>, latency_ms: Option<u64>) -> Classification {
        match (status_code, latency_ms) {
            (Some(code), Some(latency)) => {
                if code >= 500 || latency > self.slow_threshold_ms {
                    Classification::Slow
                } else {
                    Classification::Ok
                }
            }
            _ => Classification::Down,
        }
    }

    pub fn classify_outcome(&self, outcome: &ProbeOutcome) -> Classification {
        self.classify(outcome.status_code(), outcome.latency_ms())
    }

    pub fn classify_sample(&self, sample: &Sample) -> Classification {
        self.classify(sample.status_code, sample.latency_ms)
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(DEFAULT_SLOW_THRESHOLD_MS)
    }
}

/// 使用默认阈值分类
pub fn classify(status_code: Option<u16>, latency_ms: Option<u64>) -> Classification {
    Classifier::default().classify(status_code, latency_ms)
}
