//! 告警判定
//!
//! 比较上一次与本次的状态分类，只在进入 SLOW / DOWN 的状态变化时产生告警

use crate::health::result::{Classification, Sample};
use crate::notification::template::{AlertTemplates, TemplateContext};
use chrono::{DateTime, Local, Utc};
use tracing::error;

/// 告警事件，由通知发送器消费一次，不做持久化
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertEvent {
    /// 服务名称
    pub service: String,
    /// 新的状态分类
    pub classification: Classification,
    /// HTTP状态码
    pub status_code: Option<u16>,
    /// 响应时间（毫秒）
    pub latency_ms: Option<u64>,
    /// 检测时间
    pub timestamp: DateTime<Utc>,
    /// 格式化后的消息
    pub message: String,
}

/// 告警判定器
#[derive(Debug)]
pub struct AlertDecider {
    templates: AlertTemplates,
    timeout_seconds: u64,
}

impl AlertDecider {
    pub fn new(templates: AlertTemplates, timeout_seconds: u64) -> Self {
        Self {
            templates,
            timeout_seconds,
        }
    }

    /// 是否需要告警
    ///
    /// 没有历史记录（`previous` 为空）时不告警；恢复到 OK 不告警；
    /// 相同的非 OK 状态持续时只在第一次告警。
    pub fn should_alert(previous: Option<Classification>, current: Classification) -> bool {
        match previous {
            Some(previous) => current.needs_alert() && current != previous,
            None => false,
        }
    }

    /// 判定并生成告警事件
    ///
    /// # 参数
    /// * `service` - 服务名称
    /// * `previous` - 上一个样本的分类
    /// * `current` - 本次样本的分类
    /// * `sample` - 本次样本
    pub fn decide(
        &self,
        service: &str,
        previous: Option<Classification>,
        current: Classification,
        sample: &Sample,
    ) -> Option<AlertEvent> {
        if !Self::should_alert(previous, current) {
            return None;
        }

        Some(AlertEvent {
            service: service.to_string(),
            classification: current,
            status_code: sample.status_code,
            latency_ms: sample.latency_ms,
            timestamp: sample.timestamp,
            message: self.compose_message(service, current, sample),
        })
    }

    /// 格式化告警消息，模板渲染失败时退回到固定格式
    fn compose_message(&self, service: &str, current: Classification, sample: &Sample) -> String {
        let time = sample
            .timestamp
            .with_timezone(&Local)
            .format("%b %d %H:%M")
            .to_string();
        let context = TemplateContext::new(
            service,
            current,
            sample.status_code,
            sample.latency_ms,
            self.timeout_seconds,
            time.clone(),
        );

        match self.templates.render(current, &context) {
            Ok(message) => message,
            Err(e) => {
                error!("告警模板渲染失败 {}: {}", service, e);
                format!("{} is {} – {}", service, current, time)
            }
        }
    }
}

impl Default for AlertDecider {
    fn default() -> Self {
        Self::new(AlertTemplates::default(), 10)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::classifier::classify;

    fn sample(code: Option<u16>, latency: Option<u64>) -> Sample {
        Sample::new(Utc::now(), code, latency)
    }

    #[test]
    fn test_fires_on_transition_into_non_ok() {
        use Classification::*;
        assert!(AlertDecider::should_alert(Some(Ok), Down));
        assert!(AlertDecider::should_alert(Some(Ok), Slow));
        assert!(AlertDecider::should_alert(Some(Slow), Down));
        assert!(AlertDecider::should_alert(Some(Down), Slow));
    }

    #[test]
    fn test_silent_on_repeat_and_recovery() {
        use Classification::*;
        assert!(!AlertDecider::should_alert(Some(Down), Down));
        assert!(!AlertDecider::should_alert(Some(Slow), Slow));
        assert!(!AlertDecider::should_alert(Some(Down), Ok));
        assert!(!AlertDecider::should_alert(Some(Ok), Ok));
    }

    #[test]
    fn test_silent_without_history() {
        assert!(!AlertDecider::should_alert(None, Classification::Down));
        assert!(!AlertDecider::should_alert(None, Classification::Slow));
    }

    #[test]
    fn test_sequence_fires_once_per_run() {
        use Classification::*;
        let decider = AlertDecider::default();
        let sequence = [Ok, Down, Down, Down, Ok, Down];

        let mut previous = None;
        let mut fired_ticks = Vec::new();
        for (tick, current) in sequence.into_iter().enumerate() {
            if decider
                .decide("HELB", previous, current, &sample(None, None))
                .is_some()
            {
                fired_ticks.push(tick + 1);
            }
            previous = Some(current);
        }

        assert_eq!(fired_ticks, vec![2, 6]);
    }

    #[test]
    fn test_event_carries_sample_fields() {
        let decider = AlertDecider::default();
        let current = sample(Some(503), Some(1200));

        let event = decider
            .decide("eCitizen", Some(Classification::Ok), classify(Some(503), Some(1200)), &current)
            .unwrap();

        assert_eq!(event.service, "eCitizen");
        assert_eq!(event.classification, Classification::Slow);
        assert_eq!(event.status_code, Some(503));
        assert_eq!(event.latency_ms, Some(1200));
        assert_eq!(event.timestamp, current.timestamp);
        assert!(event.message.starts_with("⚠️ eCitizen is *slow* (1.2s, HTTP 503)"));
    }

    #[test]
    fn test_down_message_uses_configured_timeout() {
        let decider = AlertDecider::new(AlertTemplates::default(), 30);
        let event = decider
            .decide(
                "KUCCPS",
                Some(Classification::Slow),
                Classification::Down,
                &sample(None, None),
            )
            .unwrap();

        assert!(event.message.starts_with("❌ KUCCPS seems DOWN (timeout >30s)"));
    }
}
