//! Prometheus指标模块
//!
//! 每个服务两个 gauge：`service_up` 与 `service_latency_ms`

use crate::health::result::Classification;
use prometheus::{Encoder, GaugeVec, Opts, Registry, TextEncoder};

/// Prometheus 文本格式的 Content-Type
pub const METRICS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Prometheus指标收集器
#[derive(Debug, Clone)]
pub struct MetricsCollector {
    /// 注册表
    registry: Registry,
    /// 服务状态指标（1=OK, 0=其他）
    service_up: GaugeVec,
    /// 最近一次响应时间
    service_latency_ms: GaugeVec,
}

impl MetricsCollector {
    /// 创建新的指标收集器
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let service_up = GaugeVec::new(
            Opts::new("service_up", "1 = up, 0 = down"),
            &["service"],
        )?;
        let service_latency_ms = GaugeVec::new(
            Opts::new("service_latency_ms", "Latency in milliseconds"),
            &["service"],
        )?;

        registry.register(Box::new(service_up.clone()))?;
        registry.register(Box::new(service_latency_ms.clone()))?;

        Ok(Self {
            registry,
            service_up,
            service_latency_ms,
        })
    }

    /// 记录一次检测结果
    ///
    /// 延迟缺失时保留上一次的延迟值。
    pub fn record(&self, service: &str, classification: Classification, latency_ms: Option<u64>) {
        let up = if classification == Classification::Ok { 1.0 } else { 0.0 };
        self.service_up.with_label_values(&[service]).set(up);

        if let Some(latency) = latency_ms {
            self.service_latency_ms
                .with_label_values(&[service])
                .set(latency as f64);
        }
    }

    /// 获取Prometheus格式的指标
    pub fn gather_metrics(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_collector_creation() {
        let collector = MetricsCollector::new().unwrap();
        assert!(!collector.gather_metrics().unwrap().contains("service_up{"));
    }

    #[test]
    fn test_record_ok() {
        let collector = MetricsCollector::new().unwrap();
        collector.record("KRA iTax", Classification::Ok, Some(321));

        let metrics = collector.gather_metrics().unwrap();
        assert!(metrics.contains(r#"service_up{service="KRA iTax"} 1"#));
        assert!(metrics.contains(r#"service_latency_ms{service="KRA iTax"} 321"#));
    }

    #[test]
    fn test_slow_is_not_up() {
        let collector = MetricsCollector::new().unwrap();
        collector.record("HELB", Classification::Slow, Some(5000));

        let metrics = collector.gather_metrics().unwrap();
        assert!(metrics.contains(r#"service_up{service="HELB"} 0"#));
    }

    #[test]
    fn test_down_keeps_previous_latency() {
        let collector = MetricsCollector::new().unwrap();
        collector.record("KUCCPS", Classification::Ok, Some(120));
        collector.record("KUCCPS", Classification::Down, None);

        let metrics = collector.gather_metrics().unwrap();
        assert!(metrics.contains(r#"service_up{service="KUCCPS"} 0"#));
        assert!(metrics.contains(r#"service_latency_ms{service="KUCCPS"} 120"#));
    }

    #[test]
    fn test_latency_absent_until_measured() {
        let collector = MetricsCollector::new().unwrap();
        collector.record("eCitizen", Classification::Down, None);

        let metrics = collector.gather_metrics().unwrap();
        assert!(metrics.contains(r#"service_up{service="eCitizen"} 0"#));
        assert!(!metrics.contains("service_latency_ms{"));
    }
}
