//! 监控引擎
//!
//! `Monitor` 在启动时构造一次，以 `Arc<Monitor>` 的形式共享给调度任务、
//! 持久化任务和 Web 处理器。

use crate::config::types::{Config, GlobalConfig, ServiceConfig};
use crate::error::{Result, ServicePulseError};
use crate::health::alert::{AlertDecider, AlertEvent};
use crate::health::classifier::{Classifier, DEFAULT_SLOW_THRESHOLD_MS};
use crate::health::history::{HistoryStore, DEFAULT_HISTORY_ENTRIES};
use crate::health::prober::{HttpProber, Prober};
use crate::health::result::{Classification, Sample};
use crate::logging::LoggingSystem;
use crate::notification::{AlertSink, AlertTemplates, WebhookSender};
use crate::web::metrics::MetricsCollector;
use chrono::{DateTime, SubsecRound, Utc};
use futures::future::join_all;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// 引擎参数
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorSettings {
    /// 单次探测超时
    pub timeout: Duration,
    /// 慢响应阈值（毫秒）
    pub slow_threshold_ms: u64,
    /// 每个服务保留的样本数
    pub history_entries: usize,
    /// 自定义 DOWN 模板
    pub down_template: Option<String>,
    /// 自定义 SLOW 模板
    pub slow_template: Option<String>,
}

impl MonitorSettings {
    pub fn from_global(global: &GlobalConfig) -> Self {
        Self {
            timeout: global.timeout(),
            slow_threshold_ms: global.slow_threshold_ms,
            history_entries: global.history_entries,
            down_template: global.notification.down_template.clone(),
            slow_template: global.notification.slow_template.clone(),
        }
    }
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            slow_threshold_ms: DEFAULT_SLOW_THRESHOLD_MS,
            history_entries: DEFAULT_HISTORY_ENTRIES,
            down_template: None,
            slow_template: None,
        }
    }
}

/// 单个服务一次检测的结果
#[derive(Debug, Clone)]
pub struct EndpointCheck {
    pub name: String,
    pub sample: Sample,
    pub previous: Option<Classification>,
    pub current: Classification,
    pub alert: Option<AlertEvent>,
}

/// 单个服务的当前状态，供状态页和API读取
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EndpointStatus {
    pub name: String,
    pub url: String,
    pub status: Classification,
    pub status_code: Option<u16>,
    pub latency_ms: Option<u64>,
    pub last_check: Option<DateTime<Utc>>,
}

/// 监控引擎
pub struct Monitor {
    endpoints: Vec<ServiceConfig>,
    history: HistoryStore,
    classifier: Classifier,
    prober: Arc<dyn Prober>,
    decider: AlertDecider,
    sink: AlertSink,
    metrics: MetricsCollector,
    timeout: Duration,
}

impl Monitor {
    /// 创建监控引擎
    ///
    /// # 参数
    /// * `endpoints` - 服务列表，启动后不再变化
    /// * `settings` - 引擎参数
    /// * `prober` - 探测器
    /// * `sink` - 告警投递目标
    pub fn new(
        endpoints: Vec<ServiceConfig>,
        settings: MonitorSettings,
        prober: Arc<dyn Prober>,
        sink: AlertSink,
    ) -> Result<Self> {
        let templates = AlertTemplates::new(
            settings.down_template.as_deref(),
            settings.slow_template.as_deref(),
        )?;
        let metrics = MetricsCollector::new().map_err(|e| {
            ServicePulseError::Other(anyhow::anyhow!("创建指标收集器失败: {}", e))
        })?;
        let history = HistoryStore::new(
            endpoints.iter().map(|e| e.name.clone()),
            settings.history_entries,
        );

        Ok(Self {
            endpoints,
            history,
            classifier: Classifier::new(settings.slow_threshold_ms),
            prober,
            decider: AlertDecider::new(templates, settings.timeout.as_secs()),
            sink,
            metrics,
            timeout: settings.timeout,
        })
    }

    /// 根据配置创建引擎，使用 HTTP 探测器和配置中的 webhook
    pub fn from_config(config: &Config) -> Result<Self> {
        let prober = HttpProber::new()
            .map_err(|e| ServicePulseError::Other(anyhow::anyhow!("创建HTTP客户端失败: {}", e)))?;
        let sink = match WebhookSender::from_config(&config.global.notification)? {
            Some(sender) => {
                info!("告警将发送到webhook: {}", sender.webhook_url());
                AlertSink::active(sender)
            }
            None => {
                info!("未配置webhook，告警仅写入日志");
                AlertSink::NoOp
            }
        };

        Self::new(
            config.services.clone(),
            MonitorSettings::from_global(&config.global),
            Arc::new(prober),
            sink,
        )
    }

    pub fn endpoints(&self) -> &[ServiceConfig] {
        &self.endpoints
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    pub fn metrics(&self) -> &MetricsCollector {
        &self.metrics
    }

    pub fn classifier(&self) -> Classifier {
        self.classifier
    }

    pub fn sink(&self) -> &AlertSink {
        &self.sink
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// 检测单个服务
    ///
    /// 探测期间不持有任何锁；告警投递失败不会影响结果。
    pub async fn check_endpoint(&self, endpoint: &ServiceConfig) -> EndpointCheck {
        let previous = self
            .history
            .latest(&endpoint.name)
            .await
            .map(|sample| self.classifier.classify_sample(&sample));

        let outcome = self.prober.probe(&endpoint.url, self.timeout).await;
        let sample = Sample::from_outcome(Utc::now().trunc_subsecs(6), &outcome);
        let current = self.classifier.classify_sample(&sample);

        if let Some(reason) = outcome.failure_reason() {
            warn!(service = %endpoint.name, url = %endpoint.url, "探测失败: {}", reason);
        }
        LoggingSystem::probe_log(&endpoint.name, current, sample.status_code, sample.latency_ms);

        self.history.append(&endpoint.name, sample).await;
        self.metrics.record(&endpoint.name, current, sample.latency_ms);

        let alert = self.decider.decide(&endpoint.name, previous, current, &sample);
        if let Some(event) = &alert {
            self.sink.deliver(event).await;
        }

        EndpointCheck {
            name: endpoint.name.clone(),
            sample,
            previous,
            current,
            alert,
        }
    }

    /// 执行一个检测周期，所有服务并发探测
    pub async fn tick(&self) -> Vec<EndpointCheck> {
        let checks = join_all(self.endpoints.iter().map(|e| self.check_endpoint(e))).await;

        let unhealthy = checks.iter().filter(|c| !c.current.is_healthy()).count();
        info!(
            "检测周期完成: {} 个服务, {} 个异常",
            checks.len(),
            unhealthy
        );
        checks
    }

    /// 各服务当前状态，按名称排序
    ///
    /// 尚无样本的服务视为 DOWN。
    pub async fn statuses(&self) -> Vec<EndpointStatus> {
        let mut statuses = Vec::with_capacity(self.endpoints.len());
        for endpoint in &self.endpoints {
            let latest = self.history.latest(&endpoint.name).await;
            let status_code = latest.and_then(|s| s.status_code);
            let latency_ms = latest.and_then(|s| s.latency_ms);

            statuses.push(EndpointStatus {
                name: endpoint.name.clone(),
                url: endpoint.url.clone(),
                status: self.classifier.classify(status_code, latency_ms),
                status_code,
                latency_ms,
                last_check: latest.map(|s| s.timestamp),
            });
        }
        statuses.sort_by(|a, b| a.name.cmp(&b.name));
        statuses
    }
}

impl std::fmt::Debug for Monitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Monitor")
            .field("endpoints", &self.endpoints)
            .field("classifier", &self.classifier)
            .field("sink", &self.sink)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::result::ProbeOutcome;
    use async_trait::async_trait;
    use std::collections::HashMap;

    /// 按 URL 返回固定结果的探测器
    struct FixedProber {
        outcomes: HashMap<String, ProbeOutcome>,
    }

    #[async_trait]
    impl Prober for FixedProber {
        async fn probe(&self, url: &str, _timeout: Duration) -> ProbeOutcome {
            self.outcomes
                .get(url)
                .cloned()
                .unwrap_or(ProbeOutcome::Failure {
                    reason: "unknown".to_string(),
                })
        }
    }

    fn monitor() -> Monitor {
        let mut outcomes = HashMap::new();
        outcomes.insert(
            "https://a.example".to_string(),
            ProbeOutcome::Success {
                status_code: 200,
                latency_ms: 120,
            },
        );
        outcomes.insert(
            "https://b.example".to_string(),
            ProbeOutcome::Success {
                status_code: 502,
                latency_ms: 80,
            },
        );

        Monitor::new(
            vec![
                ServiceConfig::new("Zeta", "https://a.example"),
                ServiceConfig::new("Alpha", "https://b.example"),
                ServiceConfig::new("Mid", "https://c.example"),
            ],
            MonitorSettings {
                history_entries: 3,
                ..MonitorSettings::default()
            },
            Arc::new(FixedProber { outcomes }),
            AlertSink::NoOp,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_tick_appends_one_sample_per_endpoint() {
        let monitor = monitor();
        let checks = monitor.tick().await;

        assert_eq!(checks.len(), 3);
        for endpoint in monitor.endpoints() {
            assert_eq!(monitor.history().len(&endpoint.name).await, 1);
        }
    }

    #[tokio::test]
    async fn test_first_tick_never_alerts() {
        let monitor = monitor();
        let checks = monitor.tick().await;

        assert!(checks.iter().all(|c| c.previous.is_none()));
        assert!(checks.iter().all(|c| c.alert.is_none()));
    }

    #[tokio::test]
    async fn test_statuses_sorted_by_name() {
        let monitor = monitor();
        let before = monitor.statuses().await;
        assert!(before.iter().all(|s| s.status == Classification::Down && s.last_check.is_none()));

        monitor.tick().await;
        let statuses = monitor.statuses().await;
        let names: Vec<_> = statuses.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Alpha", "Mid", "Zeta"]);

        assert_eq!(statuses[0].status, Classification::Slow);
        assert_eq!(statuses[0].status_code, Some(502));
        assert_eq!(statuses[1].status, Classification::Down);
        assert_eq!(statuses[1].latency_ms, None);
        assert_eq!(statuses[2].status, Classification::Ok);
        assert_eq!(statuses[2].latency_ms, Some(120));
    }

    #[tokio::test]
    async fn test_tick_updates_metrics() {
        let monitor = monitor();
        monitor.tick().await;

        let metrics = monitor.metrics().gather_metrics().unwrap();
        assert!(metrics.contains(r#"service_up{service="Zeta"} 1"#));
        assert!(metrics.contains(r#"service_up{service="Alpha"} 0"#));
        assert!(metrics.contains(r#"service_up{service="Mid"} 0"#));
        assert!(metrics.contains(r#"service_latency_ms{service="Zeta"} 120"#));
        assert!(!metrics.contains(r#"service_latency_ms{service="Mid"}"#));
    }

    #[tokio::test]
    async fn test_history_bounded_across_ticks() {
        let monitor = monitor();
        for _ in 0..5 {
            monitor.tick().await;
        }
        assert_eq!(monitor.history().len("Zeta").await, 3);
    }

    #[test]
    fn test_invalid_template_rejected() {
        let result = Monitor::new(
            Vec::new(),
            MonitorSettings {
                down_template: Some("{{#each}}".to_string()),
                ..MonitorSettings::default()
            },
            Arc::new(FixedProber {
                outcomes: HashMap::new(),
            }),
            AlertSink::NoOp,
        );
        assert!(matches!(result, Err(ServicePulseError::Notification(_))));
    }
}
