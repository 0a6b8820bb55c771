//! 任务调度器模块
//!
//! 两个相互独立的周期任务：检测任务按固定间隔驱动 `Monitor::tick`，
//! 持久化任务按固定间隔保存历史记录。两者都通过广播通道接收关闭信号。

use crate::error::PersistenceError;
use crate::monitor::Monitor;
use crate::persistence::HistoryFile;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{interval, interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info};

/// 任务调度器
#[derive(Debug)]
pub struct Scheduler {
    monitor: Arc<Monitor>,
    history_file: HistoryFile,
    check_interval: Duration,
    save_interval: Duration,
}

/// 运行中的调度任务
#[derive(Debug)]
pub struct SchedulerHandle {
    monitor: Arc<Monitor>,
    history_file: HistoryFile,
    check_task: JoinHandle<()>,
    persist_task: JoinHandle<()>,
}

impl Scheduler {
    /// 创建新的任务调度器
    ///
    /// # 参数
    /// * `monitor` - 监控引擎
    /// * `history_file` - 状态文件
    /// * `check_interval` - 检测间隔
    /// * `save_interval` - 保存间隔
    pub fn new(
        monitor: Arc<Monitor>,
        history_file: HistoryFile,
        check_interval: Duration,
        save_interval: Duration,
    ) -> Self {
        Self {
            monitor,
            history_file,
            check_interval,
            save_interval,
        }
    }

    /// 启动检测任务和持久化任务
    ///
    /// 第一次检测立即执行。
    pub fn spawn(self, shutdown_tx: &broadcast::Sender<()>) -> SchedulerHandle {
        self.spawn_with(shutdown_tx.subscribe(), shutdown_tx.subscribe())
    }

    /// 使用预先订阅的接收端启动两个任务
    ///
    /// 接收端只能收到订阅之后发送的信号，调用方需在任何 `.await` 之前完成订阅。
    pub fn spawn_with(
        self,
        check_shutdown_rx: broadcast::Receiver<()>,
        persist_shutdown_rx: broadcast::Receiver<()>,
    ) -> SchedulerHandle {
        info!(
            "启动调度器: 检测间隔 {:?}, 保存间隔 {:?}, {} 个服务",
            self.check_interval,
            self.save_interval,
            self.monitor.endpoints().len()
        );

        let check_task = tokio::spawn(run_checks(
            Arc::clone(&self.monitor),
            self.check_interval,
            check_shutdown_rx,
        ));
        let persist_task = tokio::spawn(run_persistence(
            Arc::clone(&self.monitor),
            self.history_file.clone(),
            self.save_interval,
            persist_shutdown_rx,
        ));

        SchedulerHandle {
            monitor: self.monitor,
            history_file: self.history_file,
            check_task,
            persist_task,
        }
    }
}

impl SchedulerHandle {
    /// 等待两个任务退出，然后执行最后一次保存
    ///
    /// 应在发送关闭信号之后调用；进行中的检测周期会自然完成。
    pub async fn finish(self) -> Result<(), PersistenceError> {
        if let Err(e) = self.check_task.await {
            error!("检测任务异常退出: {}", e);
        }
        if let Err(e) = self.persist_task.await {
            error!("持久化任务异常退出: {}", e);
        }

        info!("保存最终历史记录到 {}", self.history_file.path().display());
        self.history_file.save_from(self.monitor.history()).await
    }
}

/// 检测循环
async fn run_checks(
    monitor: Arc<Monitor>,
    period: Duration,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = shutdown_rx.recv() => {
                info!("检测任务收到关闭信号");
                break;
            }
        }

        debug!("开始检测周期");
        monitor.tick().await;
    }
}

/// 持久化循环，失败只记录日志，下个周期重试
async fn run_persistence(
    monitor: Arc<Monitor>,
    history_file: HistoryFile,
    period: Duration,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = shutdown_rx.recv() => {
                info!("持久化任务收到关闭信号");
                break;
            }
        }

        match history_file.save_from(monitor.history()).await {
            Ok(()) => debug!("历史记录已保存"),
            Err(e) => error!("保存历史记录失败: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::ServiceConfig;
    use crate::health::prober::Prober;
    use crate::health::result::ProbeOutcome;
    use crate::monitor::MonitorSettings;
    use crate::notification::AlertSink;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    #[derive(Default)]
    struct CountingProber {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Prober for CountingProber {
        async fn probe(&self, _url: &str, _timeout: Duration) -> ProbeOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            ProbeOutcome::Success {
                status_code: 200,
                latency_ms: 42,
            }
        }
    }

    fn monitor(prober: Arc<CountingProber>) -> Arc<Monitor> {
        Arc::new(
            Monitor::new(
                vec![ServiceConfig::new("KRA iTax", "https://itax.kra.go.ke")],
                MonitorSettings::default(),
                prober,
                AlertSink::NoOp,
            )
            .unwrap(),
        )
    }

    #[tokio::test]
    async fn test_first_check_runs_immediately() {
        let dir = TempDir::new().unwrap();
        let prober = Arc::new(CountingProber::default());
        let monitor = monitor(Arc::clone(&prober));
        let (shutdown_tx, _) = broadcast::channel(1);

        let handle = Scheduler::new(
            Arc::clone(&monitor),
            HistoryFile::new(dir.path().join("history.json")),
            Duration::from_secs(3600),
            Duration::from_secs(3600),
        )
        .spawn(&shutdown_tx);

        for _ in 0..50 {
            if prober.calls.load(Ordering::SeqCst) > 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        shutdown_tx.send(()).unwrap();
        handle.finish().await.unwrap();

        assert_eq!(prober.calls.load(Ordering::SeqCst), 1);
        assert_eq!(monitor.history().len("KRA iTax").await, 1);
    }

    #[tokio::test]
    async fn test_shutdown_writes_final_snapshot() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.json");
        let prober = Arc::new(CountingProber::default());
        let monitor = monitor(prober);
        monitor.tick().await;

        let (shutdown_tx, _) = broadcast::channel(1);
        let handle = Scheduler::new(
            Arc::clone(&monitor),
            HistoryFile::new(&path),
            Duration::from_secs(3600),
            Duration::from_secs(3600),
        )
        .spawn(&shutdown_tx);

        shutdown_tx.send(()).unwrap();
        handle.finish().await.unwrap();

        let saved = HistoryFile::new(&path).load(288).await.unwrap();
        assert_eq!(saved["KRA iTax"], monitor.history().history("KRA iTax").await);
    }

    #[tokio::test]
    async fn test_periodic_checks_and_saves() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.json");
        let prober = Arc::new(CountingProber::default());
        let monitor = monitor(Arc::clone(&prober));
        let (shutdown_tx, _) = broadcast::channel(1);

        let handle = Scheduler::new(
            Arc::clone(&monitor),
            HistoryFile::new(&path),
            Duration::from_millis(100),
            Duration::from_millis(100),
        )
        .spawn(&shutdown_tx);

        tokio::time::sleep(Duration::from_millis(350)).await;
        assert!(path.exists());

        shutdown_tx.send(()).unwrap();
        handle.finish().await.unwrap();

        assert!(prober.calls.load(Ordering::SeqCst) >= 2);
    }
}
