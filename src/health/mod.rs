//! 健康检测模块
//!
//! 探测、分类、历史记录、告警判定和周期调度

pub mod alert;
pub mod classifier;
pub mod history;
pub mod prober;
pub mod result;
pub mod scheduler;

// 重新导出主要类型
pub use alert::{AlertDecider, AlertEvent};
pub use classifier::{classify, Classifier};
pub use history::{HistoryStore, SampleRing};
pub use prober::{HttpProber, Prober};
pub use result::{Classification, ProbeOutcome, Sample};
pub use scheduler::{Scheduler, SchedulerHandle};
