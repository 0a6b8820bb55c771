//! 历史记录持久化
//!
//! 状态文件是一个以服务名称为键的 JSON 对象，值为按时间排序（最新在后）的
//! `[时间戳(秒, 浮点), 状态码(0 表示缺失), 延迟毫秒(-1 表示缺失)]` 三元组数组。

use crate::error::PersistenceError;
use crate::health::history::HistoryStore;
use crate::health::result::Sample;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// 磁盘上的单条记录
type Record = (f64, i64, i64);

/// 历史快照
pub type Snapshot = BTreeMap<String, Vec<Sample>>;

/// 状态文件
#[derive(Debug, Clone)]
pub struct HistoryFile {
    path: PathBuf,
}

impl HistoryFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 读取状态文件
    ///
    /// 文件不存在时返回空快照；每个服务只保留最新的 `capacity` 条记录。
    pub async fn load(&self, capacity: usize) -> Result<Snapshot, PersistenceError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("状态文件不存在: {}", self.path.display());
                return Ok(Snapshot::new());
            }
            Err(source) => {
                return Err(PersistenceError::Read {
                    path: self.path.display().to_string(),
                    source,
                })
            }
        };

        decode_snapshot(&content, capacity)
    }

    /// 写入状态文件
    ///
    /// 先写入同目录下的临时文件再重命名，写入中途崩溃不会破坏已有文件。
    pub async fn save(&self, snapshot: &Snapshot) -> Result<(), PersistenceError> {
        let content = encode_snapshot(snapshot)?;
        let write_error = |source: std::io::Error| PersistenceError::Write {
            path: self.path.display().to_string(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(write_error)?;
        }

        let temp_path = self.temp_path();
        tokio::fs::write(&temp_path, content)
            .await
            .map_err(write_error)?;
        tokio::fs::rename(&temp_path, &self.path)
            .await
            .map_err(write_error)?;

        debug!("状态文件已保存: {}", self.path.display());
        Ok(())
    }

    /// 将状态文件中的历史恢复到存储中
    ///
    /// 读取失败或格式错误只记录日志，按空历史处理；未注册的服务被忽略。
    ///
    /// # 返回
    /// * `usize` - 恢复的服务数量
    pub async fn restore_into(&self, store: &HistoryStore) -> usize {
        let snapshot = match self.load(store.capacity()).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("加载历史记录失败，以空历史启动: {}", e);
                return 0;
            }
        };

        let mut restored = 0;
        for (name, samples) in snapshot {
            if store.restore(&name, samples).await {
                restored += 1;
            } else {
                warn!("状态文件包含未配置的服务，已忽略: {}", name);
            }
        }

        info!("从 {} 恢复了 {} 个服务的历史记录", self.path.display(), restored);
        restored
    }

    /// 将存储的当前快照写入状态文件
    pub async fn save_from(&self, store: &HistoryStore) -> Result<(), PersistenceError> {
        self.save(&store.all().await).await
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

/// 序列化快照
pub fn encode_snapshot(snapshot: &Snapshot) -> Result<String, PersistenceError> {
    let records: BTreeMap<&str, Vec<Record>> = snapshot
        .iter()
        .map(|(name, samples)| (name.as_str(), samples.iter().map(encode_sample).collect()))
        .collect();

    Ok(serde_json::to_string(&records)?)
}

/// 反序列化快照，每个服务只保留最新的 `capacity` 条
///
/// 只有整个文件不是 JSON 对象时才返回错误；格式错误的服务或单条记录被跳过。
pub fn decode_snapshot(content: &str, capacity: usize) -> Result<Snapshot, PersistenceError> {
    let entries: BTreeMap<String, serde_json::Value> = serde_json::from_str(content)?;

    Ok(entries
        .into_iter()
        .filter_map(|(name, value)| {
            let serde_json::Value::Array(records) = value else {
                warn!("忽略格式错误的服务历史 {}: {}", name, value);
                return None;
            };

            let skip = records.len().saturating_sub(capacity);
            let samples = records
                .into_iter()
                .skip(skip)
                .filter_map(|record| {
                    let sample = serde_json::from_value::<Record>(record.clone())
                        .ok()
                        .and_then(decode_sample);
                    if sample.is_none() {
                        warn!("忽略无效的历史记录 {}: {}", name, record);
                    }
                    sample
                })
                .collect();
            Some((name, samples))
        })
        .collect())
}

fn encode_sample(sample: &Sample) -> Record {
    (
        sample.timestamp.timestamp_micros() as f64 / 1_000_000.0,
        sample.status_code.map(i64::from).unwrap_or(0),
        sample
            .latency_ms
            .and_then(|l| i64::try_from(l).ok())
            .unwrap_or(-1),
    )
}

fn decode_sample((timestamp, code, latency): Record) -> Option<Sample> {
    if !timestamp.is_finite() {
        return None;
    }
    let timestamp = DateTime::<Utc>::from_timestamp_micros((timestamp * 1_000_000.0).round() as i64)?;
    let status_code = if code <= 0 { None } else { u16::try_from(code).ok() };
    let latency_ms = if latency < 0 { None } else { u64::try_from(latency).ok() };

    Some(Sample::new(timestamp, status_code, latency_ms))
}
