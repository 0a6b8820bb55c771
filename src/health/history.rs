//! 历史记录存储
//!
//! 每个服务一个固定容量的环形缓冲区，写满后淘汰最旧的样本

use crate::health::result::Sample;
use std::collections::{BTreeMap, VecDeque};
use tokio::sync::RwLock;
use tracing::warn;

/// 默认历史容量（5分钟间隔下的24小时）
pub const DEFAULT_HISTORY_ENTRIES: usize = 288;

/// 固定容量的样本环形缓冲区
#[derive(Debug, Clone)]
pub struct SampleRing {
    capacity: usize,
    samples: VecDeque<Sample>,
}

impl SampleRing {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            samples: VecDeque::with_capacity(capacity),
        }
    }

    /// 追加样本，已满时淘汰最旧的样本
    pub fn push(&mut self, sample: Sample) {
        if self.capacity == 0 {
            return;
        }
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    pub fn latest(&self) -> Option<Sample> {
        self.samples.back().copied()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn to_vec(&self) -> Vec<Sample> {
        self.samples.iter().copied().collect()
    }
}

/// 历史记录存储
///
/// 服务集合在构造时固定；每个服务的缓冲区有独立的读写锁，
/// 读取方只会看到完整写入的样本。
#[derive(Debug)]
pub struct HistoryStore {
    capacity: usize,
    buffers: BTreeMap<String, RwLock<SampleRing>>,
}

impl HistoryStore {
    /// 创建历史存储
    ///
    /// # 参数
    /// * `names` - 服务名称集合
    /// * `capacity` - 每个服务保留的样本数
    pub fn new<I, S>(names: I, capacity: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let buffers = names
            .into_iter()
            .map(|name| (name.into(), RwLock::new(SampleRing::new(capacity))))
            .collect();

        Self { capacity, buffers }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// 已注册的服务名称（按名称排序）
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.buffers.keys().map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.buffers.contains_key(name)
    }

    /// 追加样本，未注册的服务会被忽略
    pub async fn append(&self, name: &str, sample: Sample) {
        match self.buffers.get(name) {
            Some(buffer) => buffer.write().await.push(sample),
            None => warn!("忽略未注册服务的样本: {}", name),
        }
    }

    /// 最新样本
    pub async fn latest(&self, name: &str) -> Option<Sample> {
        match self.buffers.get(name) {
            Some(buffer) => buffer.read().await.latest(),
            None => None,
        }
    }

    /// 单个服务的有序历史（最旧在前）
    pub async fn history(&self, name: &str) -> Vec<Sample> {
        match self.buffers.get(name) {
            Some(buffer) => buffer.read().await.to_vec(),
            None => Vec::new(),
        }
    }

    pub async fn len(&self, name: &str) -> usize {
        match self.buffers.get(name) {
            Some(buffer) => buffer.read().await.len(),
            None => 0,
        }
    }

    /// 所有服务历史的快照
    pub async fn all(&self) -> BTreeMap<String, Vec<Sample>> {
        let mut snapshot = BTreeMap::new();
        for (name, buffer) in &self.buffers {
            snapshot.insert(name.clone(), buffer.read().await.to_vec());
        }
        snapshot
    }

    /// 所有服务的最新样本
    pub async fn latest_all(&self) -> BTreeMap<String, Option<Sample>> {
        let mut latest = BTreeMap::new();
        for (name, buffer) in &self.buffers {
            latest.insert(name.clone(), buffer.read().await.latest());
        }
        latest
    }

    /// 从持久化数据恢复历史，只保留最新的 `capacity` 条
    ///
    /// # 返回
    /// * `bool` - 服务是否已注册
    pub async fn restore(&self, name: &str, samples: Vec<Sample>) -> bool {
        let Some(buffer) = self.buffers.get(name) else {
            return false;
        };

        let mut ring = SampleRing::new(self.capacity);
        let skip = samples.len().saturating_sub(self.capacity);
        for sample in samples.into_iter().skip(skip) {
            ring.push(sample);
        }
        *buffer.write().await = ring;
        true
    }
}
