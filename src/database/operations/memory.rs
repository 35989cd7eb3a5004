use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::{DashMap, DashSet};

use crate::cache::UsageRecord;
use crate::database::operations::usage::UsageStore;
use crate::error::RateLimitError;

/// 进程内存储，仅用于测试
///
/// 可以整体下线，也可以让个别标识符的写入失败，用来模拟存储故障。
#[derive(Debug, Default)]
pub struct MemoryStore {
    usage: DashMap<String, UsageRecord>,
    tiers: DashMap<String, u32>,
    offline: AtomicBool,
    failing_upserts: DashSet<String>,
    latency: std::sync::Mutex<Option<Duration>>,
    upserts: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 预置 guest/free/premium 三个等级
    pub fn with_default_tiers() -> Self {
        let store = Self::new();
        store.set_tier_limit("guest", 3);
        store.set_tier_limit("free", 8);
        store.set_tier_limit("premium", 10);
        store
    }

    pub fn set_tier_limit(&self, tier: &str, requests_per_hour: u32) {
        self.tiers.insert(tier.to_string(), requests_per_hour);
    }

    pub fn insert_usage(&self, record: UsageRecord) {
        self.usage.insert(record.identifier.clone(), record);
    }

    pub fn usage(&self, identifier: &str) -> Option<UsageRecord> {
        self.usage.get(identifier).map(|entry| entry.value().clone())
    }

    pub fn usage_count(&self) -> usize {
        self.usage.len()
    }

    /// 成功写入的累计次数
    pub fn upsert_calls(&self) -> usize {
        self.upserts.load(Ordering::SeqCst)
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn fail_upserts_for(&self, identifier: &str) {
        self.failing_upserts.insert(identifier.to_string());
    }

    pub fn clear_upsert_failures(&self) {
        self.failing_upserts.clear();
    }

    /// 给每次调用加上固定延迟
    pub fn set_latency(&self, latency: Option<Duration>) {
        if let Ok(mut guard) = self.latency.lock() {
            *guard = latency;
        }
    }

    async fn enter(&self) -> Result<(), RateLimitError> {
        let latency = self.latency.lock().ok().and_then(|guard| *guard);
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        if self.offline.load(Ordering::SeqCst) {
            return Err(RateLimitError::StoreUnavailable(sqlx::Error::PoolClosed));
        }
        Ok(())
    }
}

#[async_trait]
impl UsageStore for MemoryStore {
    async fn load_usage(&self, identifier: &str) -> Result<Option<UsageRecord>, RateLimitError> {
        self.enter().await?;
        Ok(self.usage(identifier))
    }

    async fn upsert_usage(&self, record: &UsageRecord) -> Result<(), RateLimitError> {
        self.enter().await?;
        if self.failing_upserts.contains(&record.identifier) {
            return Err(RateLimitError::StoreUnavailable(sqlx::Error::WorkerCrashed));
        }
        self.usage.insert(record.identifier.clone(), record.clone());
        self.upserts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn load_tier_limit(&self, tier: &str) -> Result<Option<u32>, RateLimitError> {
        self.enter().await?;
        Ok(self.tiers.get(tier).map(|entry| *entry.value()))
    }
}
