//! 分级限流核心
//!
//! 热数据都在 [`UsageCache`] 里，缓存未命中时回落到 [`UsageStore`]。
//! 计数只写缓存，由定时的 [`RateLimiter::cleanup_inactive_users`] 整体刷回存储，
//! 因此进程崩溃会丢失最近一个同步周期内的计数。

mod scheduler;

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::{StreamExt, stream};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::cache::{UsageCache, UsageRecord};
use crate::database::UsageStore;
use crate::error::RateLimitError;

pub use scheduler::spawn_cleanup_task;

/// 限流参数
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// 等级未配置或读取失败时的每小时限额
    pub default_limit: u32,
    pub window: Duration,
    /// 超过该时长未访问的条目会被逐出缓存
    pub idle_threshold: Duration,
    pub store_timeout: Duration,
    /// 同步时并发写入存储的上限
    pub sync_concurrency: usize,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            default_limit: 3,
            window: Duration::from_secs(60 * 60),
            idle_threshold: Duration::from_secs(30 * 60),
            store_timeout: Duration::from_secs(2),
            sync_concurrency: 8,
        }
    }
}

/// 一次限额判定
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Decision {
    pub allowed: bool,
    pub remaining: u32,
    pub limit: u32,
}

impl Decision {
    fn evaluate(limit: u32, request_count: u32) -> Self {
        Self {
            allowed: request_count < limit,
            remaining: limit.saturating_sub(request_count),
            limit,
        }
    }
}

/// 只读查询的结果
#[derive(Debug, Clone, Serialize)]
pub struct UsageSnapshot {
    pub identifier: String,
    pub tier: String,
    pub limit: u32,
    pub remaining: u32,
    pub request_count: u32,
    pub window_start: DateTime<Utc>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub flushed: usize,
    pub failed: Vec<String>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CleanupReport {
    pub flushed: usize,
    pub failed: usize,
    pub evicted: usize,
    pub retained: usize,
}

pub struct RateLimiter {
    cache: UsageCache,
    store: Arc<dyn UsageStore>,
    config: RateLimitConfig,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn UsageStore>, config: RateLimitConfig) -> Self {
        Self {
            cache: UsageCache::new(),
            store,
            config,
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    pub fn cache(&self) -> &UsageCache {
        &self.cache
    }

    /// 给存储调用加上超时
    async fn bounded<T>(
        &self,
        call: impl Future<Output = Result<T, RateLimitError>>,
    ) -> Result<T, RateLimitError> {
        let timeout = self.config.store_timeout;
        tokio::time::timeout(timeout, call)
            .await
            .map_err(|_| RateLimitError::StoreTimeout(timeout))?
    }

    /// 查询等级限额，未配置、出错或超时都回落到默认值
    pub async fn get_tier_limit(&self, tier: &str) -> u32 {
        match self.bounded(self.store.load_tier_limit(tier)).await {
            Ok(Some(limit)) => limit,
            Ok(None) => {
                debug!("No limit configured for tier {}, using default", tier);
                self.config.default_limit
            }
            Err(e) => {
                warn!("Failed to load limit for tier {}: {}", tier, e);
                self.config.default_limit
            }
        }
    }

    /// 解析当前使用量
    ///
    /// 命中缓存时直接返回缓存记录（窗口已过期则先原地重置）；
    /// 未命中时读存储，并把结果写入缓存。存储不可用时向上返回错误。
    pub async fn get_usage(&self, identifier: &str) -> Result<UsageRecord, RateLimitError> {
        let now = Utc::now();
        let window = self.config.window;

        if let Some(record) = self.cache.update(identifier, |record| {
            record.roll_window(now, window);
            record.clone()
        }) {
            return Ok(record);
        }

        let stored = self.bounded(self.store.load_usage(identifier)).await?;
        let now = Utc::now();
        let record = match stored {
            Some(record) if record.window_expired(now, window) => {
                debug!("Usage window for {} expired, starting over", identifier);
                UsageRecord::new(identifier, now)
            }
            Some(record) => record,
            None => UsageRecord::new(identifier, now),
        };

        // 并发请求可能已经先一步填充了缓存
        Ok(self.cache.insert_if_absent(identifier, record))
    }

    /// 检查是否还有余量，不计数
    pub async fn check_and_reserve(
        &self,
        identifier: &str,
        tier: &str,
    ) -> Result<Decision, RateLimitError> {
        let limit = self.get_tier_limit(tier).await;
        let usage = self.get_usage(identifier).await?;
        Ok(Decision::evaluate(limit, usage.request_count))
    }

    /// 计数一次请求，只写缓存
    pub async fn increment_usage(&self, identifier: &str) -> Result<UsageRecord, RateLimitError> {
        let seed = self.get_usage(identifier).await?;
        let now = Utc::now();
        let window = self.config.window;

        Ok(self.cache.modify(identifier, seed, |record| {
            record.roll_window(now, window);
            record.record_hit(now);
            record.clone()
        }))
    }

    /// 检查与计数合为一步，在同一个键锁内完成，并发下不会超出限额
    pub async fn try_consume(
        &self,
        identifier: &str,
        tier: &str,
    ) -> Result<Decision, RateLimitError> {
        let limit = self.get_tier_limit(tier).await;
        let seed = self.get_usage(identifier).await?;
        let now = Utc::now();
        let window = self.config.window;

        Ok(self.cache.modify(identifier, seed, |record| {
            record.roll_window(now, window);
            if record.request_count < limit {
                record.record_hit(now);
                Decision {
                    allowed: true,
                    remaining: limit - record.request_count,
                    limit,
                }
            } else {
                Decision::evaluate(limit, record.request_count)
            }
        }))
    }

    /// 只读查询，供诊断使用
    pub async fn peek(&self, identifier: &str, tier: &str) -> Result<UsageSnapshot, RateLimitError> {
        let limit = self.get_tier_limit(tier).await;
        let usage = self.get_usage(identifier).await?;
        let decision = Decision::evaluate(limit, usage.request_count);

        Ok(UsageSnapshot {
            identifier: usage.identifier,
            tier: tier.to_string(),
            limit,
            remaining: decision.remaining,
            request_count: usage.request_count,
            window_start: usage.window_start,
        })
    }

    /// 清空计数并开启新窗口，下次同步时落库
    pub fn reset_usage(&self, identifier: &str) -> UsageRecord {
        let now = Utc::now();
        let mut record = UsageRecord::new(identifier, now);
        record.last_access = Some(now);
        self.cache.set(identifier, record.clone());
        record
    }

    /// 把缓存中的每一条记录完整写回存储
    ///
    /// 先对键集合做快照，期间被实时请求修改的记录以最后一次写入为准。
    /// 单条写入失败只记录下来，不影响其余条目。
    pub async fn sync_cache_to_database(&self) -> SyncReport {
        let snapshot: Vec<UsageRecord> = self
            .cache
            .keys()
            .into_iter()
            .filter_map(|identifier| self.cache.get(&identifier))
            .map(|mut record| {
                record.last_access = Some(record.last_seen());
                record
            })
            .collect();

        let results: Vec<(String, Result<(), RateLimitError>)> = stream::iter(snapshot)
            .map(|record| async move {
                let result = self.bounded(self.store.upsert_usage(&record)).await;
                (record.identifier, result)
            })
            .buffer_unordered(self.config.sync_concurrency.max(1))
            .collect()
            .await;

        let mut report = SyncReport::default();
        for (identifier, result) in results {
            match result {
                Ok(()) => report.flushed += 1,
                Err(e) => {
                    warn!("Failed to sync usage for {}: {}", identifier, e);
                    report.failed.push(identifier);
                }
            }
        }
        report
    }

    /// 定时任务入口：先整体同步，再逐出空闲条目
    ///
    /// 本轮同步失败的条目不会被逐出。
    pub async fn cleanup_inactive_users(&self) -> CleanupReport {
        info!("Running cache sync and cleanup job");

        let sync = self.sync_cache_to_database().await;
        let failed: HashSet<&str> = sync.failed.iter().map(String::as_str).collect();
        let idle_threshold = self.config.idle_threshold;
        let now = Utc::now();

        let mut report = CleanupReport {
            flushed: sync.flushed,
            failed: sync.failed.len(),
            ..CleanupReport::default()
        };

        for identifier in self.cache.keys() {
            if failed.contains(identifier.as_str()) {
                report.retained += 1;
                continue;
            }
            if self
                .cache
                .remove_if(&identifier, |record| record.idle_for(now) > idle_threshold)
            {
                debug!("Evicted idle usage entry {}", identifier);
                report.evicted += 1;
            } else {
                report.retained += 1;
            }
        }

        info!(
            "Cache sync and cleanup job completed: flushed={}, failed={}, evicted={}, retained={}",
            report.flushed, report.failed, report.evicted, report.retained
        );
        report
    }
}
