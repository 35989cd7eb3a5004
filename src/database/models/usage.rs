use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::cache::UsageRecord;

/// 使用量数据库实体，对应 `rate_limit_usage` 表
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UsageEntity {
    pub identifier: String,
    pub window_start: DateTime<Utc>,
    pub request_count: i32,
    pub last_access: Option<DateTime<Utc>>,
}

/// 等级限额数据库实体，对应 `rate_limit_tiers` 表
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TierLimitEntity {
    pub tier: String,
    pub requests_per_hour: i32,
}

impl From<UsageEntity> for UsageRecord {
    fn from(entity: UsageEntity) -> Self {
        Self {
            identifier: entity.identifier,
            // 负数只可能来自手工改库
            request_count: u32::try_from(entity.request_count).unwrap_or(0),
            window_start: entity.window_start,
            last_access: entity.last_access,
        }
    }
}

impl From<&UsageRecord> for UsageEntity {
    fn from(record: &UsageRecord) -> Self {
        Self {
            identifier: record.identifier.clone(),
            window_start: record.window_start,
            request_count: i32::try_from(record.request_count).unwrap_or(i32::MAX),
            last_access: record.last_access,
        }
    }
}

impl TierLimitEntity {
    /// 负数限额视为未配置
    pub fn limit(&self) -> Option<u32> {
        u32::try_from(self.requests_per_hour).ok()
    }
}
