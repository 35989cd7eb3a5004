use async_trait::async_trait;
use sqlx::PgPool;

use crate::cache::UsageRecord;
use crate::database::models::{TierLimitEntity, UsageEntity};
use crate::error::RateLimitError;

/// 限流核心依赖的持久化存储
#[async_trait]
pub trait UsageStore: Send + Sync {
    /// 读取使用量记录
    async fn load_usage(&self, identifier: &str) -> Result<Option<UsageRecord>, RateLimitError>;

    /// 幂等的插入或覆盖
    async fn upsert_usage(&self, record: &UsageRecord) -> Result<(), RateLimitError>;

    /// 读取等级的每小时限额，未配置时返回 `None`
    async fn load_tier_limit(&self, tier: &str) -> Result<Option<u32>, RateLimitError>;
}

/// 基于 Postgres 的存储实现
#[derive(Clone)]
pub struct PgUsageStore {
    pool: PgPool,
}

impl PgUsageStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UsageStore for PgUsageStore {
    async fn load_usage(&self, identifier: &str) -> Result<Option<UsageRecord>, RateLimitError> {
        let entity = sqlx::query_as::<_, UsageEntity>(
            r#"
            SELECT identifier, window_start, request_count, last_access
            FROM rate_limit_usage
            WHERE identifier = $1
            "#,
        )
        .bind(identifier)
        .fetch_optional(&self.pool)
        .await?;

        Ok(entity.map(UsageRecord::from))
    }

    async fn upsert_usage(&self, record: &UsageRecord) -> Result<(), RateLimitError> {
        let entity = UsageEntity::from(record);

        sqlx::query(
            r#"
            INSERT INTO rate_limit_usage (identifier, window_start, request_count, last_access)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (identifier) DO UPDATE
            SET window_start = EXCLUDED.window_start,
                request_count = EXCLUDED.request_count,
                last_access = EXCLUDED.last_access
            "#,
        )
        .bind(&entity.identifier)
        .bind(entity.window_start)
        .bind(entity.request_count)
        .bind(entity.last_access)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn load_tier_limit(&self, tier: &str) -> Result<Option<u32>, RateLimitError> {
        let entity = sqlx::query_as::<_, TierLimitEntity>(
            r#"
            SELECT tier, requests_per_hour
            FROM rate_limit_tiers
            WHERE tier = $1
            "#,
        )
        .bind(tier)
        .fetch_optional(&self.pool)
        .await?;

        Ok(entity.and_then(|row| row.limit()))
    }
}
