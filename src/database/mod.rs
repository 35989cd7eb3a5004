// 数据库模块
// 使用量记录与等级限额的持久化，缓存冷启动时以它为准

pub mod models;
pub mod operations;

pub use models::{TierLimitEntity, UsageEntity};
pub use operations::{PgUsageStore, UsageStore};

#[cfg(any(test, feature = "test-util"))]
pub use operations::MemoryStore;
