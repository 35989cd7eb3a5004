/// 数据库实体定义
pub mod usage;

pub use usage::{TierLimitEntity, UsageEntity};
