/// 持久化存储操作
#[cfg(any(test, feature = "test-util"))]
pub mod memory;
pub mod usage;

#[cfg(any(test, feature = "test-util"))]
pub use memory::MemoryStore;
pub use usage::{PgUsageStore, UsageStore};
