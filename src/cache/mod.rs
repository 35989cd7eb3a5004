// 缓存模块
// 进程内的使用量缓存，热路径的读写都以它为准

pub mod keys;
pub mod models;
pub mod operations;

pub use models::UsageRecord;
pub use operations::UsageCache;
