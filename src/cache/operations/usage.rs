use dashmap::DashMap;

use crate::cache::models::UsageRecord;

/// 使用量缓存操作
///
/// 标识符到 [`UsageRecord`] 的映射，条目不会自动过期，只能显式删除。
/// 单个键上的读改写由 [`UsageCache::modify`] 在分片锁内完成，
/// 调用方不要在持有返回值期间再次访问缓存。
#[derive(Debug, Default)]
pub struct UsageCache {
    entries: DashMap<String, UsageRecord>,
}

impl UsageCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取记录副本
    pub fn get(&self, identifier: &str) -> Option<UsageRecord> {
        self.entries.get(identifier).map(|entry| entry.value().clone())
    }

    /// 写入或覆盖记录
    pub fn set(&self, identifier: &str, record: UsageRecord) {
        self.entries.insert(identifier.to_string(), record);
    }

    /// 删除记录
    pub fn delete(&self, identifier: &str) -> Option<UsageRecord> {
        self.entries.remove(identifier).map(|(_, record)| record)
    }

    /// 当前所有键的快照
    pub fn keys(&self) -> Vec<String> {
        self.entries.iter().map(|entry| entry.key().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 不存在时写入 `record`，已存在时保留原记录，返回缓存中的那一份
    pub fn insert_if_absent(&self, identifier: &str, record: UsageRecord) -> UsageRecord {
        self.entries
            .entry(identifier.to_string())
            .or_insert(record)
            .value()
            .clone()
    }

    /// 对已有记录原地修改，键不存在时返回 `None`
    pub fn update<R>(&self, identifier: &str, f: impl FnOnce(&mut UsageRecord) -> R) -> Option<R> {
        self.entries
            .get_mut(identifier)
            .map(|mut entry| f(entry.value_mut()))
    }

    /// 在同一把分片锁内完成“缺失则以 `seed` 补上，再修改”
    pub fn modify<R>(
        &self,
        identifier: &str,
        seed: UsageRecord,
        f: impl FnOnce(&mut UsageRecord) -> R,
    ) -> R {
        let mut entry = self.entries.entry(identifier.to_string()).or_insert(seed);
        f(entry.value_mut())
    }

    /// 满足条件时删除，判断与删除是原子的
    pub fn remove_if(&self, identifier: &str, predicate: impl FnOnce(&UsageRecord) -> bool) -> bool {
        self.entries
            .remove_if(identifier, |_, record| predicate(record))
            .is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn set_get_delete() {
        let cache = UsageCache::new();
        let record = UsageRecord::new("ip_127.0.0.1", Utc::now());

        assert!(cache.get("ip_127.0.0.1").is_none());
        cache.set("ip_127.0.0.1", record.clone());
        assert_eq!(cache.get("ip_127.0.0.1"), Some(record.clone()));
        assert_eq!(cache.keys(), vec!["ip_127.0.0.1".to_string()]);

        assert_eq!(cache.delete("ip_127.0.0.1"), Some(record));
        assert!(cache.is_empty());
    }

    #[test]
    fn set_replaces_instead_of_duplicating() {
        let cache = UsageCache::new();
        let now = Utc::now();
        cache.set("user_1", UsageRecord::new("user_1", now));

        let mut newer = UsageRecord::new("user_1", now);
        newer.request_count = 2;
        cache.set("user_1", newer);

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("user_1").unwrap().request_count, 2);
    }

    #[test]
    fn insert_if_absent_keeps_existing_record() {
        let cache = UsageCache::new();
        let now = Utc::now();
        let mut existing = UsageRecord::new("user_1", now);
        existing.request_count = 5;
        cache.set("user_1", existing);

        let kept = cache.insert_if_absent("user_1", UsageRecord::new("user_1", now));
        assert_eq!(kept.request_count, 5);
    }

    #[test]
    fn modify_seeds_missing_entry() {
        let cache = UsageCache::new();
        let now = Utc::now();

        let count = cache.modify("user_7", UsageRecord::new("user_7", now), |record| {
            record.record_hit(now);
            record.request_count
        });

        assert_eq!(count, 1);
        assert_eq!(cache.get("user_7").unwrap().last_access, Some(now));
        assert!(cache.update("user_8", |record| record.request_count).is_none());
    }

    #[test]
    fn remove_if_respects_predicate() {
        let cache = UsageCache::new();
        cache.set("user_1", UsageRecord::new("user_1", Utc::now()));

        assert!(!cache.remove_if("user_1", |record| record.request_count > 0));
        assert!(cache.remove_if("user_1", |record| record.request_count == 0));
        assert!(cache.get("user_1").is_none());
    }
}
