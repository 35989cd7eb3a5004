use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 单个标识符当前计数窗口的状态
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageRecord {
    pub identifier: String,
    pub request_count: u32,
    pub window_start: DateTime<Utc>,
    /// 只读检查过、从未计数的记录没有访问时间
    pub last_access: Option<DateTime<Utc>>,
}

impl UsageRecord {
    /// 以 `now` 开启一个新的空窗口
    pub fn new(identifier: &str, now: DateTime<Utc>) -> Self {
        Self {
            identifier: identifier.to_string(),
            request_count: 0,
            window_start: now,
            last_access: None,
        }
    }

    pub fn window_expired(&self, now: DateTime<Utc>, window: Duration) -> bool {
        elapsed(self.window_start, now) >= window
    }

    /// 窗口到期时把计数清零并把窗口起点移到 `now`，返回是否发生了重置
    pub fn roll_window(&mut self, now: DateTime<Utc>, window: Duration) -> bool {
        if !self.window_expired(now, window) {
            return false;
        }
        self.request_count = 0;
        self.window_start = now;
        true
    }

    /// 计数一次请求
    pub fn record_hit(&mut self, now: DateTime<Utc>) {
        self.request_count = self.request_count.saturating_add(1);
        self.last_access = Some(now);
    }

    /// 没有访问时间的记录以窗口起点代替
    pub fn last_seen(&self) -> DateTime<Utc> {
        self.last_access.unwrap_or(self.window_start)
    }

    pub fn idle_for(&self, now: DateTime<Utc>) -> Duration {
        elapsed(self.last_seen(), now)
    }
}

/// 时钟回拨时按零处理
fn elapsed(since: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    (now - since).to_std().unwrap_or_default()
}
