use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use super::RateLimiter;

/// 按固定周期执行同步与清理，第一次执行在一个周期之后
pub fn spawn_cleanup_task(limiter: Arc<RateLimiter>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = time::interval_at(time::Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!("Cache sync and cleanup scheduled every {:?}", period);
        loop {
            ticker.tick().await;
            let report = limiter.cleanup_inactive_users().await;
            if report.failed > 0 {
                tracing::warn!(
                    "{} usage entries could not be synced and stay cached until the next run",
                    report.failed
                );
            }
        }
    })
}
