use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::limiter::RateLimitConfig;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    /// 未配置时所有请求都按访客处理
    pub jwt_secret: Option<String>,
    /// 仅在反向代理之后开启，否则客户端可以伪造来源地址
    pub trust_proxy_headers: bool,
    pub server_host: String,
    pub server_port: u16,
    pub rate_limit_default_limit: u32,
    pub rate_limit_window_secs: u64,
    pub rate_limit_idle_secs: u64,
    pub rate_limit_cleanup_interval_secs: u64,
    pub rate_limit_store_timeout_ms: u64,
    pub rate_limit_sync_concurrency: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        Ok(Config {
            database_url: env::var("DATABASE_URL").map_err(|_| ConfigError::Missing("DATABASE_URL"))?,
            database_max_connections: parse_or("DATABASE_MAX_CONNECTIONS", 10)?,
            jwt_secret: env::var("JWT_SECRET").ok().filter(|s| !s.is_empty()),
            trust_proxy_headers: parse_or("TRUST_PROXY_HEADERS", false)?,
            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            server_port: parse_or("SERVER_PORT", 3000)?,
            rate_limit_default_limit: parse_or("RATE_LIMIT_DEFAULT_LIMIT", 3)?,
            rate_limit_window_secs: parse_or("RATE_LIMIT_WINDOW_SECS", 3600)?,
            rate_limit_idle_secs: parse_or("RATE_LIMIT_IDLE_SECS", 1800)?,
            rate_limit_cleanup_interval_secs: parse_or("RATE_LIMIT_CLEANUP_INTERVAL_SECS", 3600)?,
            rate_limit_store_timeout_ms: parse_or("RATE_LIMIT_STORE_TIMEOUT_MS", 2000)?,
            rate_limit_sync_concurrency: parse_or("RATE_LIMIT_SYNC_CONCURRENCY", 8)?,
        })
    }

    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_secs(self.rate_limit_window_secs)
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.rate_limit_cleanup_interval_secs)
    }

    pub fn rate_limit(&self) -> RateLimitConfig {
        RateLimitConfig {
            default_limit: self.rate_limit_default_limit,
            window: self.rate_limit_window(),
            idle_threshold: Duration::from_secs(self.rate_limit_idle_secs),
            store_timeout: Duration::from_millis(self.rate_limit_store_timeout_ms),
            sync_concurrency: self.rate_limit_sync_concurrency.max(1),
        }
    }
}

/// 读取可选的数值配置，未设置时使用默认值，格式错误时报错
fn parse_or<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_config_follows_env_values() {
        let config = Config {
            database_url: "postgres://localhost/test".into(),
            database_max_connections: 10,
            jwt_secret: None,
            trust_proxy_headers: false,
            server_host: "127.0.0.1".into(),
            server_port: 3000,
            rate_limit_default_limit: 5,
            rate_limit_window_secs: 120,
            rate_limit_idle_secs: 60,
            rate_limit_cleanup_interval_secs: 30,
            rate_limit_store_timeout_ms: 250,
            rate_limit_sync_concurrency: 0,
        };

        let limits = config.rate_limit();
        assert_eq!(limits.default_limit, 5);
        assert_eq!(limits.window, Duration::from_secs(120));
        assert_eq!(limits.idle_threshold, Duration::from_secs(60));
        assert_eq!(limits.store_timeout, Duration::from_millis(250));
        assert_eq!(limits.sync_concurrency, 1);
        assert_eq!(config.cleanup_interval(), Duration::from_secs(30));
    }

    #[test]
    fn parse_or_falls_back_when_unset() {
        let value: u32 = parse_or("TIERED_QUOTA_TEST_UNSET_KEY", 42).unwrap();
        assert_eq!(value, 42);
    }

    #[test]
    fn proxy_headers_untrusted_unless_enabled() {
        let trusted: bool = parse_or("TIERED_QUOTA_TEST_UNSET_PROXY_FLAG", false).unwrap();
        assert!(!trusted);
    }
}
