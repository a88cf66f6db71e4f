use std::time::Duration;

/// Connection settings for the Redis-backed store.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Redis connection URL
    pub url: String,
    /// Maximum number of idle connections kept for reuse
    pub max_idle: usize,
    /// Idle connections older than this are dropped instead of reused
    pub idle_timeout: Duration,
    /// Ping pooled connections before handing them out
    pub test_on_borrow: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
            max_idle: 5,
            idle_timeout: Duration::from_secs(240),
            test_on_borrow: true,
        }
    }
}

impl StoreConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn with_max_idle(mut self, max_idle: usize) -> Self {
        self.max_idle = max_idle;
        self
    }

    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    pub fn with_test_on_borrow(mut self, enabled: bool) -> Self {
        self.test_on_borrow = enabled;
        self
    }
}
