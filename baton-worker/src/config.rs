use baton_core::{BatonError, LeaseKeys, Result};
use std::time::Duration;

/// Timing and policy settings shared by every worker in a group.
///
/// All workers pointed at the same store must agree on `lease_ttl` and
/// `keys`; the other fields are local tuning.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Time-to-live attached to the lease on election and renewal
    pub lease_ttl: Duration,
    /// How often the leader checks ownership and produces a message
    pub produce_interval: Duration,
    /// How often a follower issues a blocking dequeue
    pub consume_interval: Duration,
    /// Chance that a consumed message is flagged as failed
    pub failure_probability: f64,
    /// Seed for payload generation and failure injection
    pub randomization_seed: Option<u64>,
    /// Length of generated message payloads
    pub payload_len: usize,
    /// Store keys for the lease, the work queue and the error list
    pub keys: LeaseKeys,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            lease_ttl: Duration::from_millis(2000),
            produce_interval: Duration::from_millis(200),
            consume_interval: Duration::from_millis(500),
            failure_probability: 0.05,
            randomization_seed: None,
            payload_len: 16,
            keys: LeaseKeys::default(),
        }
    }
}

impl WorkerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Leader renews at half the lease lifetime.
    pub fn renew_interval(&self) -> Duration {
        self.lease_ttl / 2
    }

    /// Followers block on the queue for at most half the lease lifetime.
    pub fn dequeue_timeout(&self) -> Duration {
        self.lease_ttl / 2
    }

    /// Followers retry the election once per lease lifetime.
    pub fn reelection_interval(&self) -> Duration {
        self.lease_ttl
    }

    pub fn with_lease_ttl(mut self, ttl: Duration) -> Self {
        self.lease_ttl = ttl;
        self
    }

    pub fn with_produce_interval(mut self, interval: Duration) -> Self {
        self.produce_interval = interval;
        self
    }

    pub fn with_consume_interval(mut self, interval: Duration) -> Self {
        self.consume_interval = interval;
        self
    }

    pub fn with_failure_probability(mut self, probability: f64) -> Self {
        self.failure_probability = probability;
        self
    }

    pub fn with_randomization_seed(mut self, seed: u64) -> Self {
        self.randomization_seed = Some(seed);
        self
    }

    pub fn with_payload_len(mut self, len: usize) -> Self {
        self.payload_len = len;
        self
    }

    pub fn with_keys(mut self, keys: LeaseKeys) -> Self {
        self.keys = keys;
        self
    }

    pub fn validate(&self) -> Result<()> {
        // Halving must still leave a non-zero renew interval and dequeue timeout.
        if self.lease_ttl < Duration::from_millis(2) {
            return Err(BatonError::config(format!(
                "lease_ttl must be at least 2ms, got {:?}",
                self.lease_ttl
            )));
        }
        if self.produce_interval.is_zero() {
            return Err(BatonError::config("produce_interval must be non-zero"));
        }
        if self.consume_interval.is_zero() {
            return Err(BatonError::config("consume_interval must be non-zero"));
        }
        if !(0.0..=1.0).contains(&self.failure_probability) {
            return Err(BatonError::config(format!(
                "failure_probability must be within [0, 1], got {}",
                self.failure_probability
            )));
        }
        if self.payload_len == 0 {
            return Err(BatonError::config("payload_len must be non-zero"));
        }
        for (name, key) in [
            ("lease", &self.keys.lease),
            ("queue", &self.keys.queue),
            ("errors", &self.keys.errors),
        ] {
            if key.is_empty() {
                return Err(BatonError::config(format!("{} key must not be empty", name)));
            }
        }
        Ok(())
    }
}
