//! # Core Types
//!
//! Fundamental types shared by the election controller, the role loops and
//! the store backends.

use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifier of a single worker process for the lifetime of the run.
///
/// The identity is what the leader writes into the lease key, so it has to
/// round-trip through the store as a plain integer string.
///
/// # Examples
///
/// ```rust
/// use baton_core::ProcessId;
///
/// let id = ProcessId::new(4242);
/// assert_eq!(id.to_string(), "4242");
/// assert_eq!("4242".parse::<ProcessId>().unwrap(), id);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProcessId(pub u32);

impl ProcessId {
    /// Creates an identity from an explicit value.
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    /// Identity of the running OS process.
    pub fn current() -> Self {
        Self(std::process::id())
    }

    pub fn value(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ProcessId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<u32>().map(Self)
    }
}

impl From<u32> for ProcessId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

/// Behavioural mode of a worker process.
///
/// A process starts `Unelected` and, after its first election attempt, is
/// always either `Leader` or `Follower`. There is no terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Role {
    #[default]
    Unelected,
    Leader,
    Follower,
}

impl Role {
    pub fn is_leader(&self) -> bool {
        matches!(self, Role::Leader)
    }

    pub fn is_follower(&self) -> bool {
        matches!(self, Role::Follower)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Unelected => write!(f, "unelected"),
            Role::Leader => write!(f, "leader"),
            Role::Follower => write!(f, "follower"),
        }
    }
}

/// Opaque work item handed from the leader to exactly one follower.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Message(pub String);

impl Message {
    pub fn new(payload: impl Into<String>) -> Self {
        Self(payload.into())
    }

    /// Generates a random alphanumeric payload of `len` characters.
    pub fn random<R: Rng + ?Sized>(rng: &mut R, len: usize) -> Self {
        let payload: String = rng
            .sample_iter(&Alphanumeric)
            .take(len)
            .map(char::from)
            .collect();
        Self(payload)
    }

    pub fn payload(&self) -> &str {
        &self.0
    }

    pub fn into_payload(self) -> String {
        self.0
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for Message {
    fn from(payload: String) -> Self {
        Self(payload)
    }
}

/// Names of the three store-resident objects every worker agrees on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaseKeys {
    /// Key holding the current leader's identity
    pub lease: String,
    /// List used as the shared work queue
    pub queue: String,
    /// List collecting payloads flagged during consumption
    pub errors: String,
}

impl Default for LeaseKeys {
    fn default() -> Self {
        Self {
            lease: "MAIN_KEY".to_string(),
            queue: "messages".to_string(),
            errors: "errors".to_string(),
        }
    }
}

impl LeaseKeys {
    /// Prefixes every key, so several independent groups can share one store.
    pub fn with_namespace(namespace: &str) -> Self {
        let defaults = Self::default();
        Self {
            lease: format!("{}:{}", namespace, defaults.lease),
            queue: format!("{}:{}", namespace, defaults.queue),
            errors: format!("{}:{}", namespace, defaults.errors),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_process_id_parses_store_value() {
        assert_eq!("  17 ".parse::<ProcessId>().unwrap(), ProcessId::new(17));
        assert!("not-a-pid".parse::<ProcessId>().is_err());
    }

    #[test]
    fn test_role_defaults_to_unelected() {
        let role = Role::default();
        assert_eq!(role, Role::Unelected);
        assert!(!role.is_leader());
        assert!(!role.is_follower());
    }

    #[test]
    fn test_random_message_is_seed_deterministic() {
        let mut a = StdRng::seed_from_u64(7);
        let mut b = StdRng::seed_from_u64(7);

        let first = Message::random(&mut a, 16);
        assert_eq!(first.payload().len(), 16);
        assert!(first.payload().chars().all(|c| c.is_ascii_alphanumeric()));
        assert_eq!(first, Message::random(&mut b, 16));
    }

    #[test]
    fn test_namespaced_keys() {
        let keys = LeaseKeys::with_namespace("jobs");
        assert_eq!(keys.lease, "jobs:MAIN_KEY");
        assert_eq!(keys.queue, "jobs:messages");
        assert_eq!(keys.errors, "jobs:errors");
    }
}
