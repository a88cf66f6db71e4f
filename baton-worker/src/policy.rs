//! Probabilistic delivery-failure injection applied by followers.

use crate::WorkerConfig;
use baton_core::{BatonError, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Decides, per consumed message, whether delivery is treated as failed.
///
/// The random source is seedable, so a fixed seed yields a reproducible
/// sequence of verdicts.
#[derive(Debug, Clone)]
pub struct FailureInjector {
    probability: f64,
    rng: StdRng,
}

impl FailureInjector {
    pub fn new(probability: f64, seed: Option<u64>) -> Result<Self> {
        if !(0.0..=1.0).contains(&probability) {
            return Err(BatonError::config(format!(
                "failure probability must be within [0, 1], got {}",
                probability
            )));
        }

        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(Self { probability, rng })
    }

    pub fn from_config(config: &WorkerConfig) -> Result<Self> {
        Self::new(config.failure_probability, config.randomization_seed)
    }

    /// Never flags a message.
    pub fn never() -> Self {
        Self {
            probability: 0.0,
            rng: StdRng::seed_from_u64(0),
        }
    }

    /// Flags every message.
    pub fn always() -> Self {
        Self {
            probability: 1.0,
            rng: StdRng::seed_from_u64(0),
        }
    }

    pub fn probability(&self) -> f64 {
        self.probability
    }

    pub fn should_fail(&mut self) -> bool {
        self.rng.gen_bool(self.probability)
    }
}
