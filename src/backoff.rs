//! Per-key requeue backoff with jitter.
//!
//! Lives on the dispatcher side of the controller: the error policy asks it how
//! long to wait before requeueing a failed key, and the result handler resets a
//! key once it reconciles cleanly. The reconciler itself never touches it.

use std::time::Duration;

use dashmap::DashMap;
use rand::Rng;

use crate::ObjectKey;

/// Backoff tuning.
#[derive(Clone, Debug)]
pub struct BackoffConfig {
    /// Delay after the first failure
    pub initial_delay: Duration,
    /// Upper bound for any delay, also used directly for permanent errors
    pub max_delay: Duration,
    /// Multiplier applied per consecutive failure
    pub backoff_multiplier: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(5),
            max_delay: Duration::from_secs(300),
            backoff_multiplier: 2.0,
        }
    }
}

/// Consecutive-failure counters keyed by object
#[derive(Debug, Default)]
pub struct RequeueBackoff {
    config: BackoffConfig,
    failures: DashMap<ObjectKey, u32>,
}

impl RequeueBackoff {
    /// Create a backoff tracker with the given tuning
    pub fn new(config: BackoffConfig) -> Self {
        Self {
            config,
            failures: DashMap::new(),
        }
    }

    /// Record a failure for `key` and return how long to wait before retrying.
    ///
    /// Retryable failures grow exponentially with 0.5x-1.5x jitter, capped at
    /// `max_delay`. Permanent failures wait `max_delay` straight away.
    pub fn next_delay(&self, key: &ObjectKey, retryable: bool) -> Duration {
        let attempt = {
            let mut count = self.failures.entry(key.clone()).or_insert(0);
            let attempt = *count;
            *count = count.saturating_add(1);
            attempt
        };

        if !retryable {
            return self.config.max_delay;
        }

        let jitter = rand::thread_rng().gen_range(0.5..1.5);
        let jittered = self.base_delay(attempt).as_secs_f64() * jitter;
        Duration::from_secs_f64(jittered.min(self.config.max_delay.as_secs_f64()))
    }

    /// Un-jittered delay for the given zero-based attempt
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(64) as i32;
        let secs = self.config.initial_delay.as_secs_f64()
            * self.config.backoff_multiplier.powi(exponent);
        Duration::from_secs_f64(secs.min(self.config.max_delay.as_secs_f64()))
    }

    /// Forget failures for `key` after it reconciled successfully
    pub fn reset(&self, key: &ObjectKey) {
        self.failures.remove(key);
    }

    /// Consecutive failures recorded for `key`
    pub fn failures(&self, key: &ObjectKey) -> u32 {
        self.failures.get(key).map(|count| *count).unwrap_or(0)
    }

    /// Number of keys with recorded failures
    pub fn tracked(&self) -> usize {
        self.failures.len()
    }

    /// Longest delay this tracker hands out
    pub fn max_delay(&self) -> Duration {
        self.config.max_delay
    }
}
