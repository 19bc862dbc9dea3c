//! Admission algorithms and the policy dispatcher.
//!
//! Each algorithm lives in its own module and owns its key namespace on the
//! shared store, so one client checked under two policies never shares
//! counters between them.
pub mod fixed_window;
pub mod leaky_bucket;
pub mod sliding_window_counter;
pub mod sliding_window_log;
pub mod token_bucket;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::store::CounterStore;

/// Limit over a single window of time (fixed window and sliding window log).
#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
pub struct WindowPolicy {
    /// Max admissions per window, inclusive
    pub limit: u32,
    pub window: Duration,
}

/// Limit over a window approximated from fixed-size sub-windows.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
pub struct SlidingWindowPolicy {
    pub limit: u32,
    /// Nominal span the limit is enforced over
    pub window: Duration,
    /// Slice size; smaller slices track the true sliding count more closely
    /// at the cost of more live keys
    pub sub_window: Duration,
}

/// Capacity-based limit refilled continuously (token and leaky bucket).
#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
pub struct BucketPolicy {
    /// Burst allowance: the most capacity a bucket can hold
    pub capacity: u32,
    /// Sustained refill rate
    pub rate_per_second: f64,
}

/// One policy per deployment: the algorithm and its knobs, as a closed set.
///
/// There is deliberately no string-to-algorithm lookup at decision time; a
/// name that parsed at startup is the only way to reach any of these arms.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
#[serde(tag = "algorithm", rename_all = "kebab-case")]
pub enum RatePolicy {
    FixedWindow(WindowPolicy),
    SlidingWindowLog(WindowPolicy),
    SlidingWindowCounter(SlidingWindowPolicy),
    TokenBucket(BucketPolicy),
    LeakyBucket(BucketPolicy),
}

/// The decision dispatcher: applies the configured policy to a client key
/// against the shared counter store.
///
/// Holds no decision state of its own; everything lives in the store, so
/// clones of this handle (one per request task) are interchangeable.
#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn CounterStore>,
    policy: RatePolicy,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn CounterStore>, policy: RatePolicy) -> Self {
        Self { store, policy }
    }

    pub fn policy(&self) -> &RatePolicy {
        &self.policy
    }

    /// Decide whether `client_key` may proceed. `Ok(false)` is a rejection;
    /// `Err` means the store could not answer and the caller must fail
    /// closed.
    pub async fn allow(&self, client_key: &str) -> Result<bool> {
        let store = self.store.as_ref();
        match &self.policy {
            RatePolicy::FixedWindow(policy) => {
                fixed_window::allow(store, client_key, policy).await
            }
            RatePolicy::SlidingWindowLog(policy) => {
                sliding_window_log::allow(store, client_key, policy).await
            }
            RatePolicy::SlidingWindowCounter(policy) => {
                sliding_window_counter::allow(store, client_key, policy).await
            }
            RatePolicy::TokenBucket(policy) => {
                token_bucket::allow(store, client_key, policy).await
            }
            RatePolicy::LeakyBucket(policy) => {
                leaky_bucket::allow(store, client_key, policy).await
            }
        }
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

/// Wall-clock time in integer nanoseconds, the scoring unit for the
/// windowed algorithms.
pub(crate) fn now_nanos() -> i64 {
    // out of i64 range only after the year 2262
    Utc::now().timestamp_nanos_opt().unwrap_or(i64::MAX)
}

/// Wall-clock time in fractional seconds, the unit bucket records persist.
pub(crate) fn now_seconds() -> f64 {
    Utc::now().timestamp_micros() as f64 / 1e6
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_serializes_with_algorithm_tag() {
        let policy = RatePolicy::TokenBucket(BucketPolicy {
            capacity: 5,
            rate_per_second: 1.0,
        });
        let json = serde_json::to_value(&policy).unwrap();
        assert_eq!(json["algorithm"], "token-bucket");
        assert_eq!(json["capacity"], 5);
    }

    #[test]
    fn clocks_are_consistent() {
        let nanos = now_nanos();
        let seconds = now_seconds();
        // same instant to within a second, both positive
        assert!(nanos > 0);
        assert!((nanos as f64 / 1e9 - seconds).abs() < 1.0);
    }
}
