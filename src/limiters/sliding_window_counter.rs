//! Sliding window counter.
//!
//! Approximates the sliding-window-log count with O(1) storage: one integer
//! counter per (client, sub-window) pair, and the previous sub-window's
//! count weighted down linearly as it ages out. The counter half rides on
//! atomic `increment`, so concurrent checks never lose an admission; only
//! the interpolation is approximate.
use crate::error::Result;
use crate::store::CounterStore;

use super::{now_nanos, SlidingWindowPolicy};

const KEY_PREFIX: &str = "swc";

pub(crate) fn storage_key(client_key: &str, sub_index: i64) -> String {
    format!("{}:{}:{}", KEY_PREFIX, client_key, sub_index)
}

/// Weighted combination of the previous and current sub-window counts.
/// `fraction_elapsed` is how far into the current sub-window `now` falls,
/// in `[0, 1)`.
pub(crate) fn effective_count(prev: i64, curr: i64, fraction_elapsed: f64) -> f64 {
    prev as f64 * (1.0 - fraction_elapsed) + curr as f64
}

pub async fn allow(
    store: &dyn CounterStore,
    client_key: &str,
    policy: &SlidingWindowPolicy,
) -> Result<bool> {
    allow_at(store, client_key, policy, now_nanos()).await
}

pub(crate) async fn allow_at(
    store: &dyn CounterStore,
    client_key: &str,
    policy: &SlidingWindowPolicy,
    now: i64,
) -> Result<bool> {
    let sub_nanos = policy.sub_window.as_nanos() as i64;
    let sub_index = now.div_euclid(sub_nanos);

    let curr_key = storage_key(client_key, sub_index);
    let curr_count = store.increment(&curr_key).await?;
    // TTL of two sub-windows: long enough to be read back as "previous"
    // exactly once, then gone
    store.expire(&curr_key, 2 * policy.sub_window).await?;

    let prev_key = storage_key(client_key, sub_index - 1);
    let prev_count = store.get_counter(&prev_key).await?.unwrap_or(0);

    let fraction_elapsed = now.rem_euclid(sub_nanos) as f64 / sub_nanos as f64;
    let effective = effective_count(prev_count, curr_count, fraction_elapsed);
    Ok(effective <= f64::from(policy.limit))
}
