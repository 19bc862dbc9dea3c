//! Token bucket.
//!
//! Capacity refills continuously at the policy rate; each admission spends
//! one token. State is a two-field record per client: the token balance
//! and the time it was last refilled, both fractional seconds.
//!
//! The read-refill-write cycle spans two store operations, so concurrent
//! checks for one key can both observe the same balance and both spend it.
//! Over-admission is bounded by the number of in-flight racers for that
//! key; requests serialized through the store are exact.
use crate::error::Result;
use crate::store::CounterStore;

use super::{now_seconds, BucketPolicy};

const KEY_PREFIX: &str = "bucket:token";

pub(crate) const FIELD_TOKENS: &str = "tokens";
pub(crate) const FIELD_LAST_REFILL: &str = "last_refill";

/// Token balance after `elapsed_seconds` of refill, clamped to capacity.
/// Negative elapsed time (a peer with a faster clock wrote the record)
/// refills nothing rather than minting tokens.
pub(crate) fn refill(tokens: f64, elapsed_seconds: f64, policy: &BucketPolicy) -> f64 {
    let refilled = tokens + elapsed_seconds.max(0.0) * policy.rate_per_second;
    refilled.min(f64::from(policy.capacity))
}

pub async fn allow(
    store: &dyn CounterStore,
    client_key: &str,
    policy: &BucketPolicy,
) -> Result<bool> {
    allow_with_prefix(store, KEY_PREFIX, client_key, policy, now_seconds()).await
}

/// Shared bucket update rule; the leaky bucket runs the same arithmetic
/// under its own key namespace.
pub(crate) async fn allow_with_prefix(
    store: &dyn CounterStore,
    prefix: &str,
    client_key: &str,
    policy: &BucketPolicy,
    now: f64,
) -> Result<bool> {
    let key = format!("{}:{}", prefix, client_key);
    let fields = store
        .hash_get_multi(&key, &[FIELD_TOKENS, FIELD_LAST_REFILL])
        .await?;
    let stored_tokens = parse_field(fields.first());
    let stored_last_refill = parse_field(fields.get(1));

    let (tokens, last_refill) = match (stored_tokens, stored_last_refill) {
        // Cold start: no record yet, bucket begins full. Seeding explicitly
        // avoids measuring "elapsed" from the epoch default.
        (None, None) => (f64::from(policy.capacity), now),
        (tokens, last_refill) => (tokens.unwrap_or(0.0), last_refill.unwrap_or(0.0)),
    };

    let mut tokens = refill(tokens, now - last_refill, policy);
    if tokens < 1.0 {
        // Rejection persists nothing: the balance keeps accruing from the
        // last admitted request's timestamp.
        return Ok(false);
    }

    tokens -= 1.0;
    store
        .hash_set_multi(
            &key,
            &[
                (FIELD_TOKENS, tokens.to_string()),
                (FIELD_LAST_REFILL, now.to_string()),
            ],
        )
        .await?;
    Ok(true)
}

// Unparseable field contents read as absent, like the reference client did.
fn parse_field(field: Option<&Option<String>>) -> Option<f64> {
    field
        .and_then(|value| value.as_deref())
        .and_then(|value| value.parse::<f64>().ok())
}
