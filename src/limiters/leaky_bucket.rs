//! Leaky bucket.
//!
//! Same state and update rule as the token bucket in this design: capacity
//! refills at the policy rate, one unit spent per admission. It stays a
//! distinct named policy with its own key namespace because the two model
//! different things for callers: a leaky bucket smooths output rate, a
//! token bucket admits bursts. A client checked under both never shares a
//! record between them.
use crate::error::Result;
use crate::store::CounterStore;

use super::{now_seconds, token_bucket, BucketPolicy};

const KEY_PREFIX: &str = "bucket:leaky";

pub async fn allow(
    store: &dyn CounterStore,
    client_key: &str,
    policy: &BucketPolicy,
) -> Result<bool> {
    token_bucket::allow_with_prefix(store, KEY_PREFIX, client_key, policy, now_seconds()).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn drains_and_refills_like_a_bucket() {
        let store = MemoryStore::new();
        let policy = BucketPolicy {
            capacity: 3,
            rate_per_second: 1000.0,
        };
        for _ in 0..3 {
            assert!(allow(&store, "c", &policy).await.unwrap());
        }
        // refill at 1000/s restores a token almost immediately
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        assert!(allow(&store, "c", &policy).await.unwrap());
    }

    #[tokio::test]
    async fn namespace_is_independent_of_token_bucket() {
        let store = MemoryStore::new();
        let policy = BucketPolicy {
            capacity: 1,
            rate_per_second: 0.001,
        };
        // exhaust the leaky bucket for this client
        assert!(allow(&store, "c", &policy).await.unwrap());
        assert!(!allow(&store, "c", &policy).await.unwrap());
        // the token bucket record for the same client is untouched
        assert!(token_bucket::allow(&store, "c", &policy).await.unwrap());
    }
}
