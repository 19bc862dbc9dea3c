//! Sliding window log.
//!
//! Keeps every admission timestamp for the trailing window in an ordered
//! set, so the count is exact rather than approximated. Storage is
//! O(limit) live entries per client; a TTL of one window bounds what an
//! idle key can leave behind.
//!
//! The evict-count-add sequence is three separate store operations, so
//! concurrent checks for one key can each pass the count before any of
//! them records its entry. Over-admission is bounded by the number of
//! in-flight racers; exactness holds whenever requests for a key are
//! serialized through the store.
use crate::error::Result;
use crate::store::CounterStore;

use super::{now_nanos, WindowPolicy};

const KEY_PREFIX: &str = "log";

pub(crate) fn storage_key(client_key: &str) -> String {
    format!("{}:{}", KEY_PREFIX, client_key)
}

pub async fn allow(
    store: &dyn CounterStore,
    client_key: &str,
    policy: &WindowPolicy,
) -> Result<bool> {
    allow_at(store, client_key, policy, now_nanos()).await
}

/// Decision at an explicit instant; `allow` supplies the wall clock.
pub(crate) async fn allow_at(
    store: &dyn CounterStore,
    client_key: &str,
    policy: &WindowPolicy,
    now: i64,
) -> Result<bool> {
    let key = storage_key(client_key);
    let window_start = now.saturating_sub(policy.window.as_nanos() as i64);

    store
        .sorted_set_remove_range(&key, i64::MIN, window_start)
        .await?;
    let count = store.sorted_set_len(&key).await?;
    if count >= u64::from(policy.limit) {
        // limit = max resident entries; the next one over is rejected and
        // leaves no trace
        return Ok(false);
    }

    store.sorted_set_add(&key, now, &now.to_string()).await?;
    store.expire(&key, policy.window).await?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::store::MemoryStore;

    const NANOS_PER_SEC: i64 = 1_000_000_000;

    fn policy(limit: u32, window_secs: u64) -> WindowPolicy {
        WindowPolicy {
            limit,
            window: Duration::from_secs(window_secs),
        }
    }

    #[tokio::test]
    async fn boundary_is_exclusive_at_the_limit() {
        let store = MemoryStore::new();
        let policy = policy(5, 10);
        let start = now_nanos();

        // 5 calls spaced one second apart all admitted
        for i in 0..5 {
            let at = start + i * NANOS_PER_SEC;
            assert!(allow_at(&store, "c", &policy, at).await.unwrap());
        }
        // 6th inside the same span rejected
        let at = start + 5 * NANOS_PER_SEC;
        assert!(!allow_at(&store, "c", &policy, at).await.unwrap());
    }

    #[tokio::test]
    async fn eviction_frees_capacity_monotonically() {
        let store = MemoryStore::new();
        let policy = policy(3, 10);
        let start = now_nanos();

        for i in 0..3 {
            let at = start + i * NANOS_PER_SEC;
            assert!(allow_at(&store, "c", &policy, at).await.unwrap());
        }
        assert!(!allow_at(&store, "c", &policy, start + 3 * NANOS_PER_SEC)
            .await
            .unwrap());

        // 10.5s after the first entry, exactly that entry has aged out
        let later = start + 10 * NANOS_PER_SEC + NANOS_PER_SEC / 2;
        assert!(allow_at(&store, "c", &policy, later).await.unwrap());
        // capacity is full again until the second entry ages out too
        assert!(!allow_at(&store, "c", &policy, later + 1).await.unwrap());
    }

    #[tokio::test]
    async fn rejection_adds_no_entry() {
        let store = MemoryStore::new();
        let policy = policy(1, 10);
        let start = now_nanos();

        assert!(allow_at(&store, "c", &policy, start).await.unwrap());
        assert!(!allow_at(&store, "c", &policy, start + 1).await.unwrap());
        assert_eq!(
            store.sorted_set_len(&storage_key("c")).await.unwrap(),
            1,
            "rejected call must not extend the log"
        );
    }
}
