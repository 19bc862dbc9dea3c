//! Shared counter store behind the admission algorithms.
//!
//! Every algorithm keeps its state here and nowhere else, so all instances
//! of the service pointed at the same backend enforce one combined limit.
//! Each operation is individually atomic on the backend; sequences of
//! operations are NOT composed atomically, and the algorithms that chain a
//! read with a later write inherit a bounded race under concurrent checks
//! for the same key (see the token bucket and sliding window log modules).
use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;

mod memory;
mod redis;

pub use memory::MemoryStore;
pub use self::redis::RedisStore;

/// Atomic counter, ordered-set, and multi-field record operations against a
/// shared backend.
///
/// Implementations must bound every round-trip: a call either completes or
/// fails with `SiskinError::Store` inside the configured timeout, never
/// hangs. A failed call leaves the decision to the caller, which fails
/// closed.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Atomically increment the integer at `key`, creating it at 1 when
    /// absent. Returns the post-increment value.
    async fn increment(&self, key: &str) -> Result<i64>;

    /// Set or refresh a TTL on `key`. Returns `false` when the key does not
    /// exist (already expired; non-fatal).
    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool>;

    /// Point read of an integer counter. `None` when absent.
    async fn get_counter(&self, key: &str) -> Result<Option<i64>>;

    /// Remove `key` outright. Returns `false` when it was already gone.
    async fn delete(&self, key: &str) -> Result<bool>;

    /// Insert `member` into the ordered set at `key` with the given score.
    /// Re-adding an existing member updates its score.
    async fn sorted_set_add(&self, key: &str, score: i64, member: &str) -> Result<()>;

    /// Remove every member whose score falls in `[min, max]` (inclusive).
    /// Returns the number removed. Pass `i64::MIN` for an open lower bound.
    async fn sorted_set_remove_range(&self, key: &str, min: i64, max: i64) -> Result<u64>;

    /// Number of members in the ordered set at `key` (0 when absent).
    async fn sorted_set_len(&self, key: &str) -> Result<u64>;

    /// Read several fields of the record at `key`. Absent fields (or a
    /// wholly absent record) come back as `None`, position-matched to
    /// `fields`.
    async fn hash_get_multi(&self, key: &str, fields: &[&str]) -> Result<Vec<Option<String>>>;

    /// Write several fields of the record at `key`, creating it if needed.
    async fn hash_set_multi(&self, key: &str, entries: &[(&str, String)]) -> Result<()>;
}
