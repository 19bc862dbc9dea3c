//! Fixed window counter.
//!
//! One integer per client, reset by store TTL. The increment is atomic on
//! the backend, so this algorithm is exact under concurrent checks: a
//! window admits at most `limit` requests no matter how many racers hit it.
//! The trade-off is the usual edge burst: up to `2 * limit` requests can
//! land inside one window-length span straddling a boundary.
use crate::error::Result;
use crate::store::CounterStore;

use super::WindowPolicy;

const KEY_PREFIX: &str = "fixed";

pub(crate) fn storage_key(client_key: &str) -> String {
    format!("{}:{}", KEY_PREFIX, client_key)
}

pub async fn allow(
    store: &dyn CounterStore,
    client_key: &str,
    policy: &WindowPolicy,
) -> Result<bool> {
    let key = storage_key(client_key);
    let count = store.increment(&key).await?;
    if count == 1 {
        // First writer in a fresh window sets the boundary. If this fails
        // the counter would never reset, so the whole decision fails.
        store.expire(&key, policy.window).await?;
    }
    Ok(count <= i64::from(policy.limit))
}
