//! In-process counter store.
//!
//! Backs single-instance deployments and the test suite. Expired keys are
//! dropped lazily on access; [`MemoryStore::purge_expired`] sweeps the rest
//! so an idle process does not accumulate dead clients.
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::RwLock;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::error::Result;
use crate::store_error;

use super::CounterStore;

#[derive(Debug)]
enum Value {
    Counter(i64),
    // score -> members at that score
    SortedSet(BTreeMap<i64, BTreeSet<String>>),
    Hash(HashMap<String, String>),
}

impl Value {
    fn type_name(&self) -> &'static str {
        match self {
            Value::Counter(_) => "counter",
            Value::SortedSet(_) => "sorted set",
            Value::Hash(_) => "hash",
        }
    }
}

#[derive(Debug)]
struct Entry {
    value: Value,
    expires_at: Option<Instant>,
}

impl Entry {
    fn new(value: Value) -> Self {
        Self {
            value,
            expires_at: None,
        }
    }

    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|deadline| deadline <= now)
    }
}

/// Counter store held in process memory.
///
/// Lock discipline mirrors the rest of the codebase: the `RwLock` is only
/// held across synchronous map access, never across an await point.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Entry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every entry whose TTL has elapsed. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = match self.entries.write() {
            Ok(entries) => entries,
            Err(poisoned) => poisoned.into_inner(),
        };
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        before - entries.len()
    }

    /// Number of live keys (expired-but-unswept keys excluded).
    pub fn len(&self) -> usize {
        let now = Instant::now();
        match self.entries.read() {
            Ok(entries) => entries.values().filter(|e| !e.is_expired(now)).count(),
            Err(poisoned) => poisoned
                .into_inner()
                .values()
                .filter(|e| !e.is_expired(now))
                .count(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run `f` over the live entry for `key`, inserting `default()` first
    /// when the key is absent or expired.
    fn with_entry<T>(
        &self,
        key: &str,
        default: impl Fn() -> Value,
        f: impl FnOnce(&mut Entry) -> Result<T>,
    ) -> Result<T> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| store_error!("memory store lock poisoned"))?;
        let now = Instant::now();
        let entry = entries
            .entry(key.to_string())
            .or_insert_with(|| Entry::new(default()));
        if entry.is_expired(now) {
            *entry = Entry::new(default());
        }
        f(entry)
    }

    /// Run `f` over the live entry for `key`, if any.
    fn with_live_entry<T>(
        &self,
        key: &str,
        f: impl FnOnce(Option<&mut Entry>) -> Result<T>,
    ) -> Result<T> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| store_error!("memory store lock poisoned"))?;
        let now = Instant::now();
        if entries.get(key).is_some_and(|entry| entry.is_expired(now)) {
            entries.remove(key);
        }
        f(entries.get_mut(key))
    }
}

fn wrong_type(key: &str, found: &Value) -> crate::error::SiskinError {
    store_error!("key {} holds a {}, not the expected type", key, found.type_name())
}

#[async_trait]
impl CounterStore for MemoryStore {
    async fn increment(&self, key: &str) -> Result<i64> {
        self.with_entry(
            key,
            || Value::Counter(0),
            |entry| match &mut entry.value {
                Value::Counter(count) => {
                    *count += 1;
                    Ok(*count)
                }
                other => Err(wrong_type(key, other)),
            },
        )
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool> {
        self.with_live_entry(key, |entry| match entry {
            Some(entry) => {
                entry.expires_at = Some(Instant::now() + ttl);
                Ok(true)
            }
            None => Ok(false),
        })
    }

    async fn get_counter(&self, key: &str) -> Result<Option<i64>> {
        self.with_live_entry(key, |entry| match entry {
            Some(entry) => match &entry.value {
                Value::Counter(count) => Ok(Some(*count)),
                other => Err(wrong_type(key, other)),
            },
            None => Ok(None),
        })
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| store_error!("memory store lock poisoned"))?;
        let now = Instant::now();
        match entries.remove(key) {
            Some(entry) => Ok(!entry.is_expired(now)),
            None => Ok(false),
        }
    }

    async fn sorted_set_add(&self, key: &str, score: i64, member: &str) -> Result<()> {
        self.with_entry(
            key,
            || Value::SortedSet(BTreeMap::new()),
            |entry| match &mut entry.value {
                Value::SortedSet(scores) => {
                    // drop the member from any previous score before re-adding
                    scores.retain(|_, members| {
                        members.remove(member);
                        !members.is_empty()
                    });
                    scores.entry(score).or_default().insert(member.to_string());
                    Ok(())
                }
                other => Err(wrong_type(key, other)),
            },
        )
    }

    async fn sorted_set_remove_range(&self, key: &str, min: i64, max: i64) -> Result<u64> {
        self.with_live_entry(key, |entry| match entry {
            Some(entry) => match &mut entry.value {
                Value::SortedSet(scores) => {
                    let mut removed = 0u64;
                    scores.retain(|score, members| {
                        if (min..=max).contains(score) {
                            removed += members.len() as u64;
                            false
                        } else {
                            true
                        }
                    });
                    Ok(removed)
                }
                other => Err(wrong_type(key, other)),
            },
            None => Ok(0),
        })
    }

    async fn sorted_set_len(&self, key: &str) -> Result<u64> {
        self.with_live_entry(key, |entry| match entry {
            Some(entry) => match &entry.value {
                Value::SortedSet(scores) => {
                    Ok(scores.values().map(|members| members.len() as u64).sum())
                }
                other => Err(wrong_type(key, other)),
            },
            None => Ok(0),
        })
    }

    async fn hash_get_multi(&self, key: &str, fields: &[&str]) -> Result<Vec<Option<String>>> {
        self.with_live_entry(key, |entry| match entry {
            Some(entry) => match &entry.value {
                Value::Hash(record) => Ok(fields
                    .iter()
                    .map(|field| record.get(*field).cloned())
                    .collect()),
                other => Err(wrong_type(key, other)),
            },
            None => Ok(vec![None; fields.len()]),
        })
    }

    async fn hash_set_multi(&self, key: &str, entries: &[(&str, String)]) -> Result<()> {
        self.with_entry(
            key,
            || Value::Hash(HashMap::new()),
            |entry| match &mut entry.value {
                Value::Hash(record) => {
                    for (field, value) in entries {
                        record.insert((*field).to_string(), value.clone());
                    }
                    Ok(())
                }
                other => Err(wrong_type(key, other)),
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{self, Duration};

    #[tokio::test]
    async fn increment_creates_at_one() {
        let store = MemoryStore::new();
        assert_eq!(store.increment("c").await.unwrap(), 1);
        assert_eq!(store.increment("c").await.unwrap(), 2);
        assert_eq!(store.get_counter("c").await.unwrap(), Some(2));
    }

    #[tokio::test]
    async fn expire_on_absent_key_is_false() {
        let store = MemoryStore::new();
        assert!(!store.expire("missing", Duration::from_secs(1)).await.unwrap());
    }

    #[tokio::test]
    async fn ttl_evicts_counters() {
        let store = MemoryStore::new();
        store.increment("c").await.unwrap();
        assert!(store.expire("c", Duration::from_millis(30)).await.unwrap());
        time::sleep(Duration::from_millis(60)).await;
        assert_eq!(store.get_counter("c").await.unwrap(), None);
        // a fresh increment starts over at 1
        assert_eq!(store.increment("c").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn sorted_set_range_removal() {
        let store = MemoryStore::new();
        for score in [10i64, 20, 30, 40] {
            store
                .sorted_set_add("z", score, &score.to_string())
                .await
                .unwrap();
        }
        assert_eq!(store.sorted_set_len("z").await.unwrap(), 4);
        let removed = store.sorted_set_remove_range("z", i64::MIN, 20).await.unwrap();
        assert_eq!(removed, 2);
        assert_eq!(store.sorted_set_len("z").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn sorted_set_readd_same_member_keeps_one() {
        let store = MemoryStore::new();
        store.sorted_set_add("z", 5, "m").await.unwrap();
        store.sorted_set_add("z", 9, "m").await.unwrap();
        assert_eq!(store.sorted_set_len("z").await.unwrap(), 1);
        // the surviving copy carries the new score
        assert_eq!(store.sorted_set_remove_range("z", 9, 9).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn hash_multi_round_trip() {
        let store = MemoryStore::new();
        let absent = store.hash_get_multi("h", &["tokens", "last_refill"]).await.unwrap();
        assert_eq!(absent, vec![None, None]);

        store
            .hash_set_multi("h", &[("tokens", "4.5".to_string()), ("last_refill", "100.25".to_string())])
            .await
            .unwrap();
        let present = store.hash_get_multi("h", &["tokens", "last_refill"]).await.unwrap();
        assert_eq!(
            present,
            vec![Some("4.5".to_string()), Some("100.25".to_string())]
        );
        // unknown fields read back as None without disturbing the rest
        let partial = store.hash_get_multi("h", &["tokens", "nope"]).await.unwrap();
        assert_eq!(partial, vec![Some("4.5".to_string()), None]);
    }

    #[tokio::test]
    async fn wrong_type_access_is_an_error() {
        let store = MemoryStore::new();
        store.increment("c").await.unwrap();
        assert!(store.sorted_set_len("c").await.is_err());
        assert!(store.hash_get_multi("c", &["f"]).await.is_err());
    }

    #[tokio::test]
    async fn purge_expired_sweeps_dead_keys() {
        let store = MemoryStore::new();
        store.increment("a").await.unwrap();
        store.increment("b").await.unwrap();
        store.expire("a", Duration::from_millis(20)).await.unwrap();
        time::sleep(Duration::from_millis(50)).await;
        assert_eq!(store.purge_expired(), 1);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn delete_reports_presence() {
        let store = MemoryStore::new();
        store.increment("c").await.unwrap();
        assert!(store.delete("c").await.unwrap());
        assert!(!store.delete("c").await.unwrap());
    }
}
