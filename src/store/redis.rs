//! Redis-backed counter store.
//!
//! One connection manager shared by every decision; each operation is a
//! single Redis command (individually atomic on the server) bounded by the
//! configured per-operation timeout.
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{Client, Cmd, FromRedisValue};
use tracing::info;

use crate::error::Result;
use crate::store_error;

use super::CounterStore;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

pub struct RedisStore {
    conn: ConnectionManager,
    op_timeout: Duration,
}

impl RedisStore {
    /// Connect to the store at `url`. Fails rather than hangs when the
    /// backend is unreachable.
    pub async fn connect(url: &str, op_timeout: Duration) -> Result<Self> {
        let client = Client::open(url)?;
        let conn = tokio::time::timeout(CONNECT_TIMEOUT, ConnectionManager::new(client))
            .await
            .map_err(|_| store_error!("connection to {} timed out", url))??;
        info!(url = %url, "Connected to Redis counter store");
        Ok(Self { conn, op_timeout })
    }

    /// Run one command inside the per-operation deadline.
    async fn run<T: FromRedisValue + Send>(&self, cmd: Cmd) -> Result<T> {
        let mut conn = self.conn.clone();
        match tokio::time::timeout(self.op_timeout, async move {
            let value: T = cmd.query_async(&mut conn).await?;
            redis::RedisResult::Ok(value)
        })
        .await
        {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => Err(err.into()),
            Err(_) => Err(store_error!(
                "operation timed out after {}ms",
                self.op_timeout.as_millis()
            )),
        }
    }
}

#[async_trait]
impl CounterStore for RedisStore {
    async fn increment(&self, key: &str) -> Result<i64> {
        let mut cmd = redis::cmd("INCR");
        cmd.arg(key);
        self.run(cmd).await
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool> {
        let mut cmd = redis::cmd("PEXPIRE");
        cmd.arg(key).arg((ttl.as_millis() as i64).max(1));
        let set: i64 = self.run(cmd).await?;
        Ok(set == 1)
    }

    async fn get_counter(&self, key: &str) -> Result<Option<i64>> {
        let mut cmd = redis::cmd("GET");
        cmd.arg(key);
        self.run(cmd).await
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let mut cmd = redis::cmd("DEL");
        cmd.arg(key);
        let removed: i64 = self.run(cmd).await?;
        Ok(removed > 0)
    }

    async fn sorted_set_add(&self, key: &str, score: i64, member: &str) -> Result<()> {
        let mut cmd = redis::cmd("ZADD");
        cmd.arg(key).arg(score).arg(member);
        let _added: i64 = self.run(cmd).await?;
        Ok(())
    }

    async fn sorted_set_remove_range(&self, key: &str, min: i64, max: i64) -> Result<u64> {
        let mut cmd = redis::cmd("ZREMRANGEBYSCORE");
        cmd.arg(key);
        if min == i64::MIN {
            cmd.arg("-inf");
        } else {
            cmd.arg(min);
        }
        cmd.arg(max);
        self.run(cmd).await
    }

    async fn sorted_set_len(&self, key: &str) -> Result<u64> {
        let mut cmd = redis::cmd("ZCARD");
        cmd.arg(key);
        self.run(cmd).await
    }

    async fn hash_get_multi(&self, key: &str, fields: &[&str]) -> Result<Vec<Option<String>>> {
        let mut cmd = redis::cmd("HMGET");
        cmd.arg(key);
        for field in fields {
            cmd.arg(*field);
        }
        self.run(cmd).await
    }

    async fn hash_set_multi(&self, key: &str, entries: &[(&str, String)]) -> Result<()> {
        let mut cmd = redis::cmd("HSET");
        cmd.arg(key);
        for (field, value) in entries {
            cmd.arg(*field).arg(value);
        }
        let _set: i64 = self.run(cmd).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Exercised only when a test Redis is reachable; mirrors how the rest
    // of the suite runs against MemoryStore.
    async fn test_store() -> Option<RedisStore> {
        let url =
            std::env::var("SISKIN_TEST_REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());
        RedisStore::connect(&url, Duration::from_millis(500)).await.ok()
    }

    #[tokio::test]
    async fn redis_counter_round_trip() {
        let store = match test_store().await {
            Some(store) => store,
            None => return,
        };
        let key = "siskin-test:counter";
        store.delete(key).await.unwrap();
        assert_eq!(store.increment(key).await.unwrap(), 1);
        assert_eq!(store.increment(key).await.unwrap(), 2);
        assert!(store.expire(key, Duration::from_millis(100)).await.unwrap());
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(store.get_counter(key).await.unwrap(), None);
    }
}
