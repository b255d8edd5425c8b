use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use redis::{AsyncCommands, aio::MultiplexedConnection};

use super::store::{CacheError, CacheResult, CacheStore, ttl_secs};

const SCAN_BATCH: usize = 200;

/// Redis-backed [`CacheStore`].
///
/// Holds one multiplexed connection that is cloned per call; every command is
/// bounded by `op_timeout` so a stalled server surfaces as
/// [`CacheError::Timeout`] instead of hanging the request.
#[derive(Clone)]
pub struct RedisStore {
    conn: MultiplexedConnection,
    op_timeout: Duration,
}

impl RedisStore {
    pub async fn connect(redis_url: &str, op_timeout: Duration) -> CacheResult<Self> {
        let client = redis::Client::open(redis_url)?;
        let conn = tokio::time::timeout(op_timeout, client.get_multiplexed_async_connection())
            .await
            .map_err(|_| CacheError::Timeout(op_timeout))??;

        let store = Self { conn, op_timeout };
        store.ping().await?;
        tracing::info!("Connected to Redis");
        Ok(store)
    }

    pub async fn ping(&self) -> CacheResult<()> {
        let mut conn = self.conn.clone();
        let _: String = self
            .bounded(redis::cmd("PING").query_async(&mut conn))
            .await?;
        Ok(())
    }

    async fn bounded<T, F>(&self, fut: F) -> CacheResult<T>
    where
        F: Future<Output = redis::RedisResult<T>>,
    {
        match tokio::time::timeout(self.op_timeout, fut).await {
            Ok(result) => result.map_err(CacheError::from),
            Err(_) => {
                tracing::warn!(timeout = ?self.op_timeout, "Redis operation timed out");
                Err(CacheError::Timeout(self.op_timeout))
            }
        }
    }
}

#[async_trait]
impl CacheStore for RedisStore {
    async fn set(&self, key: &str, value: String, ttl: Duration) -> CacheResult<()> {
        let mut conn = self.conn.clone();
        let _: () = self.bounded(conn.set_ex(key, value, ttl_secs(ttl))).await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> CacheResult<String> {
        let mut conn = self.conn.clone();
        let value: Option<String> = self.bounded(conn.get(key)).await?;
        value.ok_or(CacheError::NotFound)
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        let mut conn = self.conn.clone();
        let _: () = self.bounded(conn.del(key)).await?;
        Ok(())
    }

    async fn exists(&self, key: &str) -> CacheResult<bool> {
        let mut conn = self.conn.clone();
        self.bounded(conn.exists(key)).await
    }

    async fn delete_pattern(&self, pattern: &str) -> CacheResult<u64> {
        let mut conn = self.conn.clone();
        let mut cursor: u64 = 0;
        let mut deleted: u64 = 0;

        // SCAN instead of KEYS so a large keyspace never blocks the server.
        loop {
            let (next, keys): (u64, Vec<String>) = self
                .bounded(
                    redis::cmd("SCAN")
                        .arg(cursor)
                        .arg("MATCH")
                        .arg(pattern)
                        .arg("COUNT")
                        .arg(SCAN_BATCH)
                        .query_async(&mut conn),
                )
                .await?;

            if !keys.is_empty() {
                let removed: u64 = self.bounded(conn.del(keys.as_slice())).await?;
                deleted += removed;
            }

            if next == 0 {
                break;
            }
            cursor = next;
        }

        Ok(deleted)
    }

    async fn set_if_absent(&self, key: &str, value: String, ttl: Duration) -> CacheResult<bool> {
        let mut conn = self.conn.clone();
        let reply: redis::Value = self
            .bounded(
                redis::cmd("SET")
                    .arg(key)
                    .arg(value)
                    .arg("NX")
                    .arg("EX")
                    .arg(ttl_secs(ttl))
                    .query_async(&mut conn),
            )
            .await?;
        Ok(!matches!(reply, redis::Value::Nil))
    }

    async fn increment(&self, key: &str) -> CacheResult<i64> {
        let mut conn = self.conn.clone();
        self.bounded(conn.incr(key, 1)).await
    }

    async fn expire(&self, key: &str, ttl: Duration) -> CacheResult<()> {
        let mut conn = self.conn.clone();
        let _: () = self.bounded(conn.expire(key, ttl_secs(ttl) as i64)).await?;
        Ok(())
    }

    async fn set_add(&self, key: &str, member: &str, ttl: Duration) -> CacheResult<()> {
        let mut conn = self.conn.clone();
        let _: () = self
            .bounded(
                redis::pipe()
                    .atomic()
                    .sadd(key, member)
                    .ignore()
                    .expire(key, ttl_secs(ttl) as i64)
                    .ignore()
                    .query_async(&mut conn),
            )
            .await?;
        Ok(())
    }

    async fn set_remove(&self, key: &str, member: &str) -> CacheResult<()> {
        let mut conn = self.conn.clone();
        let _: () = self.bounded(conn.srem(key, member)).await?;
        Ok(())
    }

    async fn set_members(&self, key: &str) -> CacheResult<Vec<String>> {
        let mut conn = self.conn.clone();
        self.bounded(conn.smembers(key)).await
    }
}
