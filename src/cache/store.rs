use std::time::Duration;

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("key not found")]
    NotFound,
    #[error("cache value could not be encoded or decoded: {0}")]
    Codec(#[from] serde_json::Error),
    /// The store answered, but the key holds something the operation cannot
    /// work with (wrong type, non-integer counter, bad pattern).
    #[error("unexpected cache data: {0}")]
    Data(String),
    #[error("cache store unavailable: {0}")]
    Unavailable(String),
    #[error("cache operation timed out after {0:?}")]
    Timeout(Duration),
}

impl CacheError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, CacheError::NotFound)
    }

    /// True when the stored value itself is unusable, as opposed to the
    /// store being unreachable.
    pub fn is_corrupt(&self) -> bool {
        matches!(self, CacheError::Codec(_) | CacheError::Data(_))
    }

    /// True when the store itself could not be reached in time.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, CacheError::Unavailable(_) | CacheError::Timeout(_))
    }
}

impl From<redis::RedisError> for CacheError {
    fn from(err: redis::RedisError) -> Self {
        if err.kind() == redis::ErrorKind::TypeError || err.code() == Some("WRONGTYPE") {
            return CacheError::Data(err.to_string());
        }
        CacheError::Unavailable(err.to_string())
    }
}

pub type CacheResult<T> = Result<T, CacheError>;

/// String-valued key-value store with per-key TTL.
///
/// Implementations must report an unreachable backend as
/// [`CacheError::Unavailable`] or [`CacheError::Timeout`], never as
/// [`CacheError::NotFound`].
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn set(&self, key: &str, value: String, ttl: Duration) -> CacheResult<()>;

    /// Returns [`CacheError::NotFound`] when the key is absent or expired.
    async fn get(&self, key: &str) -> CacheResult<String>;

    /// Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> CacheResult<()>;

    async fn exists(&self, key: &str) -> CacheResult<bool>;

    /// Deletes every key matching a glob pattern (`*`, `?`) and returns how
    /// many were removed.
    async fn delete_pattern(&self, pattern: &str) -> CacheResult<u64>;

    /// Atomically stores `value` only when `key` is absent.
    async fn set_if_absent(&self, key: &str, value: String, ttl: Duration) -> CacheResult<bool>;

    async fn increment(&self, key: &str) -> CacheResult<i64>;

    async fn expire(&self, key: &str, ttl: Duration) -> CacheResult<()>;

    /// Adds `member` to the set at `key` and resets the set's TTL.
    async fn set_add(&self, key: &str, member: &str, ttl: Duration) -> CacheResult<()>;

    async fn set_remove(&self, key: &str, member: &str) -> CacheResult<()>;

    /// Members of the set at `key`; an absent set yields an empty vector.
    async fn set_members(&self, key: &str) -> CacheResult<Vec<String>>;
}

/// JSON helpers layered over [`CacheStore`].
#[async_trait]
pub trait CacheExt: CacheStore {
    async fn set_json<T>(&self, key: &str, value: &T, ttl: Duration) -> CacheResult<()>
    where
        T: Serialize + Sync,
    {
        let encoded = serde_json::to_string(value)?;
        self.set(key, encoded, ttl).await
    }

    async fn get_json<T>(&self, key: &str) -> CacheResult<T>
    where
        T: DeserializeOwned + Send,
    {
        let raw = self.get(key).await?;
        Ok(serde_json::from_str(&raw)?)
    }

    async fn set_json_if_absent<T>(&self, key: &str, value: &T, ttl: Duration) -> CacheResult<bool>
    where
        T: Serialize + Sync,
    {
        let encoded = serde_json::to_string(value)?;
        self.set_if_absent(key, encoded, ttl).await
    }
}

impl<S: CacheStore + ?Sized> CacheExt for S {}

/// Redis rejects a zero expiry, so sub-second TTLs round up to one second.
pub(crate) fn ttl_secs(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}
