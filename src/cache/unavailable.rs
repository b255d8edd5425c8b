//! A store whose backend never answers, for exercising outage handling.

use std::time::Duration;

use async_trait::async_trait;

use super::store::{CacheError, CacheResult, CacheStore};

const OP_TIMEOUT: Duration = Duration::from_secs(3);

/// Every operation fails with [`CacheError::Timeout`], as `RedisStore` does
/// when the server stops responding.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableStore;

fn timed_out<T>() -> CacheResult<T> {
    Err(CacheError::Timeout(OP_TIMEOUT))
}

#[async_trait]
impl CacheStore for UnavailableStore {
    async fn set(&self, _key: &str, _value: String, _ttl: Duration) -> CacheResult<()> {
        timed_out()
    }

    async fn get(&self, _key: &str) -> CacheResult<String> {
        timed_out()
    }

    async fn delete(&self, _key: &str) -> CacheResult<()> {
        timed_out()
    }

    async fn exists(&self, _key: &str) -> CacheResult<bool> {
        timed_out()
    }

    async fn delete_pattern(&self, _pattern: &str) -> CacheResult<u64> {
        timed_out()
    }

    async fn set_if_absent(&self, _key: &str, _value: String, _ttl: Duration) -> CacheResult<bool> {
        timed_out()
    }

    async fn increment(&self, _key: &str) -> CacheResult<i64> {
        timed_out()
    }

    async fn expire(&self, _key: &str, _ttl: Duration) -> CacheResult<()> {
        timed_out()
    }

    async fn set_add(&self, _key: &str, _member: &str, _ttl: Duration) -> CacheResult<()> {
        timed_out()
    }

    async fn set_remove(&self, _key: &str, _member: &str) -> CacheResult<()> {
        timed_out()
    }

    async fn set_members(&self, _key: &str) -> CacheResult<Vec<String>> {
        timed_out()
    }
}
