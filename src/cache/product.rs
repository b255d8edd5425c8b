//! Read-through cache for product listings.
//!
//! Reads degrade to the repository when the store misbehaves; writes and
//! invalidations only log, since the database stays authoritative and a
//! missed invalidation is bounded by the entry TTL.

use std::sync::Arc;
use std::time::Duration;

use serde::{Serialize, de::DeserializeOwned};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::keys;
use super::store::{CacheError, CacheExt, CacheResult, CacheStore};
use crate::models::query::effective_sort;
use crate::models::{ProductCursorQuery, ProductQuery};

pub const PRODUCT_TTL: Duration = Duration::from_secs(30 * 60);
pub const PRODUCT_LIST_TTL: Duration = Duration::from_secs(15 * 60);
pub const PRODUCT_QUERY_TTL: Duration = Duration::from_secs(5 * 60);
pub const PRODUCT_STATS_TTL: Duration = Duration::from_secs(10 * 60);

#[derive(Clone)]
pub struct ProductQueryCache {
    store: Arc<dyn CacheStore>,
}

/// Hex sha256 of the canonical JSON form of a query.
///
/// Queries are fully typed before they get here, so equal queries serialise
/// to identical bytes no matter how the caller assembled them.
fn query_digest<Q: Serialize>(query: &Q) -> CacheResult<String> {
    let canonical = serde_json::to_string(&serde_json::to_value(query)?)?;
    Ok(format!("{:x}", Sha256::digest(canonical.as_bytes())))
}

impl ProductQueryCache {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self { store }
    }

    /// The sort order is hashed in its effective form, so an empty sort and
    /// an explicit default order share one key.
    pub fn build_cache_key(user_id: Uuid, query: &ProductQuery) -> CacheResult<String> {
        let canonical = ProductQuery {
            sort: effective_sort(&query.sort),
            ..query.clone()
        };
        Ok(keys::filtered_products_key(user_id, &query_digest(&canonical)?))
    }

    pub fn build_cursor_cache_key(user_id: Uuid, query: &ProductCursorQuery) -> CacheResult<String> {
        let canonical = ProductCursorQuery {
            sort: effective_sort(&query.sort),
            ..query.clone()
        };
        Ok(keys::cursor_products_key(user_id, &query_digest(&canonical)?))
    }

    /// Cached value for `key`, or `None` on a miss or any store failure.
    pub async fn read<T>(&self, key: &str) -> Option<T>
    where
        T: DeserializeOwned + Send,
    {
        match self.store.get_json::<T>(key).await {
            Ok(value) => {
                tracing::debug!(key, "Cache hit");
                Some(value)
            }
            Err(CacheError::NotFound) => None,
            Err(e) => {
                tracing::warn!(key, error = %e, "Cache read failed, falling back to database");
                None
            }
        }
    }

    pub async fn write<T>(&self, key: &str, value: &T, ttl: Duration)
    where
        T: Serialize + Sync,
    {
        if let Err(e) = self.store.set_json(key, value, ttl).await {
            tracing::warn!(key, error = %e, "Cache write failed");
        }
    }

    /// Drops every listing cached for `user_id`: the plain list, stats, and
    /// all filtered and cursor pages.
    pub async fn invalidate_user_cache(&self, user_id: Uuid) -> CacheResult<()> {
        self.store.delete(&keys::user_products_key(user_id)).await?;
        self.store.delete(&keys::user_stats_key(user_id)).await?;
        let filtered = self
            .store
            .delete_pattern(&keys::filtered_products_pattern(user_id))
            .await?;
        let cursor = self
            .store
            .delete_pattern(&keys::cursor_products_pattern(user_id))
            .await?;

        tracing::debug!(%user_id, filtered, cursor, "Invalidated product cache");
        Ok(())
    }

    pub async fn invalidate_product(&self, user_id: Uuid, product_id: Uuid) -> CacheResult<()> {
        self.store
            .delete(&keys::product_key(user_id, product_id))
            .await
    }

    /// Runs after every mutation. Failures leave stale entries that age out.
    pub async fn invalidate_after_write(&self, user_id: Uuid, product_id: Uuid) {
        if let Err(e) = self.invalidate_product(user_id, product_id).await {
            tracing::warn!(%user_id, %product_id, error = %e, "Failed to drop cached product");
        }
        if let Err(e) = self.invalidate_user_cache(user_id).await {
            tracing::warn!(%user_id, error = %e, "Failed to invalidate product cache");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryStore;
    use crate::models::{Pagination, ProductFilter, SortSpec};

    fn cache() -> (MemoryStore, ProductQueryCache) {
        let store = MemoryStore::new();
        let cache = ProductQueryCache::new(Arc::new(store.clone()));
        (store, cache)
    }

    #[test]
    fn test_cache_key_ignores_construction_order() {
        let user_id = Uuid::new_v4();

        let mut first = ProductQuery::default();
        first.filter.min_price = Some(20.0);
        first.filter.max_price = Some(100.0);
        first.filter = first.filter.with_name(Some("lamp"));

        let second = ProductQuery {
            filter: ProductFilter {
                max_price: Some(100.0),
                min_price: Some(20.0),
                ..ProductFilter::default()
            }
            .with_name(Some("  lamp ")),
            sort: Vec::new(),
            pagination: Pagination::default(),
        };

        assert_eq!(
            ProductQueryCache::build_cache_key(user_id, &first).unwrap(),
            ProductQueryCache::build_cache_key(user_id, &second).unwrap()
        );
    }

    #[test]
    fn test_cache_key_separates_users_and_queries() {
        let query = ProductQuery::default();
        let a = ProductQueryCache::build_cache_key(Uuid::new_v4(), &query).unwrap();
        let b = ProductQueryCache::build_cache_key(Uuid::new_v4(), &query).unwrap();
        assert_ne!(a, b);

        let user_id = Uuid::new_v4();
        let sorted = ProductQuery {
            sort: vec![SortSpec::parse("price", Some("desc")).unwrap()],
            ..ProductQuery::default()
        };
        assert_ne!(
            ProductQueryCache::build_cache_key(user_id, &query).unwrap(),
            ProductQueryCache::build_cache_key(user_id, &sorted).unwrap()
        );
    }

    #[test]
    fn test_default_sort_shares_a_key_with_explicit_default() {
        let user_id = Uuid::new_v4();
        let implicit = ProductQuery::default();
        let explicit = ProductQuery {
            sort: vec![SortSpec::parse("created_at", Some("desc")).unwrap()],
            ..ProductQuery::default()
        };
        assert_eq!(
            ProductQueryCache::build_cache_key(user_id, &implicit).unwrap(),
            ProductQueryCache::build_cache_key(user_id, &explicit).unwrap()
        );

        let cursor = |sort: Vec<SortSpec>| ProductCursorQuery {
            filter: ProductFilter::default(),
            sort,
            pagination: crate::models::CursorPagination::new(None, None).unwrap(),
        };
        assert_eq!(
            ProductQueryCache::build_cursor_cache_key(user_id, &cursor(Vec::new())).unwrap(),
            ProductQueryCache::build_cursor_cache_key(user_id, &cursor(explicit.sort.clone()))
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_invalidation_only_touches_one_user() {
        let (store, cache) = cache();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();

        for user in [alice, bob] {
            let key = ProductQueryCache::build_cache_key(user, &ProductQuery::default()).unwrap();
            cache.write(&key, &1, PRODUCT_QUERY_TTL).await;
            cache.write(&keys::user_stats_key(user), &1, PRODUCT_STATS_TTL).await;
            cache.write(&keys::user_products_key(user), &1, PRODUCT_LIST_TTL).await;
        }

        cache.invalidate_user_cache(alice).await.unwrap();

        let remaining = store.keys().await;
        assert_eq!(remaining.len(), 3);
        assert!(remaining.iter().all(|k| k.contains(&bob.to_string())));
    }

    #[tokio::test]
    async fn test_corrupt_entry_reads_as_miss() {
        let (store, cache) = cache();
        store
            .set("user_stats:x", "not json".into(), PRODUCT_STATS_TTL)
            .await
            .unwrap();

        assert_eq!(cache.read::<Vec<u32>>("user_stats:x").await, None);
    }
}
