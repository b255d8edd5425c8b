use std::sync::Arc;

use thiserror::Error;
use uuid::Uuid;

use crate::cache::keys::{product_key, user_products_key, user_stats_key};
use crate::cache::product::{PRODUCT_LIST_TTL, PRODUCT_QUERY_TTL, PRODUCT_STATS_TTL, PRODUCT_TTL};
use crate::cache::{CacheError, ProductQueryCache};
use crate::database::{ProductRepository, RepoError};
use crate::models::{
    NewProduct, Product, ProductCursorPage, ProductCursorQuery, ProductPage, ProductPatch,
    ProductQuery, ProductStats,
};

#[derive(Debug, Error)]
pub enum ProductError {
    /// Absent, or owned by someone else.
    #[error("product not found")]
    NotFound,
    #[error(transparent)]
    Repo(RepoError),
    #[error(transparent)]
    Cache(#[from] CacheError),
}

impl From<RepoError> for ProductError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound => ProductError::NotFound,
            other => ProductError::Repo(other),
        }
    }
}

/// Product use cases, every one scoped to the calling user.
#[derive(Clone)]
pub struct ProductService {
    repo: Arc<dyn ProductRepository>,
    cache: ProductQueryCache,
}

impl ProductService {
    pub fn new(repo: Arc<dyn ProductRepository>, cache: ProductQueryCache) -> Self {
        Self { repo, cache }
    }

    pub async fn create(&self, user_id: Uuid, input: NewProduct) -> Result<Product, ProductError> {
        let product = Product::new(user_id, input);
        self.repo.create(&product).await?;
        self.cache.invalidate_after_write(user_id, product.id).await;

        tracing::info!(%user_id, product_id = %product.id, "Created product");
        Ok(product)
    }

    pub async fn get(&self, user_id: Uuid, product_id: Uuid) -> Result<Product, ProductError> {
        let key = product_key(user_id, product_id);
        if let Some(product) = self.cache.read::<Product>(&key).await {
            if product.user_id == user_id {
                return Ok(product);
            }
        }

        let product = self.owned(user_id, product_id).await?;
        self.cache.write(&key, &product, PRODUCT_TTL).await;
        Ok(product)
    }

    pub async fn list(&self, user_id: Uuid) -> Result<Vec<Product>, ProductError> {
        let key = user_products_key(user_id);
        if let Some(products) = self.cache.read(&key).await {
            return Ok(products);
        }

        let products = self.repo.get_by_user_id(user_id).await?;
        self.cache.write(&key, &products, PRODUCT_LIST_TTL).await;
        Ok(products)
    }

    pub async fn filtered(
        &self,
        user_id: Uuid,
        query: &ProductQuery,
    ) -> Result<ProductPage, ProductError> {
        let key = ProductQueryCache::build_cache_key(user_id, query)?;
        if let Some(page) = self.cache.read(&key).await {
            return Ok(page);
        }

        let page = self.repo.find_filtered(user_id, query).await?;
        self.cache.write(&key, &page, PRODUCT_QUERY_TTL).await;
        Ok(page)
    }

    pub async fn cursor(
        &self,
        user_id: Uuid,
        query: &ProductCursorQuery,
    ) -> Result<ProductCursorPage, ProductError> {
        let key = ProductQueryCache::build_cursor_cache_key(user_id, query)?;
        if let Some(page) = self.cache.read(&key).await {
            return Ok(page);
        }

        let page = self.repo.find_with_cursor(user_id, query).await?;
        self.cache.write(&key, &page, PRODUCT_QUERY_TTL).await;
        Ok(page)
    }

    pub async fn stats(&self, user_id: Uuid) -> Result<ProductStats, ProductError> {
        let key = user_stats_key(user_id);
        if let Some(stats) = self.cache.read(&key).await {
            return Ok(stats);
        }

        let stats = self.repo.stats(user_id).await?;
        self.cache.write(&key, &stats, PRODUCT_STATS_TTL).await;
        Ok(stats)
    }

    pub async fn update(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        patch: ProductPatch,
    ) -> Result<Product, ProductError> {
        let mut product = self.owned(user_id, product_id).await?;
        product.apply(patch);
        self.repo.update(&product).await?;
        self.cache.invalidate_after_write(user_id, product_id).await;

        tracing::info!(%user_id, %product_id, "Updated product");
        Ok(product)
    }

    pub async fn delete(&self, user_id: Uuid, product_id: Uuid) -> Result<(), ProductError> {
        self.owned(user_id, product_id).await?;
        self.repo.delete(product_id).await?;
        self.cache.invalidate_after_write(user_id, product_id).await;

        tracing::info!(%user_id, %product_id, "Deleted product");
        Ok(())
    }

    /// Loads from the database; a product owned by another user is reported
    /// as missing.
    async fn owned(&self, user_id: Uuid, product_id: Uuid) -> Result<Product, ProductError> {
        let product = self.repo.get_by_id(product_id).await?;
        if product.user_id != user_id {
            return Err(ProductError::NotFound);
        }
        Ok(product)
    }
}
