//! In-process repositories with the same query semantics as the Postgres ones.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{Entity, ProductRepository, RepoError, RepoResult, Repository, UserRepository};
use crate::models::query::effective_sort;
use crate::models::{
    Product, ProductCursorPage, ProductCursorQuery, ProductFilter, ProductPage, ProductQuery,
    ProductStats, SortField, SortDirection, SortSpec, User,
};

/// Generic id-keyed table backing the in-memory repositories.
#[derive(Debug)]
struct Table<T> {
    rows: Arc<RwLock<HashMap<Uuid, T>>>,
}

impl<T> Clone for Table<T> {
    fn clone(&self) -> Self {
        Self {
            rows: Arc::clone(&self.rows),
        }
    }
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self {
            rows: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl<T: Entity> Table<T> {
    async fn insert(&self, entity: &T) -> RepoResult<()> {
        let mut rows = self.rows.write().await;
        if rows.contains_key(&entity.id()) {
            return Err(RepoError::Conflict);
        }
        rows.insert(entity.id(), entity.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> RepoResult<T> {
        self.rows
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(RepoError::NotFound)
    }

    async fn replace(&self, entity: &T) -> RepoResult<()> {
        let mut rows = self.rows.write().await;
        match rows.get_mut(&entity.id()) {
            Some(row) => {
                *row = entity.clone();
                Ok(())
            }
            None => Err(RepoError::NotFound),
        }
    }

    async fn remove(&self, id: Uuid) -> RepoResult<()> {
        self.rows
            .write()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or(RepoError::NotFound)
    }

    async fn select(&self, predicate: impl Fn(&T) -> bool) -> Vec<T> {
        self.rows
            .read()
            .await
            .values()
            .filter(|row| predicate(row))
            .cloned()
            .collect()
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryUserRepository {
    table: Table<User>,
}

impl MemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Repository<User> for MemoryUserRepository {
    async fn create(&self, user: &User) -> RepoResult<()> {
        let email_taken = !self
            .table
            .select(|existing| existing.email.eq_ignore_ascii_case(&user.email))
            .await
            .is_empty();
        if email_taken {
            return Err(RepoError::Conflict);
        }
        self.table.insert(user).await
    }

    async fn get_by_id(&self, id: Uuid) -> RepoResult<User> {
        self.table.get(id).await
    }

    async fn update(&self, user: &User) -> RepoResult<()> {
        self.table.replace(user).await
    }

    async fn delete(&self, id: Uuid) -> RepoResult<()> {
        self.table.remove(id).await
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn get_by_email(&self, email: &str) -> RepoResult<User> {
        self.table
            .select(|user| user.email == email)
            .await
            .into_iter()
            .next()
            .ok_or(RepoError::NotFound)
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryProductRepository {
    table: Table<Product>,
}

impl MemoryProductRepository {
    pub fn new() -> Self {
        Self::default()
    }

    async fn owned_matching(&self, user_id: Uuid, filter: &ProductFilter) -> Vec<Product> {
        self.table
            .select(|p| p.user_id == user_id && filter.matches(p))
            .await
    }
}

fn compare_by(field: SortField, a: &Product, b: &Product) -> Ordering {
    match field {
        SortField::Name => a.name.cmp(&b.name),
        SortField::Price => a.price.total_cmp(&b.price),
        SortField::Stock => a.stock.cmp(&b.stock),
        SortField::CreatedAt => a.created_at.cmp(&b.created_at),
        SortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
    }
}

/// Full listing order: the sort fields, then id ascending as the tie-break.
fn listing_order(order: &[SortSpec], a: &Product, b: &Product) -> Ordering {
    order
        .iter()
        .map(|spec| {
            let ordering = compare_by(spec.field, a, b);
            match spec.direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            }
        })
        .find(|ordering| ordering.is_ne())
        .unwrap_or_else(|| a.id.cmp(&b.id))
}

fn sort_products(products: &mut [Product], sort: &[SortSpec]) {
    let order = effective_sort(sort);
    products.sort_by(|a, b| listing_order(&order, a, b));
}

#[async_trait]
impl Repository<Product> for MemoryProductRepository {
    async fn create(&self, product: &Product) -> RepoResult<()> {
        self.table.insert(product).await
    }

    async fn get_by_id(&self, id: Uuid) -> RepoResult<Product> {
        self.table.get(id).await
    }

    async fn update(&self, product: &Product) -> RepoResult<()> {
        self.table.replace(product).await
    }

    async fn delete(&self, id: Uuid) -> RepoResult<()> {
        self.table.remove(id).await
    }
}

#[async_trait]
impl ProductRepository for MemoryProductRepository {
    async fn get_by_user_id(&self, user_id: Uuid) -> RepoResult<Vec<Product>> {
        let mut products = self.table.select(|p| p.user_id == user_id).await;
        sort_products(&mut products, &[]);
        Ok(products)
    }

    async fn find_filtered(&self, user_id: Uuid, query: &ProductQuery) -> RepoResult<ProductPage> {
        let mut products = self.owned_matching(user_id, &query.filter).await;
        let total = products.len() as i64;
        sort_products(&mut products, &query.sort);

        let page: Vec<Product> = products
            .into_iter()
            .skip(query.pagination.offset() as usize)
            .take(query.pagination.page_size as usize)
            .collect();

        Ok(ProductPage::new(page, total, query.pagination))
    }

    async fn find_with_cursor(
        &self,
        user_id: Uuid,
        query: &ProductCursorQuery,
    ) -> RepoResult<ProductCursorPage> {
        let mut products = self.owned_matching(user_id, &query.filter).await;
        if let Some(cursor) = query.pagination.cursor {
            // Keyset: keep rows strictly after the cursor row in listing order.
            // An unknown or foreign cursor yields an empty page.
            let anchor = match self.table.get(cursor).await {
                Ok(row) if row.user_id == user_id => row,
                _ => return Ok(ProductCursorPage::from_rows(Vec::new(), query.pagination)),
            };
            let order = effective_sort(&query.sort);
            products.retain(|p| listing_order(&order, p, &anchor).is_gt());
        }
        sort_products(&mut products, &query.sort);
        products.truncate(query.pagination.page_size as usize + 1);

        Ok(ProductCursorPage::from_rows(products, query.pagination))
    }

    async fn stats(&self, user_id: Uuid) -> RepoResult<ProductStats> {
        let products = self.table.select(|p| p.user_id == user_id).await;
        Ok(ProductStats::from_products(&products))
    }
}
