// Persistence interfaces and their Postgres / in-memory implementations.

pub mod memory;
pub mod repositories;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    Product, ProductCursorPage, ProductCursorQuery, ProductPage, ProductQuery, ProductStats, User,
};

pub use memory::{MemoryProductRepository, MemoryUserRepository};
pub use repositories::{PgProductRepository, PgUserRepository};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("record not found")]
    NotFound,
    #[error("record already exists")]
    Conflict,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type RepoResult<T> = Result<T, RepoError>;

/// Anything stored under a UUID primary key.
pub trait Entity: Clone + Send + Sync + 'static {
    fn id(&self) -> Uuid;
}

impl Entity for User {
    fn id(&self) -> Uuid {
        self.id
    }
}

impl Entity for Product {
    fn id(&self) -> Uuid {
        self.id
    }
}

/// Basic CRUD shared by every entity.
#[async_trait]
pub trait Repository<T: Entity>: Send + Sync {
    async fn create(&self, entity: &T) -> RepoResult<()>;
    async fn get_by_id(&self, id: Uuid) -> RepoResult<T>;
    async fn update(&self, entity: &T) -> RepoResult<()>;
    async fn delete(&self, id: Uuid) -> RepoResult<()>;
}

#[async_trait]
pub trait UserRepository: Repository<User> {
    async fn get_by_email(&self, email: &str) -> RepoResult<User>;
}

#[async_trait]
pub trait ProductRepository: Repository<Product> {
    async fn get_by_user_id(&self, user_id: Uuid) -> RepoResult<Vec<Product>>;

    /// Offset-paginated listing scoped to one owner.
    async fn find_filtered(&self, user_id: Uuid, query: &ProductQuery) -> RepoResult<ProductPage>;

    /// Keyset-paginated listing; fetches one extra row to detect a next page.
    async fn find_with_cursor(
        &self,
        user_id: Uuid,
        query: &ProductCursorQuery,
    ) -> RepoResult<ProductCursorPage>;

    async fn stats(&self, user_id: Uuid) -> RepoResult<ProductStats>;
}
