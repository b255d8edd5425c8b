//! Key-value store contract with Redis and in-memory backends, plus the
//! product query cache built on top of it.

pub mod keys;
mod memory;
pub mod product;
mod redis_store;
mod store;
#[cfg(test)]
pub(crate) mod unavailable;

pub use memory::MemoryStore;
pub use product::ProductQueryCache;
pub use redis_store::RedisStore;
pub use store::{CacheError, CacheExt, CacheResult, CacheStore};
#[cfg(test)]
pub(crate) use unavailable::UnavailableStore;
