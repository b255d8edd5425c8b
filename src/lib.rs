use std::sync::Arc;

use auth::{AuthService, Blacklist, Gatekeeper, SessionManager, TokenService};
use cache::{CacheStore, ProductQueryCache};
use config::Config;
use database::{ProductRepository, UserRepository};
use services::ProductService;

pub mod auth;
pub mod cache;
pub mod config;
pub mod database;
pub mod error;
pub mod middleware;
pub mod models;
pub mod router;
pub mod routes;
pub mod services;
pub mod utils;
pub mod validation;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub cache: Arc<dyn CacheStore>,
    pub auth: AuthService,
    pub gatekeeper: Gatekeeper,
    pub products: ProductService,
}

impl AppState {
    /// Wires every service around one shared cache handle.
    pub fn new(
        config: Config,
        cache: Arc<dyn CacheStore>,
        users: Arc<dyn UserRepository>,
        products: Arc<dyn ProductRepository>,
    ) -> Self {
        let tokens = TokenService::new(&config.jwt_secret);
        let sessions = SessionManager::new(Arc::clone(&cache));
        let blacklist = Blacklist::new(Arc::clone(&cache), sessions.clone());

        let auth = AuthService::new(
            users,
            sessions.clone(),
            tokens.clone(),
            blacklist.clone(),
            config.session_duration(),
            config.bcrypt_cost,
        );
        let gatekeeper = Gatekeeper::new(tokens, sessions, blacklist);
        let products = ProductService::new(products, ProductQueryCache::new(Arc::clone(&cache)));

        Self {
            config,
            cache,
            auth,
            gatekeeper,
            products,
        }
    }
}
