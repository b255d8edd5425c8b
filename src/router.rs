use std::sync::Arc;

use axum::{
    Router,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
};
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::{
    AppState,
    middleware::{RateLimiter, auth_middleware, log_errors, rate_limit},
    routes,
};

/// Builds the full application: public and protected routes under the
/// configured base path, `/health` at the root, and the shared layers.
pub fn create_router(state: AppState) -> Router {
    // Public routes
    let public_routes = Router::new()
        .route("/auth/register", post(routes::user::register))
        .route("/auth/login", post(routes::user::login));

    // Routes behind the gatekeeper
    let protected_routes = Router::new()
        .route("/auth/refresh", post(routes::user::refresh_token))
        .route("/auth/logout", post(routes::user::logout))
        .route("/auth/logout-all", post(routes::user::logout_all))
        .route("/auth/sessions", get(routes::user::sessions))
        .route(
            "/products",
            post(routes::product::create_product).get(routes::product::list_products),
        )
        .route("/products/filtered", get(routes::product::products_filtered))
        .route("/products/cursor", get(routes::product::products_by_cursor))
        .route("/products/stats", get(routes::product::product_stats))
        .route(
            "/products/{id}",
            get(routes::product::get_product)
                .put(routes::product::update_product)
                .delete(routes::product::delete_product),
        )
        .layer(from_fn_with_state(state.clone(), auth_middleware));

    let api = Router::new().merge(public_routes).merge(protected_routes);
    let base = state.config.api_base_uri.trim_matches('/');
    let router = if base.is_empty() {
        api
    } else {
        Router::new().nest(&format!("/{base}"), api)
    };

    let rate_limiter = Arc::new(RateLimiter::new(Arc::clone(&state.cache), &state.config));
    let router = router
        .route("/health", get(routes::health))
        .layer(from_fn(log_errors))
        .layer(from_fn_with_state(rate_limiter, rate_limit))
        .layer(TimeoutLayer::new(state.config.request_timeout()))
        .layer(TraceLayer::new_for_http());

    // Permissive CORS for local development only
    #[cfg(debug_assertions)]
    let router = router.layer(tower_http::cors::CorsLayer::permissive());

    router.with_state(state)
}
