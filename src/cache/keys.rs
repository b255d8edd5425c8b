//! Cache key layout. Every key the service writes is built here.

use uuid::Uuid;

/// Session record: `session:{session_id}`.
pub fn session_key(session_id: &str) -> String {
    format!("session:{}", session_id)
}

/// Set of session ids held by a user.
pub fn user_sessions_key(user_id: Uuid) -> String {
    format!("user_sessions:{}", user_id)
}

/// Revoked token, keyed by the token digest rather than the token.
pub fn token_blacklist_key(token_digest: &str) -> String {
    format!("blacklist:{}", token_digest)
}

/// Session revoked through logout-all.
pub fn user_blacklist_key(user_id: Uuid, session_id: &str) -> String {
    format!("user_blacklist:{}:{}", user_id, session_id)
}

pub fn product_key(user_id: Uuid, product_id: Uuid) -> String {
    format!("product:{}:{}", user_id, product_id)
}

pub fn user_products_key(user_id: Uuid) -> String {
    format!("user_products:{}", user_id)
}

pub fn user_stats_key(user_id: Uuid) -> String {
    format!("user_stats:{}", user_id)
}

pub fn filtered_products_key(user_id: Uuid, query_digest: &str) -> String {
    format!("user_products_filtered:{}:{}", user_id, query_digest)
}

pub fn filtered_products_pattern(user_id: Uuid) -> String {
    format!("user_products_filtered:{}:*", user_id)
}

pub fn cursor_products_key(user_id: Uuid, query_digest: &str) -> String {
    format!("user_products_cursor:{}:{}", user_id, query_digest)
}

pub fn cursor_products_pattern(user_id: Uuid) -> String {
    format!("user_products_cursor:{}:*", user_id)
}

pub fn rate_limit_key(client_ip: &str) -> String {
    format!("rate_limit:{}", client_ip)
}
