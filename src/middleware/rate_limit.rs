use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderMap, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::{
    cache::{CacheStore, keys::rate_limit_key},
    config::Config,
    error::AppError,
};

/// Fixed-window request counter per client IP.
#[derive(Clone)]
pub struct RateLimiter {
    cache: Arc<dyn CacheStore>,
    window: Duration,
    max_requests: u32,
}

/// Client IP from `x-real-ip`, then the first `x-forwarded-for` hop, then
/// the socket peer.
pub fn client_ip(headers: &HeaderMap, remote: Option<SocketAddr>) -> String {
    let remote_ip = remote.map(|addr| addr.ip().to_string());
    headers
        .get("x-real-ip")
        .and_then(|h| h.to_str().ok())
        .or_else(|| {
            headers
                .get("x-forwarded-for")
                .and_then(|h| h.to_str().ok())
                .and_then(|s| s.split(',').find(|ip| !ip.trim().is_empty()))
        })
        .or(remote_ip.as_deref()) // fall back to the socket peer
        .unwrap_or("unknown")
        .trim()
        .to_string()
}

impl RateLimiter {
    pub fn new(cache: Arc<dyn CacheStore>, config: &Config) -> Self {
        Self {
            cache,
            window: config.rate_limit_window(),
            max_requests: config.rate_limit_requests,
        }
    }

    /// Counts one request for `ip`. Cache failures let the request through.
    pub async fn allow(&self, ip: &str) -> bool {
        let key = rate_limit_key(ip);

        // INCR then EXPIRE on the first hit opens the window.
        let count = match self.cache.increment(&key).await {
            Ok(count) => count,
            Err(e) => {
                tracing::warn!(ip, error = %e, "Rate limiter unavailable, allowing request");
                return true;
            }
        };

        if count == 1 {
            if let Err(e) = self.cache.expire(&key, self.window).await {
                tracing::warn!(ip, error = %e, "Failed to set rate limit window");
            }
        }

        count <= i64::from(self.max_requests)
    }
}

pub async fn rate_limit(
    State(limiter): State<Arc<RateLimiter>>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let remote = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0);
    let ip = client_ip(req.headers(), remote);

    if !limiter.allow(&ip).await {
        tracing::debug!(%ip, "Rate limit exceeded");
        return AppError::RateLimited(limiter.window.as_secs()).into_response();
    }

    next.run(req).await
}
