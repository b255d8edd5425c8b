pub mod product;
pub mod user;

use std::convert::Infallible;
use std::net::SocketAddr;

use axum::{
    Json,
    extract::{ConnectInfo, FromRequestParts, rejection::JsonRejection},
    http::{header::USER_AGENT, request::Parts},
    response::IntoResponse,
};
use serde_json::json;

use crate::{auth::ClientInfo, error::AppError, middleware::client_ip};

/// Unwraps a JSON body, turning a malformed one into a 400.
pub(crate) fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    payload
        .map(|Json(value)| value)
        .map_err(|e| AppError::Validation(e.body_text()))
}

impl<S: Send + Sync> FromRequestParts<S> for ClientInfo {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let remote = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ci| ci.0);
        let user_agent = parts
            .headers
            .get(USER_AGENT)
            .and_then(|h| h.to_str().ok())
            .unwrap_or("unknown")
            .to_string();

        Ok(ClientInfo {
            ip_address: client_ip(&parts.headers, remote),
            user_agent,
        })
    }
}

pub async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "message": "Product catalog API is running",
    }))
}
