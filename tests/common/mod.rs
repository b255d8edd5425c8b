#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
};
use catalog::{
    AppState,
    cache::MemoryStore,
    config::Config,
    database::{MemoryProductRepository, MemoryUserRepository},
    router::create_router,
};
use serde_json::Value;
use tower::ServiceExt;

pub const PASSWORD: &str = "Aa1!aaaa";

pub fn test_config() -> Config {
    Config {
        database_url: "postgres://unused".into(),
        redis_url: "redis://unused".into(),
        jwt_secret: "integration-secret".into(),
        server_host: "127.0.0.1".into(),
        server_port: 0,
        api_base_uri: "/api/v1".into(),
        session_duration_hours: 24,
        cache_timeout_ms: 3000,
        request_timeout_secs: 30,
        rate_limit_window_secs: 60,
        rate_limit_requests: 1000,
        bcrypt_cost: 4,
        run_migrations: false,
    }
}

pub struct TestApp {
    pub router: Router,
    pub cache: MemoryStore,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: Config) -> Self {
        let cache = MemoryStore::new();
        let state = AppState::new(
            config,
            Arc::new(cache.clone()),
            Arc::new(MemoryUserRepository::new()),
            Arc::new(MemoryProductRepository::new()),
        );
        Self {
            router: create_router(state),
            cache,
        }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    pub async fn register(&self, email: &str) -> Value {
        let (status, body) = self
            .request(
                Method::POST,
                "/api/v1/auth/register",
                None,
                Some(serde_json::json!({
                    "email": email,
                    "password": PASSWORD,
                    "name": "Test User",
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {body}");
        body["resp_data"].clone()
    }

    /// Logs in and returns `(access_token, refresh_token)`.
    pub async fn login(&self, email: &str) -> (String, String) {
        let (status, body) = self
            .request(
                Method::POST,
                "/api/v1/auth/login",
                None,
                Some(serde_json::json!({ "email": email, "password": PASSWORD })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {body}");
        (
            body["resp_data"]["access_token"].as_str().unwrap().to_string(),
            body["resp_data"]["refresh_token"].as_str().unwrap().to_string(),
        )
    }
}
