mod common;

use axum::http::{Method, StatusCode};
use serde_json::json;

use common::{PASSWORD, TestApp, test_config};

#[tokio::test]
async fn test_health_is_public() {
    let app = TestApp::new();
    let (status, body) = app.request(Method::GET, "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_register_hides_password_hash() {
    let app = TestApp::new();
    let user = app.register("a@x.com").await;

    assert_eq!(user["email"], "a@x.com");
    assert!(user.get("password_hash").is_none());
}

#[tokio::test]
async fn test_register_rejects_bad_input_and_duplicates() {
    let app = TestApp::new();
    app.register("a@x.com").await;

    let (status, body) = app
        .request(
            Method::POST,
            "/api/v1/auth/register",
            None,
            Some(json!({ "email": "a@x.com", "password": PASSWORD, "name": "Again" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 400);

    let (status, _) = app
        .request(
            Method::POST,
            "/api/v1/auth/register",
            None,
            Some(json!({ "email": "b@x.com", "password": "weak", "name": "Bob" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .request(
            Method::POST,
            "/api/v1/auth/register",
            None,
            Some(json!({ "email": "b@x.com" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_wrong_password_is_unauthorized() {
    let app = TestApp::new();
    app.register("a@x.com").await;

    let (status, body) = app
        .request(
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({ "email": "a@x.com", "password": "Bb2@bbbb" })),
        )
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], 401);
}

#[tokio::test]
async fn test_protected_routes_need_a_bearer_token() {
    let app = TestApp::new();

    let (status, _) = app.request(Method::GET, "/api/v1/auth/sessions", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .request(Method::GET, "/api/v1/products", Some("not.a.jwt"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_revokes_the_access_token() {
    let app = TestApp::new();
    app.register("a@x.com").await;
    let (access, _) = app.login("a@x.com").await;

    let (status, _) = app
        .request(Method::GET, "/api/v1/products", Some(&access), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .request(Method::POST, "/api/v1/auth/logout", Some(&access), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .request(Method::GET, "/api/v1/products", Some(&access), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error_message"], "authentication required");
}

#[tokio::test]
async fn test_logout_all_revokes_every_device() {
    let app = TestApp::new();
    app.register("a@x.com").await;
    let (laptop, _) = app.login("a@x.com").await;
    let (phone, _) = app.login("a@x.com").await;

    let (status, body) = app
        .request(Method::GET, "/api/v1/auth/sessions", Some(&laptop), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["resp_data"]["total_sessions"], 2);

    let (status, _) = app
        .request(Method::POST, "/api/v1/auth/logout-all", Some(&phone), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    for token in [&laptop, &phone] {
        let (status, _) = app
            .request(Method::GET, "/api/v1/products", Some(token), None)
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}

#[tokio::test]
async fn test_refresh_returns_a_usable_pair() {
    let app = TestApp::new();
    app.register("a@x.com").await;
    let (access, refresh) = app.login("a@x.com").await;

    let (status, body) = app
        .request(
            Method::POST,
            "/api/v1/auth/refresh",
            Some(&access),
            Some(json!({ "refresh_token": refresh })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["resp_data"]["expires_in"], 3600);

    let new_access = body["resp_data"]["access_token"].as_str().unwrap();
    let (status, _) = app
        .request(Method::GET, "/api/v1/products", Some(new_access), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    // A refresh token is not a bearer credential.
    let (status, _) = app
        .request(Method::GET, "/api/v1/products", Some(&refresh), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_raw_tokens_never_reach_the_cache() {
    let app = TestApp::new();
    app.register("a@x.com").await;
    let (access, _) = app.login("a@x.com").await;
    app.request(Method::POST, "/api/v1/auth/logout", Some(&access), None)
        .await;

    let keys = app.cache.keys().await;
    assert!(keys.iter().any(|k| k.starts_with("blacklist:")));
    assert!(keys.iter().all(|k| !k.contains(&access)));
}

#[tokio::test]
async fn test_rate_limit_returns_429() {
    let mut config = test_config();
    config.rate_limit_requests = 2;
    let app = TestApp::with_config(config);

    for _ in 0..2 {
        let (status, _) = app.request(Method::GET, "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
    }
    let (status, body) = app.request(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["code"], 429);
}
