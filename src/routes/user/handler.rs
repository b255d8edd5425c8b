use axum::{
    extract::{Extension, Json, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};

use crate::{
    AppState,
    auth::{AuthContext, ClientInfo},
    error::AppError,
    routes::json_body,
    utils::success_to_api_response,
};

use super::model::{LoginRequest, MessageResponse, RefreshTokenRequest, RegisterRequest};

#[axum::debug_handler]
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let req = json_body(payload)?.sanitize_and_validate()?;

    let user = state
        .auth
        .register(&req.email, &req.password, &req.name)
        .await?;

    Ok((StatusCode::CREATED, success_to_api_response(user)))
}

#[axum::debug_handler]
pub async fn login(
    State(state): State<AppState>,
    client: ClientInfo,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let req = json_body(payload)?.sanitize_and_validate()?;

    let response = state.auth.login(&req.email, &req.password, &client).await?;

    Ok((StatusCode::OK, success_to_api_response(response)))
}

#[axum::debug_handler]
pub async fn refresh_token(
    Extension(ctx): Extension<AuthContext>,
    State(state): State<AppState>,
    payload: Result<Json<RefreshTokenRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let req = json_body(payload)?;
    if req.refresh_token.trim().is_empty() {
        return Err(AppError::Validation("refresh_token is required".into()));
    }

    let response = state.auth.refresh(&ctx, req.refresh_token.trim()).await?;

    Ok((StatusCode::OK, success_to_api_response(response)))
}

#[axum::debug_handler]
pub async fn logout(
    Extension(ctx): Extension<AuthContext>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    state.auth.logout(&ctx).await?;

    Ok((
        StatusCode::OK,
        success_to_api_response(MessageResponse {
            message: "Logged out successfully",
        }),
    ))
}

#[axum::debug_handler]
pub async fn logout_all(
    Extension(ctx): Extension<AuthContext>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    state.auth.logout_all(ctx.user_id).await?;

    Ok((
        StatusCode::OK,
        success_to_api_response(MessageResponse {
            message: "Logged out from all devices successfully",
        }),
    ))
}

#[axum::debug_handler]
pub async fn sessions(
    Extension(ctx): Extension<AuthContext>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let sessions = state.auth.sessions(&ctx).await?;

    Ok((StatusCode::OK, success_to_api_response(sessions)))
}
