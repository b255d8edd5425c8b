use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
    typed_header::TypedHeaderRejection,
};

use crate::{AppState, error::AppError};

/// Runs the gatekeeper and stores the resulting `AuthContext` as a request
/// extension for the handlers behind it.
pub async fn auth_middleware(
    State(state): State<AppState>,
    bearer: Result<TypedHeader<Authorization<Bearer>>, TypedHeaderRejection>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    // A missing or malformed Authorization header counts as no credentials.
    let token = bearer.as_ref().ok().map(|TypedHeader(auth)| auth.token());

    let ctx = state.gatekeeper.authenticate(token).await?;
    req.extensions_mut().insert(ctx);

    Ok(next.run(req).await)
}
