use axum::{
    extract::{
        Extension, Json, Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::StatusCode,
    response::IntoResponse,
};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    AppState,
    auth::AuthContext,
    error::AppError,
    routes::json_body,
    utils::success_to_api_response,
};

use super::model::{CreateProductRequest, ProductListParams, UpdateProductRequest};

fn product_id(path: Result<Path<Uuid>, PathRejection>) -> Result<Uuid, AppError> {
    path.map(|Path(id)| id)
        .map_err(|_| AppError::Validation("invalid product id".into()))
}

fn list_params(
    query: Result<Query<ProductListParams>, QueryRejection>,
) -> Result<ProductListParams, AppError> {
    query
        .map(|Query(params)| params)
        .map_err(|e| AppError::Validation(e.body_text()))
}

#[derive(Serialize)]
struct Deleted {
    id: Uuid,
}

#[axum::debug_handler]
pub async fn create_product(
    Extension(ctx): Extension<AuthContext>,
    State(state): State<AppState>,
    payload: Result<Json<CreateProductRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let input = json_body(payload)?.into_new_product()?;

    let product = state.products.create(ctx.user_id, input).await?;

    Ok((StatusCode::CREATED, success_to_api_response(product)))
}

#[axum::debug_handler]
pub async fn list_products(
    Extension(ctx): Extension<AuthContext>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let products = state.products.list(ctx.user_id).await?;

    Ok((StatusCode::OK, success_to_api_response(products)))
}

#[axum::debug_handler]
pub async fn products_filtered(
    Extension(ctx): Extension<AuthContext>,
    State(state): State<AppState>,
    query: Result<Query<ProductListParams>, QueryRejection>,
) -> Result<impl IntoResponse, AppError> {
    let query = list_params(query)?.into_query()?;

    let page = state.products.filtered(ctx.user_id, &query).await?;

    Ok((StatusCode::OK, success_to_api_response(page)))
}

#[axum::debug_handler]
pub async fn products_by_cursor(
    Extension(ctx): Extension<AuthContext>,
    State(state): State<AppState>,
    query: Result<Query<ProductListParams>, QueryRejection>,
) -> Result<impl IntoResponse, AppError> {
    let query = list_params(query)?.into_cursor_query()?;

    let page = state.products.cursor(ctx.user_id, &query).await?;

    Ok((StatusCode::OK, success_to_api_response(page)))
}

#[axum::debug_handler]
pub async fn product_stats(
    Extension(ctx): Extension<AuthContext>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let stats = state.products.stats(ctx.user_id).await?;

    Ok((StatusCode::OK, success_to_api_response(stats)))
}

#[axum::debug_handler]
pub async fn get_product(
    Extension(ctx): Extension<AuthContext>,
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<impl IntoResponse, AppError> {
    let id = product_id(path)?;

    let product = state.products.get(ctx.user_id, id).await?;

    Ok((StatusCode::OK, success_to_api_response(product)))
}

#[axum::debug_handler]
pub async fn update_product(
    Extension(ctx): Extension<AuthContext>,
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<UpdateProductRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let id = product_id(path)?;
    let patch = json_body(payload)?.into_patch()?;

    let product = state.products.update(ctx.user_id, id, patch).await?;

    Ok((StatusCode::OK, success_to_api_response(product)))
}

#[axum::debug_handler]
pub async fn delete_product(
    Extension(ctx): Extension<AuthContext>,
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<impl IntoResponse, AppError> {
    let id = product_id(path)?;

    state.products.delete(ctx.user_id, id).await?;

    Ok((StatusCode::OK, success_to_api_response(Deleted { id })))
}
