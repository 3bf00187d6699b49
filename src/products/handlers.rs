use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::json;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::auth::jwt::{AuthUser, Seller};
use crate::error::ApiError;
use crate::state::AppState;
use crate::store::{Company, MarketStore, Product, ProductWithCompany};

use super::dto::{CreateProductRequest, UpdateProductRequest};

fn product_not_found() -> ApiError {
    ApiError::NotFound("Producto no encontrado".into())
}

async fn require_company(state: &AppState, user_id: Uuid) -> Result<Company, ApiError> {
    state
        .store
        .get_company_by_user_id(user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("No tienes empresa registrada".into()))
}

// ── Public catalog ───────────────────────────────────────────

#[instrument(skip(state))]
pub async fn list_products(
    State(state): State<AppState>,
) -> Result<Json<Vec<ProductWithCompany>>, ApiError> {
    Ok(Json(state.store.get_all_products().await?))
}

// ── Company-scoped management (seller role) ──────────────────

#[instrument(skip(state))]
pub async fn my_products(
    State(state): State<AppState>,
    Seller(user): Seller,
) -> Result<Json<Vec<Product>>, ApiError> {
    let company = require_company(&state, user.id).await?;
    Ok(Json(
        state.store.get_products_by_company_id(company.id).await?,
    ))
}

#[instrument(skip(state, payload))]
pub async fn create_my_product(
    State(state): State<AppState>,
    Seller(user): Seller,
    Json(payload): Json<CreateProductRequest>,
) -> Result<(StatusCode, Json<Product>), ApiError> {
    let fields = payload.validate()?;
    let company = require_company(&state, user.id).await?;
    let product = state
        .store
        .create_product(Some(company.id), user.id, fields, true)
        .await?;
    info!(product_id = %product.id, company_id = %company.id, "product created");
    Ok((StatusCode::CREATED, Json(product)))
}

#[instrument(skip(state, payload))]
pub async fn update_my_product(
    State(state): State<AppState>,
    Seller(user): Seller,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateProductRequest>,
) -> Result<Json<Product>, ApiError> {
    let patch = payload.into_patch()?;
    let company = require_company(&state, user.id).await?;
    let updated = state
        .store
        .update_product(id, company.id, patch)
        .await?
        .ok_or_else(product_not_found)?;
    Ok(Json(updated))
}

#[instrument(skip(state))]
pub async fn delete_my_product(
    State(state): State<AppState>,
    Seller(user): Seller,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let company = require_company(&state, user.id).await?;
    if !state.store.delete_product(id, company.id).await? {
        return Err(product_not_found());
    }
    Ok(Json(json!({ "message": "Producto eliminado" })))
}

// ── User-scoped listings (any authenticated caller) ──────────

#[instrument(skip(state, payload))]
pub async fn create_product(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateProductRequest>,
) -> Result<(StatusCode, Json<Product>), ApiError> {
    let fields = payload.validate()?;
    // Verified iff the caller owns a company at creation time.
    let company = state.store.get_company_by_user_id(user.id).await?;
    let is_verified = company.is_some();
    let product = state
        .store
        .create_product(company.map(|c| c.id), user.id, fields, is_verified)
        .await?;
    info!(product_id = %product.id, user_id = %user.id, verified = is_verified, "product created");
    Ok((StatusCode::CREATED, Json(product)))
}

#[instrument(skip(state))]
pub async fn user_products(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<Product>>, ApiError> {
    Ok(Json(state.store.get_products_by_user_id(user.id).await?))
}

#[instrument(skip(state, payload))]
pub async fn update_user_product(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateProductRequest>,
) -> Result<Json<Product>, ApiError> {
    let patch = payload.into_patch()?;
    let updated = state
        .store
        .update_product_by_user(id, user.id, patch)
        .await?
        .ok_or_else(product_not_found)?;
    Ok(Json(updated))
}

#[instrument(skip(state))]
pub async fn delete_user_product(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if !state.store.delete_product_by_user(id, user.id).await? {
        return Err(product_not_found());
    }
    Ok(Json(json!({ "message": "Producto eliminado" })))
}
