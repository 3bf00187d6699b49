use axum::{
    extract::{FromRef, Path, State},
    http::StatusCode,
    Json,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::auth::dto::PublicUser;
use crate::auth::jwt::{AuthUser, JwtKeys, Seller};
use crate::error::ApiError;
use crate::state::AppState;
use crate::store::{Company, MarketStore, Role, StoreError};

use super::dto::{CompanyDetail, RegisterCompanyRequest, RegisterCompanyResponse};

#[instrument(skip(state, payload))]
pub async fn register_company(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<RegisterCompanyRequest>,
) -> Result<(StatusCode, Json<RegisterCompanyResponse>), ApiError> {
    let fields = payload.validate()?;

    let already_owner = || ApiError::Conflict("Ya tienes una empresa registrada".into());

    if state.store.get_company_by_user_id(user.id).await?.is_some() {
        warn!(user_id = %user.id, "user already owns a company");
        return Err(already_owner());
    }

    // The Postgres unique index on user_id backs this up when two concurrent
    // registrations both pass the check above.
    let company = state
        .store
        .create_company(user.id, fields)
        .await
        .map_err(|e| match e {
            StoreError::Duplicate => already_owner(),
            other => other.into(),
        })?;

    let promoted = state
        .store
        .set_user_role(user.id, Role::Seller)
        .await?
        .ok_or_else(ApiError::unauthenticated)?;

    // Fresh pair so the new role claim is usable immediately.
    let keys = JwtKeys::from_ref(&state);
    let access_token = keys.sign_access(promoted.id, promoted.role)?;
    let refresh_token = keys.sign_refresh(promoted.id, promoted.role)?;

    info!(user_id = %user.id, company_id = %company.id, "company registered");
    Ok((
        StatusCode::CREATED,
        Json(RegisterCompanyResponse {
            company,
            user: PublicUser::from(&promoted),
            access_token,
            refresh_token,
        }),
    ))
}

#[instrument(skip(state))]
pub async fn list_companies(
    State(state): State<AppState>,
) -> Result<Json<Vec<Company>>, ApiError> {
    Ok(Json(state.store.get_all_companies().await?))
}

#[instrument(skip(state))]
pub async fn company_detail(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<CompanyDetail>, ApiError> {
    let mut company = state
        .store
        .get_company_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Empresa no encontrada".into()))?;

    state.store.increment_company_views(company.id).await?;
    let products = state
        .store
        .get_products_by_company_id(company.id)
        .await?;

    // Echo the bumped counter without a second read.
    company.view_count += 1;
    Ok(Json(CompanyDetail { company, products }))
}

#[instrument(skip(state))]
pub async fn my_company(
    State(state): State<AppState>,
    Seller(user): Seller,
) -> Result<Json<Company>, ApiError> {
    let company = state
        .store
        .get_company_by_user_id(user.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("No tienes empresa registrada".into()))?;
    Ok(Json(company))
}
