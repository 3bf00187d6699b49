use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    Json,
};
use serde_json::json;
use tracing::{info, instrument, warn};

use crate::error::ApiError;
use crate::state::AppState;
use crate::store::{MarketStore, NewUser, Role, StoreError};

use super::dto::{AuthResponse, LoginRequest, PublicUser, RefreshRequest, RegisterRequest};
use super::jwt::{AuthUser, JwtKeys};
use super::password::{hash_password, verify_password};

fn token_pair(keys: &JwtKeys, user: &crate::store::User) -> Result<(String, String), ApiError> {
    let access = keys.sign_access(user.id, user.role)?;
    let refresh = keys.sign_refresh(user.id, user.role)?;
    Ok((access, refresh))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(mut payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    payload.email = payload.email.trim().to_lowercase();
    payload.validate()?;

    if state
        .store
        .get_user_by_email(&payload.email)
        .await?
        .is_some()
    {
        warn!(email = %payload.email, "email already registered");
        return Err(ApiError::Conflict("Este email ya está registrado".into()));
    }

    let password_hash = hash_password(&payload.password)?;
    let user = state
        .store
        .create_user(NewUser {
            email: payload.email,
            name: payload.name,
            password_hash,
            role: Role::Buyer,
        })
        .await
        .map_err(|e| match e {
            // check-then-insert race lost against the unique index
            StoreError::Duplicate => ApiError::Conflict("Este email ya está registrado".into()),
            other => other.into(),
        })?;

    let keys = JwtKeys::from_ref(&state);
    let (access_token, refresh_token) = token_pair(&keys, &user)?;

    info!(user_id = %user.id, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            access_token,
            refresh_token,
            user: PublicUser::from(&user),
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(mut payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    payload.email = payload.email.trim().to_lowercase();
    payload.validate()?;

    let invalid = || ApiError::Unauthorized("Email o contraseña incorrectos".into());

    let user = state
        .store
        .get_user_by_email(&payload.email)
        .await?
        .ok_or_else(invalid)?;

    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(user_id = %user.id, "login with invalid password");
        return Err(invalid());
    }

    let keys = JwtKeys::from_ref(&state);
    let (access_token, refresh_token) = token_pair(&keys, &user)?;

    info!(user_id = %user.id, "user logged in");
    Ok(Json(AuthResponse {
        access_token,
        refresh_token,
        user: PublicUser::from(&user),
    }))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let keys = JwtKeys::from_ref(&state);
    let claims = keys
        .verify_refresh(&payload.refresh_token)
        .map_err(|_| ApiError::unauthenticated())?;

    // Re-read the user so a role change since issuance lands in the new pair.
    let user = state
        .store
        .get_user_by_id(claims.sub)
        .await?
        .ok_or_else(ApiError::unauthenticated)?;

    let (access_token, refresh_token) = token_pair(&keys, &user)?;
    Ok(Json(AuthResponse {
        access_token,
        refresh_token,
        user: PublicUser::from(&user),
    }))
}

/// Tokens are stateless; the endpoint exists so the storefront's logout flow
/// keeps getting its acknowledgment.
#[instrument]
pub async fn logout(_user: AuthUser) -> Json<serde_json::Value> {
    Json(json!({ "message": "Sesión cerrada" }))
}

#[instrument(skip(state))]
pub async fn current_user(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<PublicUser>, ApiError> {
    let user = state
        .store
        .get_user_by_id(user.id)
        .await?
        .ok_or_else(ApiError::unauthenticated)?;
    Ok(Json(PublicUser::from(&user)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MarketStore;

    fn register_body(email: &str) -> RegisterRequest {
        RegisterRequest {
            email: email.into(),
            name: "Ana".into(),
            password: "supersecreta".into(),
        }
    }

    #[tokio::test]
    async fn register_creates_buyer_and_returns_tokens() {
        let state = AppState::in_memory();
        let (status, Json(response)) = register(
            State(state.clone()),
            Json(register_body("Ana@Example.com ")),
        )
        .await
        .expect("register should succeed");

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(response.user.email, "ana@example.com");
        assert_eq!(response.user.role, Role::Buyer);
        assert!(!response.access_token.is_empty());

        let stored = state
            .store
            .get_user_by_email("ana@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_ne!(stored.password_hash, "supersecreta");
    }

    #[tokio::test]
    async fn duplicate_email_conflicts() {
        let state = AppState::in_memory();
        register(State(state.clone()), Json(register_body("ana@example.com")))
            .await
            .unwrap();
        let err = register(State(state), Json(register_body("ana@example.com")))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
    }

    #[tokio::test]
    async fn login_rejects_wrong_password_and_unknown_email_alike() {
        let state = AppState::in_memory();
        register(State(state.clone()), Json(register_body("ana@example.com")))
            .await
            .unwrap();

        let wrong = login(
            State(state.clone()),
            Json(LoginRequest {
                email: "ana@example.com".into(),
                password: "incorrecta!".into(),
            }),
        )
        .await
        .unwrap_err();
        let unknown = login(
            State(state),
            Json(LoginRequest {
                email: "nadie@example.com".into(),
                password: "supersecreta".into(),
            }),
        )
        .await
        .unwrap_err();

        for err in [wrong, unknown] {
            match err {
                ApiError::Unauthorized(message) => {
                    assert_eq!(message, "Email o contraseña incorrectos")
                }
                other => panic!("expected 401, got {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn login_succeeds_with_correct_credentials() {
        let state = AppState::in_memory();
        register(State(state.clone()), Json(register_body("ana@example.com")))
            .await
            .unwrap();
        let Json(response) = login(
            State(state),
            Json(LoginRequest {
                email: "ana@example.com".into(),
                password: "supersecreta".into(),
            }),
        )
        .await
        .expect("login should succeed");
        assert_eq!(response.user.email, "ana@example.com");
    }

    #[tokio::test]
    async fn refresh_rotates_the_pair() {
        let state = AppState::in_memory();
        let (_, Json(initial)) =
            register(State(state.clone()), Json(register_body("ana@example.com")))
                .await
                .unwrap();
        let Json(refreshed) = refresh(
            State(state),
            Json(RefreshRequest {
                refresh_token: initial.refresh_token,
            }),
        )
        .await
        .expect("refresh should succeed");
        assert_eq!(refreshed.user.email, "ana@example.com");
        assert!(!refreshed.access_token.is_empty());
    }

    #[tokio::test]
    async fn refresh_rejects_access_token() {
        let state = AppState::in_memory();
        let (_, Json(initial)) =
            register(State(state.clone()), Json(register_body("ana@example.com")))
                .await
                .unwrap();
        let err = refresh(
            State(state),
            Json(RefreshRequest {
                refresh_token: initial.access_token,
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(_)));
    }
}
