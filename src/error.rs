use std::collections::BTreeMap;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::store::StoreError;

/// Field-level validation errors, keyed by payload field name.
pub type FieldErrors = BTreeMap<&'static str, Vec<String>>;

/// Everything a handler can fail with. User-facing messages are Spanish,
/// matching what the storefront renders verbatim.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Datos inválidos")]
    Validation(FieldErrors),
    #[error("{0}")]
    Unauthorized(String),
    #[error("No autorizado")]
    Forbidden,
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn unauthenticated() -> Self {
        ApiError::Unauthorized("No autenticado".into())
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate => ApiError::Conflict("Registro duplicado".into()),
            StoreError::Database(e) => ApiError::Internal(anyhow::Error::new(e)),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<&'a FieldErrors>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, errors) = match &self {
            ApiError::Validation(errors) => (
                StatusCode::BAD_REQUEST,
                "Datos inválidos".to_string(),
                Some(errors),
            ),
            ApiError::Unauthorized(m) => (StatusCode::UNAUTHORIZED, m.clone(), None),
            ApiError::Forbidden => (StatusCode::FORBIDDEN, "No autorizado".to_string(), None),
            ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone(), None),
            ApiError::Conflict(m) => (StatusCode::CONFLICT, m.clone(), None),
            ApiError::Internal(e) => {
                tracing::error!(error = %e, "unhandled error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Error interno del servidor".to_string(),
                    None,
                )
            }
        };
        (
            status,
            Json(ErrorBody {
                message: &message,
                errors,
            }),
        )
            .into_response()
    }
}
