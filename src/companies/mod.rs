use axum::{
    routing::{get, post},
    Router,
};

use crate::state::AppState;

pub mod dto;
pub mod handlers;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register-company", post(handlers::register_company))
        .route("/companies", get(handlers::list_companies))
        .route("/companies/:id", get(handlers::company_detail))
        .route("/my/company", get(handlers::my_company))
}
