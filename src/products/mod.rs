use axum::{
    routing::{get, put},
    Router,
};

use crate::state::AppState;

pub mod dto;
pub mod handlers;

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/products",
            get(handlers::list_products).post(handlers::create_product),
        )
        .route(
            "/my/products",
            get(handlers::my_products).post(handlers::create_my_product),
        )
        .route(
            "/my/products/:id",
            put(handlers::update_my_product).delete(handlers::delete_my_product),
        )
        .route("/user/products", get(handlers::user_products))
        .route(
            "/user/products/:id",
            put(handlers::update_user_product).delete(handlers::delete_user_product),
        )
}
