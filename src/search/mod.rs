use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use tracing::instrument;

use crate::error::ApiError;
use crate::state::AppState;
use crate::store::{MarketStore, SearchResults};

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/search", get(search))
}

#[instrument(skip(state))]
pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResults>, ApiError> {
    // Below two characters the API answers empty without touching storage.
    if params.q.chars().count() < 2 {
        return Ok(Json(SearchResults::default()));
    }
    Ok(Json(state.store.search_global(&params.q).await?))
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::store::{MarketStore, NewProduct};

    async fn seed_product(state: &AppState, name: &str) {
        state
            .store
            .create_product(
                None,
                Uuid::new_v4(),
                NewProduct {
                    name: name.into(),
                    description: None,
                    price: None,
                    category: None,
                    images: vec![],
                },
                false,
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn short_query_short_circuits_even_with_matches() {
        let state = AppState::in_memory();
        seed_product(&state, "xylophone").await;

        let Json(results) = search(
            State(state),
            Query(SearchParams { q: "x".into() }),
        )
        .await
        .unwrap();
        assert!(results.companies.is_empty());
        assert!(results.products.is_empty());
    }

    #[tokio::test]
    async fn two_character_query_reaches_storage() {
        let state = AppState::in_memory();
        seed_product(&state, "xylophone").await;

        let Json(results) = search(
            State(state),
            Query(SearchParams { q: "xy".into() }),
        )
        .await
        .unwrap();
        assert_eq!(results.products.len(), 1);
    }

    #[tokio::test]
    async fn two_character_query_with_no_matches_is_empty() {
        let state = AppState::in_memory();
        seed_product(&state, "Reloj").await;

        let Json(results) = search(
            State(state),
            Query(SearchParams { q: "zz".into() }),
        )
        .await
        .unwrap();
        assert!(results.companies.is_empty());
        assert!(results.products.is_empty());
    }

    #[tokio::test]
    async fn missing_query_defaults_to_empty() {
        let state = AppState::in_memory();
        let Json(results) = search(
            State(state),
            Query(SearchParams { q: String::new() }),
        )
        .await
        .unwrap();
        assert!(results.companies.is_empty());
        assert!(results.products.is_empty());
    }
}
