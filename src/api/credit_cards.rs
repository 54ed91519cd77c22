use axum::{
    extract::{Path, Query, State},
    middleware,
    routing::get,
    Extension, Json, Router,
};
use chrono::Utc;
use serde::Deserialize;

use crate::api::extract::AppJson;
use crate::api::middleware::auth::{require_auth, Principal};
use crate::api::state::AppState;
use crate::db::{repository::CreditCardRepository, Store};
use crate::error::Result;
use crate::models::CreditCard;
use crate::services::card_schema::{
    CreditCardInput, CreditCardSchema, CreditCardUpdateInput, CreditCardUpdateSchema,
};

const DEFAULT_LIMIT: i64 = 100;

#[derive(Debug, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    DEFAULT_LIMIT
}

fn repository_for(principal: &Principal) -> CreditCardRepository {
    let mut repository = CreditCardRepository::new();
    repository.set_username(principal.username.as_str());
    repository
}

/// Lists stored cards, `skip`/`limit` paginated
async fn list_credit_cards<S: Store + Clone + 'static>(
    State(state): State<AppState<S>>,
    Extension(principal): Extension<Principal>,
    Query(page): Query<Pagination>,
) -> Result<Json<Vec<CreditCard>>> {
    let cards = repository_for(&principal)
        .get_multi(&state.store, page.skip, page.limit)
        .await?;

    Ok(Json(cards))
}

async fn get_credit_card<S: Store + Clone + 'static>(
    State(state): State<AppState<S>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<i64>,
) -> Result<Json<CreditCard>> {
    let card = repository_for(&principal).get(&state.store, id).await?;

    Ok(Json(card))
}

/// Validates, tokenizes and stores a new card
async fn create_credit_card<S: Store + Clone + 'static>(
    State(state): State<AppState<S>>,
    Extension(principal): Extension<Principal>,
    AppJson(input): AppJson<CreditCardInput>,
) -> Result<Json<CreditCard>> {
    let schema = CreditCardSchema::assemble(input, Utc::now().date_naive()).map_err(|e| {
        tracing::info!(error = %e, username = %principal.username, "Rejected credit card");
        e
    })?;

    let card = repository_for(&principal).create(&state.store, schema).await?;

    tracing::info!(card_id = card.id, brand = %card.brand, "Credit card stored");

    Ok(Json(card))
}

/// Changes the holder name. Other fields in the body are ignored.
async fn update_credit_card<S: Store + Clone + 'static>(
    State(state): State<AppState<S>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<i64>,
    AppJson(input): AppJson<CreditCardUpdateInput>,
) -> Result<Json<CreditCard>> {
    let schema = CreditCardUpdateSchema::assemble(input)?;

    let card = repository_for(&principal)
        .update(&state.store, id, schema)
        .await?;

    Ok(Json(card))
}

async fn delete_credit_card<S: Store + Clone + 'static>(
    State(state): State<AppState<S>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<i64>,
) -> Result<Json<CreditCard>> {
    let card = repository_for(&principal).remove(&state.store, id).await?;

    tracing::info!(card_id = card.id, "Credit card deleted");

    Ok(Json(card))
}

pub fn router<S: Store + Clone + 'static>(state: AppState<S>) -> Router<AppState<S>> {
    Router::new()
        .route(
            "/credit-card",
            get(list_credit_cards::<S>).post(create_credit_card::<S>),
        )
        .route(
            "/credit-card/:id",
            get(get_credit_card::<S>)
                .put(update_credit_card::<S>)
                .delete(delete_credit_card::<S>),
        )
        .route_layer(middleware::from_fn_with_state(state, require_auth::<S>))
}
