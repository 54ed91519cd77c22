// API module - HTTP endpoints

use axum::Router;
use tower_http::trace::TraceLayer;

use crate::db::Store;

pub mod auth;
pub mod credit_cards;
pub mod extract;
pub mod health;
pub mod middleware;
pub mod state;

pub use state::AppState;

/// Builds the full `/api/v1` application for the given state
pub fn app<S: Store + Clone + 'static>(state: AppState<S>) -> Router {
    let v1 = Router::<AppState<S>>::new()
        .merge(health::router::<S>())
        .merge(auth::router::<S>())
        .merge(credit_cards::router(state.clone()));

    Router::new()
        .nest("/api/v1", v1)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
