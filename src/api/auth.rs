use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};

use crate::api::extract::AppJson;
use crate::api::state::AppState;
use crate::db::Store;
use crate::error::{AppError, Result};

#[derive(Debug, Deserialize)]
pub struct AuthRequest {
    pub username: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
}

/// Issues a bearer token for the given username
async fn issue_token<S: Store + Clone + 'static>(
    State(state): State<AppState<S>>,
    AppJson(request): AppJson<AuthRequest>,
) -> Result<Json<TokenResponse>> {
    let username = request.username.trim();
    if username.is_empty() {
        return Err(AppError::Unauthorized("Username is required".to_string()));
    }

    let access_token = state.auth.issue(username)?;

    tracing::info!(%username, "Access token issued");

    Ok(Json(TokenResponse {
        access_token,
        token_type: "bearer".to_string(),
    }))
}

pub fn router<S: Store + Clone + 'static>() -> Router<AppState<S>> {
    Router::new().route("/auth", post(issue_token::<S>))
}
