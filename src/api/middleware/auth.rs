use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};

use crate::api::state::AppState;
use crate::db::Store;
use crate::error::AppError;

/// The authenticated caller, inserted as a request extension
#[derive(Debug, Clone)]
pub struct Principal {
    pub username: String,
}

/// Middleware that requires a valid bearer token.
///
/// On success the token subject is made available to handlers as a
/// [`Principal`] extension.
pub async fn require_auth<S>(
    State(state): State<AppState<S>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError>
where
    S: Store + Clone + 'static,
{
    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()))?;

    let username = state.auth.verify(token).map_err(|e| {
        tracing::debug!(error = %e, "Rejected bearer token");
        AppError::from(e)
    })?;

    request.extensions_mut().insert(Principal { username });

    Ok(next.run(request).await)
}
