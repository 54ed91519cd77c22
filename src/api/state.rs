use std::sync::Arc;

use crate::db::Store;
use crate::services::auth_token::JwtAuth;

/// Shared application state handed to every handler.
///
/// Generic over the store so the same router serves Postgres in production
/// and the in-memory store in tests.
#[derive(Clone)]
pub struct AppState<S> {
    pub store: S,
    pub auth: Arc<JwtAuth>,
}

impl<S: Store + Clone> AppState<S> {
    pub fn new(store: S, auth: JwtAuth) -> Self {
        Self {
            store,
            auth: Arc::new(auth),
        }
    }
}
