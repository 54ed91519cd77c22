use axum::extract::FromRequest;

use crate::error::AppError;

/// `Json` whose rejections (missing content type, bad syntax, wrong field
/// types) come back as `AppError` bodies.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);
