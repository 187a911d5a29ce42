//! Terminal handlers for requests nothing else claimed.

use crate::errors::AppError;
use axum::http::StatusCode;

/// Uniform `404 {"error":"Not found"}`; mounted last so it never shadows a
/// real route.
pub async fn not_found() -> AppError {
    AppError::not_found()
}

/// Answers every path under a route group no handler set was supplied for.
pub async fn not_implemented() -> AppError {
    AppError::new(StatusCode::NOT_IMPLEMENTED, "Not implemented")
}
