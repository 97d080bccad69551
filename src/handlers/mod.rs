use axum::http::Uri;
use axum::Json;
use serde::Serialize;

use crate::utils::error::AppError;

pub mod accounts;
pub mod events;
pub mod token;
pub mod users;

#[derive(Serialize)]
pub struct HealthPayload {
    status: &'static str,
    service: &'static str,
}

pub async fn health_check() -> Json<HealthPayload> {
    Json(HealthPayload {
        status: "ok",
        service: "sports-events-api",
    })
}

/// Unmatched routes answer with the JSON error body instead of an empty 404.
pub async fn route_not_found(uri: Uri) -> AppError {
    AppError::NotFound(format!("No route for {}", uri.path()))
}
