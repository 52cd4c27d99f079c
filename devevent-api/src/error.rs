use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use devevent_core::DomainError;

/// Wire-side wrapper for the domain taxonomy. Every member maps to its own
/// status code; the payload keeps field-level detail for validation failures
/// and names the violated constraint for integrity failures.
#[derive(Debug)]
pub struct AppError(pub DomainError);

impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        Self(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match &self.0 {
            DomainError::Validation(fields) => (
                StatusCode::BAD_REQUEST,
                json!({
                    "error": "Validation failed",
                    "fields": fields,
                }),
            ),
            DomainError::DuplicateSlug { slug } => (
                StatusCode::CONFLICT,
                json!({
                    "error": format!("An event with slug '{}' already exists", slug),
                    "constraint": "unique_slug",
                }),
            ),
            DomainError::DanglingReference { event_id } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                json!({
                    "error": format!("Referenced event {} does not exist", event_id),
                    "constraint": "event_exists",
                }),
            ),
            DomainError::NotFound(what) => (
                StatusCode::NOT_FOUND,
                json!({
                    "error": format!("{} not found", what),
                }),
            ),
            DomainError::Upstream { service, detail } => {
                tracing::error!("Upstream failure in {}: {}", service, detail);
                (
                    StatusCode::BAD_GATEWAY,
                    json!({
                        "error": format!("{} is currently unavailable", service),
                    }),
                )
            }
            DomainError::Unexpected(detail) => {
                tracing::error!("Internal Server Error: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({
                        "error": "Internal Server Error",
                    }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}
