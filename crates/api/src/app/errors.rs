use axum::Json;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use stockpile_core::{DomainError, UserId};
use stockpile_infra::StoreError;

/// Map a storage/domain failure onto the wire.
///
/// Field validation failures come back as 422 with a per-field `errors` map;
/// business-rule violations (insufficient stock, bad transitions, malformed
/// ids) are 400; backend failures are logged with the acting user and
/// reported as an opaque 500.
pub fn store_error_to_response(err: StoreError, user_id: UserId) -> axum::response::Response {
    match err {
        StoreError::Domain(err) => domain_error_to_response(err),
        StoreError::Backend(msg) => {
            tracing::error!(user_id = %user_id, error = %msg, "storage backend failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", "internal error")
        }
    }
}

pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    match err {
        DomainError::Validation {
            field: Some(field),
            message,
        } => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({
                "error": "validation_error",
                "message": message.clone(),
                "errors": { field: [message] },
            })),
        )
            .into_response(),
        DomainError::Validation { field: None, message } => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "validation_error", message)
        }
        DomainError::InsufficientStock { .. } => {
            json_error(StatusCode::BAD_REQUEST, "insufficient_stock", err.to_string())
        }
        DomainError::InvalidTransition(msg) => {
            json_error(StatusCode::BAD_REQUEST, "invalid_transition", msg)
        }
        DomainError::InvalidId(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_id", msg),
        DomainError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "not found"),
        DomainError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        DomainError::Unauthorized => {
            json_error(StatusCode::FORBIDDEN, "forbidden", "unauthorized")
        }
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
