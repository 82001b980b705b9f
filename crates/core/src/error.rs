//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic business/domain failures. Infrastructure
/// concerns (connection loss, serialization) belong to the storage layer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed field-level validation. When `field` is set the HTTP layer
    /// reports it under that key (422), matching request-validation semantics.
    #[error("validation failed: {message}")]
    Validation {
        field: Option<String>,
        message: String,
    },

    /// A stock mutation would drive an inventory record negative.
    ///
    /// Reported as a business-rule violation (400), not a validation error.
    #[error("insufficient stock: requested {requested}, available {available}")]
    InsufficientStock { available: i64, requested: i64 },

    /// A status change that the workflow state machine does not permit.
    #[error("invalid transition: {0}")]
    InvalidTransition(String),

    /// An identifier failed to parse.
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A requested resource was not found.
    #[error("not found")]
    NotFound,

    /// A conflict occurred (e.g. duplicate natural key).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Authorization failure at the domain boundary.
    #[error("unauthorized")]
    Unauthorized,
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            field: None,
            message: msg.into(),
        }
    }

    /// Validation failure attributed to a specific request field.
    pub fn field(field: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Validation {
            field: Some(field.into()),
            message: msg.into(),
        }
    }

    pub fn insufficient_stock(available: i64, requested: i64) -> Self {
        Self::InsufficientStock {
            available,
            requested,
        }
    }

    pub fn invalid_transition(msg: impl Into<String>) -> Self {
        Self::InvalidTransition(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn not_found() -> Self {
        Self::NotFound
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_validation_carries_field_name() {
        let err = DomainError::field("to_store_id", "must differ from from_store_id");
        match err {
            DomainError::Validation { field, .. } => {
                assert_eq!(field.as_deref(), Some("to_store_id"));
            }
            other => panic!("expected Validation, got {other:?}"),
        }
    }

    #[test]
    fn insufficient_stock_message_names_both_quantities() {
        let msg = DomainError::insufficient_stock(10, 25).to_string();
        assert!(msg.contains("requested 25"));
        assert!(msg.contains("available 10"));
    }
}
