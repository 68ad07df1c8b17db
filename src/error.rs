use thiserror::Error;

use crate::schema::DataType;

/// Main error type for QueryGate operations
#[derive(Error, Debug)]
pub enum QueryGateError {
    #[error("Field not found: '{field}' is not reachable from entity '{entity}'")]
    FieldNotFound { field: String, entity: String },

    #[error("Type mismatch on '{field}': cannot coerce {value} to {expected}")]
    TypeMismatch {
        field: String,
        expected: DataType,
        value: String,
    },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Search backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Entity not found: {0}")]
    EntityNotFound(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for QueryGate operations
pub type Result<T> = std::result::Result<T, QueryGateError>;

impl QueryGateError {
    pub(crate) fn field_not_found(field: impl Into<String>, entity: impl Into<String>) -> Self {
        QueryGateError::FieldNotFound {
            field: field.into(),
            entity: entity.into(),
        }
    }

    pub(crate) fn type_mismatch(
        field: impl Into<String>,
        expected: DataType,
        value: impl std::fmt::Display,
    ) -> Self {
        QueryGateError::TypeMismatch {
            field: field.into(),
            expected,
            value: value.to_string(),
        }
    }

    /// Check if this error indicates a transient failure that a caller could retry
    ///
    /// The core never retries on its own.
    pub fn is_retriable(&self) -> bool {
        matches!(self, QueryGateError::BackendUnavailable(_))
    }

    /// Short label used for metrics and log fields
    pub fn kind(&self) -> &'static str {
        match self {
            QueryGateError::FieldNotFound { .. } => "field_not_found",
            QueryGateError::TypeMismatch { .. } => "type_mismatch",
            QueryGateError::Configuration(_) => "configuration",
            QueryGateError::BackendUnavailable(_) => "backend_unavailable",
            QueryGateError::EntityNotFound(_) => "entity_not_found",
            QueryGateError::InvalidRequest(_) => "invalid_request",
            QueryGateError::Json(_) => "json",
            QueryGateError::Io(_) => "io",
        }
    }
}
