//! Domain error taxonomy.
//!
//! Every public repository method funnels engine failures into [`CoreError`]
//! before returning; raw driver errors never escape the data-access layer.
//! Callers above this layer map the taxonomy to transport-level responses.

use crate::types::DbId;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// A referenced row is absent (404-equivalent).
    #[error("Not found: {0}")]
    NotFound(String),

    /// Malformed input or an invalid enum value (422-equivalent).
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Uniqueness or foreign-key violation (409-equivalent).
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Any other engine failure (connection, timeout, protocol). Carries the
    /// engine-specific code when one exists, for diagnostics only.
    #[error("Database error: {message}")]
    Database {
        code: Option<String>,
        message: String,
    },
}

impl CoreError {
    pub fn not_found(entity: &str, id: DbId) -> Self {
        Self::NotFound(format!("{entity} with id {id}"))
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    pub fn database(code: Option<String>, message: impl Into<String>) -> Self {
        Self::Database {
            code,
            message: message.into(),
        }
    }
}
