//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Every variant is surfaced to the caller as-is; nothing in the platform
/// retries automatically. Any error inside a mutating operation aborts the
/// whole transaction.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Malformed input (bad date, bad role key, unknown benefit code,
    /// missing required relation). Recoverable by correcting the input.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The authorization gate rejected the caller.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// A referenced user, app, tier, role or organisation does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A uniqueness constraint was violated (e.g. email already in use).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Unexpected failure (storage unavailable, poisoned lock, ...).
    #[error("internal error: {0}")]
    Internal(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Stable machine-readable code for transport adapters.
    pub fn code(&self) -> &'static str {
        match self {
            DomainError::Validation(_) => "validation_error",
            DomainError::Forbidden(_) => "forbidden",
            DomainError::NotFound(_) => "not_found",
            DomainError::Conflict(_) => "conflict",
            DomainError::Internal(_) => "internal_error",
        }
    }

    /// The human-readable part of the error, without the category prefix.
    pub fn message(&self) -> &str {
        match self {
            DomainError::Validation(m)
            | DomainError::Forbidden(m)
            | DomainError::NotFound(m)
            | DomainError::Conflict(m)
            | DomainError::Internal(m) => m,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_category_and_message() {
        let err = DomainError::validation("Invalid date.");
        assert_eq!(err.to_string(), "validation failed: Invalid date.");
        assert_eq!(err.message(), "Invalid date.");
        assert_eq!(err.code(), "validation_error");
    }

    #[test]
    fn codes_are_distinct() {
        let codes = [
            DomainError::validation("x").code(),
            DomainError::forbidden("x").code(),
            DomainError::not_found("x").code(),
            DomainError::conflict("x").code(),
            DomainError::internal("x").code(),
        ];
        for (i, a) in codes.iter().enumerate() {
            for b in &codes[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}
