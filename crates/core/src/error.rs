//! Domain and storage error models.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Infrastructure-level storage failure.
///
/// Raised by store adapters, never by business rules. `Unavailable` is the
/// only retryable variant; the boundary layer surfaces it with a retry hint.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The backing store could not be reached or timed out.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A database constraint rejected the write (e.g. unique violation).
    #[error("store constraint violated: {0}")]
    Constraint(String),

    /// A persisted row could not be decoded into its domain shape.
    #[error("store row decode failed: {0}")]
    Decode(String),
}

impl StoreError {
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    pub fn constraint(msg: impl Into<String>) -> Self {
        Self::Constraint(msg.into())
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Whether the caller may retry the operation with backoff.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

/// Domain-level error.
///
/// Keep this focused on deterministic business failures (validation,
/// ownership, lifecycle). Storage failures are wrapped, not swallowed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. malformed or empty input).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A requested resource was not found.
    #[error("not found")]
    NotFound,

    /// The requester does not own the resource (or lacks the admin role).
    #[error("unauthorized")]
    Unauthorized,

    /// A grant exists but its validity window has passed.
    #[error("expired")]
    Expired,

    /// Lost a compare-and-set race (e.g. on order status).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Transient persistence failure; retryable by the caller.
    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
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
    fn only_unavailable_is_retryable() {
        assert!(StoreError::unavailable("pool timeout").is_retryable());
        assert!(!StoreError::constraint("duplicate token").is_retryable());
        assert!(!StoreError::decode("bad status").is_retryable());
    }

    #[test]
    fn store_errors_wrap_into_domain_errors() {
        let err: DomainError = StoreError::unavailable("connection refused").into();
        match err {
            DomainError::Storage(inner) => assert!(inner.is_retryable()),
            _ => panic!("Expected Storage variant"),
        }
    }
}
