//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Failures detectable from values alone, before any store is consulted.
///
/// Missing records, stock shortfalls and storage outages are not domain
/// errors; the order and catalog services report those themselves.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Malformed or out-of-range input (blank name, negative stock, bad price).
    #[error("validation failed: {0}")]
    Validation(String),

    /// Arithmetic left the representable range (e.g. an order total overflowed).
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// An id string did not parse.
    #[error("invalid identifier: {0}")]
    InvalidId(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    /// The message without its category prefix, as shown to API clients.
    pub fn reason(&self) -> String {
        match self {
            Self::Validation(msg) | Self::InvariantViolation(msg) | Self::InvalidId(msg) => {
                msg.clone()
            }
        }
    }
}
