//! Domain error model.

use thiserror::Error;

/// Result type used for input/identifier checks across the workspace.
pub type DomainResult<T> = Result<T, DomainError>;

/// Deterministic, input-driven failures (no IO involved).
///
/// Infrastructure failures (storage, hashing, signing) are modelled by the
/// crates that own those concerns.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (missing field, short password, bad email).
    #[error("validation failed: {0}")]
    Validation(String),

    /// An identifier could not be parsed.
    #[error("invalid identifier: {0}")]
    InvalidId(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }
}
