use thiserror::Error;

use gatehouse_core::DomainError;

use crate::{AuthzError, HashError, StoreError, TokenError};

/// Message returned when signup hits an existing email or phone.
pub const DUPLICATE_ACCOUNT: &str = "this email or phone number already exists";

/// Errors surfaced by account operations.
///
/// Authentication failure is a single variant on purpose: callers cannot
/// learn whether the email or the password was wrong.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error("email or password is incorrect")]
    InvalidCredentials,

    #[error(transparent)]
    Forbidden(#[from] AuthzError),

    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    #[error(transparent)]
    Hashing(#[from] HashError),

    #[error("token issuance failed: {0}")]
    Token(#[from] TokenError),

    #[error("internal error: {0}")]
    Internal(String),
}

/// Coarse category used to pick a response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Conflict,
    Authentication,
    Authorization,
    Infrastructure,
}

impl AuthError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn duplicate_account() -> Self {
        Self::Conflict(DUPLICATE_ACCOUNT.to_string())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            AuthError::Validation(_) => ErrorKind::Validation,
            AuthError::Conflict(_) => ErrorKind::Conflict,
            AuthError::InvalidCredentials => ErrorKind::Authentication,
            AuthError::Forbidden(_) => ErrorKind::Authorization,
            AuthError::Store(_)
            | AuthError::Hashing(_)
            | AuthError::Token(_)
            | AuthError::Internal(_) => ErrorKind::Infrastructure,
        }
    }
}

impl From<DomainError> for AuthError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(msg) => AuthError::Validation(msg),
            DomainError::InvalidId(msg) => AuthError::Validation(msg),
        }
    }
}
