use thiserror::Error;

use gatehouse_core::UserId;

use crate::{Principal, Role};

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AuthzError {
    #[error("user type not found in context")]
    MissingRole,

    #[error("unauthorized to access this resource")]
    Forbidden,
}

/// Require the caller's role to be exactly `required`.
///
/// - No IO
/// - No hierarchy: ADMIN does not satisfy a USER check and vice versa
pub fn require_role(principal: &Principal, required: Role) -> Result<(), AuthzError> {
    match principal.role() {
        None => Err(AuthzError::MissingRole),
        Some(role) if role == required => Ok(()),
        Some(_) => Err(AuthzError::Forbidden),
    }
}

/// Admins act on anyone; ordinary users act only on themselves.
pub fn require_ownership_or_admin(principal: &Principal, target: &UserId) -> Result<(), AuthzError> {
    match principal.role() {
        Some(Role::Admin) => Ok(()),
        Some(Role::User) if principal.user_id() == Some(target) => Ok(()),
        Some(Role::User) => Err(AuthzError::Forbidden),
        None => Err(AuthzError::MissingRole),
    }
}
