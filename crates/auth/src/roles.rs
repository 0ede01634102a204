use core::str::FromStr;

use serde::{Deserialize, Serialize};

use gatehouse_core::DomainError;

/// Role identifier used for RBAC.
///
/// The set is closed: every account is either an administrator or an ordinary
/// user bound to its own identity. There is no hierarchy between the two.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "ADMIN")]
    Admin,
    #[serde(rename = "USER")]
    User,
}

impl Role {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::User => "USER",
        }
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ADMIN" => Ok(Role::Admin),
            "USER" => Ok(Role::User),
            other => Err(DomainError::validation(format!(
                "user_type must be one of ADMIN, USER (got '{other}')"
            ))),
        }
    }
}
