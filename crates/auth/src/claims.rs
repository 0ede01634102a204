use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use gatehouse_core::UserId;

use crate::Role;
use crate::token::TokenError;

/// Decoded token payload.
///
/// Access tokens carry every identity field plus `iat`; refresh tokens carry
/// only `exp`. Identity fields are therefore optional here and must never be
/// assumed present by a consumer: a claims value without `user_type`/`uid`
/// does not identify anyone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<UserId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_type: Option<Role>,

    /// Issued-at (seconds since epoch). Access tokens only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,

    /// Expiration (seconds since epoch).
    pub exp: i64,
}

impl TokenClaims {
    /// Claims for a bare renewal credential: nothing but an expiry.
    pub fn expiry_only(exp: i64) -> Self {
        Self {
            email: None,
            first_name: None,
            last_name: None,
            uid: None,
            user_type: None,
            iat: None,
            exp,
        }
    }

    /// Whether any identity field is populated.
    pub fn has_identity(&self) -> bool {
        self.uid.is_some()
            || self.user_type.is_some()
            || self.email.is_some()
            || self.first_name.is_some()
            || self.last_name.is_some()
    }
}

/// Identity fields used to mint an access token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimsSeed {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub user_id: UserId,
    pub role: Role,
}

impl ClaimsSeed {
    pub(crate) fn access_claims(&self, issued_at: i64, exp: i64) -> TokenClaims {
        TokenClaims {
            email: Some(self.email.clone()),
            first_name: Some(self.first_name.clone()),
            last_name: Some(self.last_name.clone()),
            uid: Some(self.user_id),
            user_type: Some(self.role),
            iat: Some(issued_at),
            exp,
        }
    }
}

/// Check the time window of already-decoded claims.
///
/// `exp` must be strictly after `now`; there is no leeway. When `iat` is
/// present the window must also be non-empty.
pub fn validate_claims(claims: &TokenClaims, now: DateTime<Utc>) -> Result<(), TokenError> {
    if let Some(iat) = claims.iat {
        if claims.exp <= iat {
            return Err(TokenError::InvalidTimeWindow);
        }
    }
    if claims.exp <= now.timestamp() {
        return Err(TokenError::Expired);
    }
    Ok(())
}
