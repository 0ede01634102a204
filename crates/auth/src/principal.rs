use gatehouse_core::UserId;

use crate::{Role, TokenClaims};

/// Identity attached to a request after its token has been validated.
///
/// Only the two values the guards look at are kept: the role (`user_type`
/// claim) and the account identifier (`uid` claim). Either may be absent, for
/// instance when a refresh token is presented, in which case every guard
/// rejects the request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Principal {
    user_id: Option<UserId>,
    role: Option<Role>,
}

impl Principal {
    pub fn new(user_id: Option<UserId>, role: Option<Role>) -> Self {
        Self { user_id, role }
    }

    pub fn from_claims(claims: &TokenClaims) -> Self {
        Self {
            user_id: claims.uid,
            role: claims.user_type,
        }
    }

    pub fn user_id(&self) -> Option<&UserId> {
        self.user_id.as_ref()
    }

    pub fn role(&self) -> Option<Role> {
        self.role
    }
}

impl From<&TokenClaims> for Principal {
    fn from(claims: &TokenClaims) -> Self {
        Self::from_claims(claims)
    }
}
