//! User identity record and the typed keys used to address it in storage.

use chrono::{DateTime, Utc};

use gatehouse_core::{Entity, UserId};

use crate::{ClaimsSeed, Role};

// ─────────────────────────────────────────────────────────────────────────────
// Record
// ─────────────────────────────────────────────────────────────────────────────

/// One account as held by the store.
///
/// # Invariants
/// - `user_id` is assigned at signup and never rewritten.
/// - `email` and `phone` are unique across records (enforced by the store).
/// - `password_hash` is a PHC string, never the plaintext.
///
/// Profile fields are optional because a token upsert against an unknown
/// `user_id` creates a bare record holding only the id and token fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    /// Primary key, assigned at signup.
    pub user_id: UserId,
    /// Login identifier; unique across records.
    pub email: Option<String>,
    /// Unique across records.
    pub phone: Option<String>,
    /// Argon2id PHC string.
    pub password_hash: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    /// Role carried into issued access tokens.
    pub user_type: Option<Role>,
    /// Most recently issued access token.
    pub token: Option<String>,
    /// Most recently issued refresh token.
    pub refresh_token: Option<String>,
    /// Set once at signup.
    pub created_at: Option<DateTime<Utc>>,
    /// Time of the last token refresh.
    pub updated_at: Option<DateTime<Utc>>,
}

impl UserRecord {
    /// A record carrying nothing but its identifier.
    pub fn bare(user_id: UserId) -> Self {
        Self {
            user_id,
            email: None,
            phone: None,
            password_hash: None,
            first_name: None,
            last_name: None,
            user_type: None,
            token: None,
            refresh_token: None,
            created_at: None,
            updated_at: None,
        }
    }

    /// Identity fields for a new access token, if the record is complete.
    pub fn claims_seed(&self) -> Option<ClaimsSeed> {
        Some(ClaimsSeed {
            email: self.email.clone()?,
            first_name: self.first_name.clone()?,
            last_name: self.last_name.clone()?,
            user_id: self.user_id,
            role: self.user_type?,
        })
    }

    pub fn matches(&self, key: &UserKey) -> bool {
        match key {
            UserKey::UserId(id) => self.user_id == *id,
            UserKey::Email(email) => self.email.as_deref() == Some(email.as_str()),
            UserKey::Phone(phone) => self.phone.as_deref() == Some(phone.as_str()),
        }
    }

    /// Overwrite the token fields (and nothing else).
    pub fn apply(&mut self, patch: &TokenPatch) {
        self.token = Some(patch.token.clone());
        self.refresh_token = Some(patch.refresh_token.clone());
        self.updated_at = Some(patch.updated_at);
    }
}

impl Entity for UserRecord {
    type Id = UserId;

    fn id(&self) -> &Self::Id {
        &self.user_id
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Keys & patches
// ─────────────────────────────────────────────────────────────────────────────

/// Fields the store can be queried by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UserField {
    UserId,
    Email,
    Phone,
}

impl UserField {
    pub const fn column(&self) -> &'static str {
        match self {
            UserField::UserId => "user_id",
            UserField::Email => "email",
            UserField::Phone => "phone",
        }
    }
}

impl core::fmt::Display for UserField {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.column())
    }
}

/// A (field, value) pair addressing records.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum UserKey {
    UserId(UserId),
    Email(String),
    Phone(String),
}

impl UserKey {
    pub fn field(&self) -> UserField {
        match self {
            UserKey::UserId(_) => UserField::UserId,
            UserKey::Email(_) => UserField::Email,
            UserKey::Phone(_) => UserField::Phone,
        }
    }
}

/// The fields written by a token refresh.
#[derive(Clone, PartialEq, Eq)]
pub struct TokenPatch {
    pub token: String,
    pub refresh_token: String,
    pub updated_at: DateTime<Utc>,
}

impl core::fmt::Debug for TokenPatch {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TokenPatch")
            .field("updated_at", &self.updated_at)
            .finish_non_exhaustive()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Listing
// ─────────────────────────────────────────────────────────────────────────────

/// Offset/limit window over all records, ordered by `user_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// Records to skip.
    pub start_index: u64,
    /// Maximum records to return.
    pub limit: u64,
}

impl PageRequest {
    pub const DEFAULT_LIMIT: u64 = 10;

    /// Resolve listing query parameters.
    ///
    /// A missing or non-positive `record_per_page` falls back to 10 and a
    /// missing or non-positive `page` to 1; an explicit `start_index`
    /// overrides the page-derived offset.
    pub fn from_query(record_per_page: Option<i64>, page: Option<i64>, start_index: Option<u64>) -> Self {
        let limit = match record_per_page {
            Some(n) if n >= 1 => n as u64,
            _ => Self::DEFAULT_LIMIT,
        };
        let page = match page {
            Some(n) if n >= 1 => n as u64,
            _ => 1,
        };
        Self {
            start_index: start_index.unwrap_or((page - 1).saturating_mul(limit)),
            limit,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserPage {
    /// Count of all records, not just this page.
    pub total_count: u64,
    pub items: Vec<UserRecord>,
}
