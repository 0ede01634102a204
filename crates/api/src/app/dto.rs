use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use gatehouse_auth::{PageRequest, Role, UserPage, UserRecord};
use gatehouse_core::UserId;

// -------------------------
// Request DTOs
// -------------------------

/// Listing query. Values arrive as strings so a bad number can be reported
/// (or defaulted) here instead of by the extractor.
#[derive(Debug, Default, Deserialize)]
pub struct ListUsersQuery {
    #[serde(rename = "recordPerPage")]
    pub record_per_page: Option<String>,
    pub page: Option<String>,
    #[serde(rename = "startIndex")]
    pub start_index: Option<String>,
}

impl ListUsersQuery {
    /// Unparseable `recordPerPage`/`page` fall back to their defaults; an
    /// unparseable `startIndex` is an error.
    pub fn to_page(&self) -> Result<PageRequest, String> {
        let lenient = |raw: &Option<String>| raw.as_deref().and_then(|s| s.trim().parse::<i64>().ok());
        let start_index = match self.start_index.as_deref() {
            Some(raw) => Some(
                raw.trim()
                    .parse::<u64>()
                    .map_err(|_| format!("startIndex must be a non-negative integer, got '{raw}'"))?,
            ),
            None => None,
        };
        Ok(PageRequest::from_query(
            lenient(&self.record_per_page),
            lenient(&self.page),
            start_index,
        ))
    }
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct SignupResponse {
    pub user_id: UserId,
}

/// A user as returned over HTTP. The password hash is never included.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub user_id: UserId,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub user_type: Option<Role>,
    pub token: Option<String>,
    pub refresh_token: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<UserRecord> for UserResponse {
    fn from(record: UserRecord) -> Self {
        Self {
            user_id: record.user_id,
            email: record.email,
            phone: record.phone,
            first_name: record.first_name,
            last_name: record.last_name,
            user_type: record.user_type,
            token: record.token,
            refresh_token: record.refresh_token,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UserListResponse {
    pub total_count: u64,
    pub user_items: Vec<UserResponse>,
}

impl From<UserPage> for UserListResponse {
    fn from(page: UserPage) -> Self {
        Self {
            total_count: page.total_count,
            user_items: page.items.into_iter().map(UserResponse::from).collect(),
        }
    }
}
