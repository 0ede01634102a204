//! Storage contract consumed by the account lifecycle.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use gatehouse_core::UserId;

use crate::user::{PageRequest, TokenPatch, UserKey, UserPage, UserRecord};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("storage operation timed out after {0:?}")]
    Timeout(Duration),

    /// A unique field (`user_id`, `email`, `phone`) already holds this value.
    #[error("duplicate value for unique field '{0}'")]
    Duplicate(String),

    #[error("corrupt record: {0}")]
    Corrupt(String),

    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Narrow key/value-style access to user records.
///
/// Implementations must be safe for concurrent use and must enforce
/// uniqueness of `user_id`, `email` and `phone` on `insert_one`; the
/// count-before-insert check done by signup is only a fast path.
#[async_trait::async_trait]
pub trait UserStore: Send + Sync {
    async fn count_where(&self, key: &UserKey) -> Result<u64, StoreError>;

    async fn find_one_where(&self, key: &UserKey) -> Result<Option<UserRecord>, StoreError>;

    /// Insert a complete record in a single write.
    async fn insert_one(&self, record: &UserRecord) -> Result<UserId, StoreError>;

    /// Apply `patch` to the record matching `key`, creating a bare record
    /// holding only the key and the patch when none matches.
    async fn upsert_where(&self, key: &UserKey, patch: &TokenPatch) -> Result<(), StoreError>;

    async fn list(&self, page: PageRequest) -> Result<UserPage, StoreError>;
}

#[async_trait::async_trait]
impl<S> UserStore for Arc<S>
where
    S: UserStore + ?Sized,
{
    async fn count_where(&self, key: &UserKey) -> Result<u64, StoreError> {
        (**self).count_where(key).await
    }

    async fn find_one_where(&self, key: &UserKey) -> Result<Option<UserRecord>, StoreError> {
        (**self).find_one_where(key).await
    }

    async fn insert_one(&self, record: &UserRecord) -> Result<UserId, StoreError> {
        (**self).insert_one(record).await
    }

    async fn upsert_where(&self, key: &UserKey, patch: &TokenPatch) -> Result<(), StoreError> {
        (**self).upsert_where(key, patch).await
    }

    async fn list(&self, page: PageRequest) -> Result<UserPage, StoreError> {
        (**self).list(page).await
    }
}

/// Run one logical storage operation under `limit`.
///
/// On expiry the future is dropped (no retry) and `StoreError::Timeout` is
/// returned through the caller's error type.
pub async fn bounded<T, E, F>(limit: Duration, op: F) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
    E: From<StoreError>,
{
    match tokio::time::timeout(limit, op).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(timeout = ?limit, "storage operation timed out");
            Err(StoreError::Timeout(limit).into())
        }
    }
}
