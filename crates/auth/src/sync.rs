use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, SubsecRound, Utc};
use tracing::instrument;

use gatehouse_core::UserId;

use crate::store::{StoreError, UserStore, bounded};
use crate::token::TokenPair;
use crate::user::{TokenPatch, UserKey};

/// Persists the latest token pair against a user record.
#[derive(Clone)]
pub struct TokenStoreSync {
    store: Arc<dyn UserStore>,
    timeout: Duration,
}

impl TokenStoreSync {
    pub fn new(store: Arc<dyn UserStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    /// Single upsert keyed by `user_id` setting both tokens and `updated_at`.
    ///
    /// Idempotent for identical arguments. `updated_at` is stored at whole
    /// second precision. When no record has this id a bare one is created,
    /// so callers must make sure the account exists first.
    #[instrument(skip(self, pair), fields(user_id = %user_id), err)]
    pub async fn persist_tokens(
        &self,
        user_id: UserId,
        pair: &TokenPair,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let patch = TokenPatch {
            token: pair.access.clone(),
            refresh_token: pair.refresh.clone(),
            updated_at: now.trunc_subsecs(0),
        };
        bounded(
            self.timeout,
            self.store.upsert_where(&UserKey::UserId(user_id), &patch),
        )
        .await
    }
}
