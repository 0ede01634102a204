//! Account lifecycle: signup and login.
//!
//! ```text
//! Unregistered --signup--> Active --login--> Active (tokens refreshed)
//! ```
//!
//! Every operation is bounded by one storage timeout and writes through a
//! single `insert_one`/`upsert_where` call, so a cancelled operation leaves
//! the record either fully old or fully new.

use std::sync::Arc;
use std::time::Duration;

use chrono::{SubsecRound, Utc};
use serde::Deserialize;
use tracing::instrument;

use gatehouse_core::{DomainError, DomainResult, UserId};

use crate::error::AuthError;
use crate::password::{CredentialHasher, Verification};
use crate::store::{StoreError, UserStore, bounded};
use crate::sync::TokenStoreSync;
use crate::token::TokenService;
use crate::user::{UserKey, UserRecord};
use crate::{ClaimsSeed, Role};

pub const MIN_PASSWORD_LEN: usize = 6;
const NAME_LEN: core::ops::RangeInclusive<usize> = 2..=100;

// ─────────────────────────────────────────────────────────────────────────────
// Requests
// ─────────────────────────────────────────────────────────────────────────────

/// Signup payload as received from a caller (unvalidated).
#[derive(Clone, Default, Deserialize)]
pub struct SignupRequest {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub password: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub user_type: Option<Role>,
}

impl core::fmt::Debug for SignupRequest {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SignupRequest")
            .field("email", &self.email)
            .field("phone", &self.phone)
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("user_type", &self.user_type)
            .finish_non_exhaustive()
    }
}

/// Login payload as received from a caller (unvalidated).
#[derive(Clone, Default, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

impl core::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

struct NewAccount {
    email: String,
    phone: String,
    password: String,
    first_name: String,
    last_name: String,
    role: Role,
}

struct Credentials {
    email: String,
    password: String,
}

fn required(value: Option<String>, field: &str) -> DomainResult<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(DomainError::validation(format!("{field} is required"))),
    }
}

fn valid_email(email: &str) -> bool {
    let mut parts = email.split('@');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => {
            !local.is_empty()
                && !domain.is_empty()
                && !email.chars().any(char::is_whitespace)
        }
        _ => false,
    }
}

impl SignupRequest {
    fn validate(self) -> DomainResult<NewAccount> {
        let email = required(self.email, "email")?;
        if !valid_email(&email) {
            return Err(DomainError::validation("email is not a valid address"));
        }
        let phone = required(self.phone, "phone")?;

        let first_name = required(self.first_name, "first_name")?;
        let last_name = required(self.last_name, "last_name")?;
        for (field, value) in [("first_name", &first_name), ("last_name", &last_name)] {
            if !NAME_LEN.contains(&value.chars().count()) {
                return Err(DomainError::validation(format!(
                    "{field} must be between 2 and 100 characters"
                )));
            }
        }

        let role = self
            .user_type
            .ok_or_else(|| DomainError::validation("user_type is required"))?;

        let password = self.password.unwrap_or_default();
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(DomainError::validation(
                "password cannot be empty and must be at least 6 characters long",
            ));
        }

        Ok(NewAccount {
            email,
            phone,
            password,
            first_name,
            last_name,
            role,
        })
    }
}

impl LoginRequest {
    fn validate(self) -> DomainResult<Credentials> {
        Ok(Credentials {
            email: required(self.email, "email")?,
            password: self
                .password
                .ok_or_else(|| DomainError::validation("password is required"))?,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Service
// ─────────────────────────────────────────────────────────────────────────────

/// Signup/login orchestration over injected store, token service and hasher.
#[derive(Clone)]
pub struct AccountService {
    store: Arc<dyn UserStore>,
    tokens: Arc<TokenService>,
    hasher: CredentialHasher,
    sync: TokenStoreSync,
    timeout: Duration,
}

impl AccountService {
    pub fn new(
        store: Arc<dyn UserStore>,
        tokens: Arc<TokenService>,
        hasher: CredentialHasher,
        timeout: Duration,
    ) -> Self {
        let sync = TokenStoreSync::new(store.clone(), timeout);
        Self {
            store,
            tokens,
            hasher,
            sync,
            timeout,
        }
    }

    pub fn store(&self) -> &Arc<dyn UserStore> {
        &self.store
    }

    pub fn tokens(&self) -> &Arc<TokenService> {
        &self.tokens
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Register a new account and return its identifier.
    ///
    /// Email then phone uniqueness are checked by count before hashing; the
    /// store's own uniqueness check on insert remains the real guarantee, and
    /// a violation there is reported the same way.
    #[instrument(skip_all, err(Display))]
    pub async fn signup(&self, request: SignupRequest) -> Result<UserId, AuthError> {
        let account = request.validate()?;
        bounded(self.timeout, self.register(account)).await
    }

    async fn register(&self, account: NewAccount) -> Result<UserId, AuthError> {
        if self.store.count_where(&UserKey::Email(account.email.clone())).await? > 0 {
            tracing::info!("signup rejected: email already registered");
            return Err(AuthError::duplicate_account());
        }
        if self.store.count_where(&UserKey::Phone(account.phone.clone())).await? > 0 {
            tracing::info!("signup rejected: phone already registered");
            return Err(AuthError::duplicate_account());
        }

        let password_hash = self.hash_password(account.password).await?;

        let now = Utc::now().trunc_subsecs(0);
        let user_id = UserId::new();
        let seed = ClaimsSeed {
            email: account.email,
            first_name: account.first_name,
            last_name: account.last_name,
            user_id,
            role: account.role,
        };
        let pair = self.tokens.issue_pair(&seed, now)?;

        let record = UserRecord {
            user_id,
            email: Some(seed.email),
            phone: Some(account.phone),
            password_hash: Some(password_hash),
            first_name: Some(seed.first_name),
            last_name: Some(seed.last_name),
            user_type: Some(seed.role),
            token: Some(pair.access),
            refresh_token: Some(pair.refresh),
            created_at: Some(now),
            updated_at: Some(now),
        };

        match self.store.insert_one(&record).await {
            Ok(id) => {
                tracing::info!(user_id = %id, role = %seed.role, "account created");
                Ok(id)
            }
            Err(StoreError::Duplicate(field)) => {
                tracing::info!(%field, "signup lost a uniqueness race");
                Err(AuthError::duplicate_account())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Verify credentials, refresh the stored token pair and return the
    /// record as re-read after the write.
    #[instrument(skip_all, err(Display))]
    pub async fn login(&self, request: LoginRequest) -> Result<UserRecord, AuthError> {
        let credentials = request.validate()?;
        bounded(self.timeout, self.authenticate(credentials)).await
    }

    async fn authenticate(&self, credentials: Credentials) -> Result<UserRecord, AuthError> {
        let found = self
            .store
            .find_one_where(&UserKey::Email(credentials.email))
            .await?;

        // Unknown emails and password-less records still pay for one verify.
        let hash = found.as_ref().and_then(|user| user.password_hash.clone());
        let verdict = self.verify_password(hash, credentials.password).await?;

        let Some(found) = found else {
            tracing::debug!("login for unknown email");
            return Err(AuthError::InvalidCredentials);
        };
        if found.password_hash.is_none() {
            tracing::debug!(user_id = %found.user_id, "login against record without password");
            return Err(AuthError::InvalidCredentials);
        }
        if !verdict.is_match() {
            tracing::debug!(user_id = %found.user_id, "login with wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        let seed = found.claims_seed().ok_or_else(|| {
            StoreError::Corrupt(format!("user {} has an incomplete profile", found.user_id))
        })?;
        let now = Utc::now();
        let pair = self.tokens.issue_pair(&seed, now)?;
        self.sync.persist_tokens(found.user_id, &pair, now).await?;

        let fresh = self
            .store
            .find_one_where(&UserKey::UserId(found.user_id))
            .await?
            .ok_or_else(|| {
                StoreError::Corrupt(format!("user {} vanished after token refresh", found.user_id))
            })?;

        tracing::info!(user_id = %fresh.user_id, "login succeeded");
        Ok(fresh)
    }

    async fn hash_password(&self, password: String) -> Result<String, AuthError> {
        let hasher = self.hasher.clone();
        let hashed = tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| AuthError::Internal(format!("hashing task failed: {e}")))??;
        Ok(hashed)
    }

    async fn verify_password(&self, hash: Option<String>, candidate: String) -> Result<Verification, AuthError> {
        let hasher = self.hasher.clone();
        tokio::task::spawn_blocking(move || match hash {
            Some(hash) => hasher.verify(&hash, &candidate),
            None => hasher.verify_decoy(&candidate),
        })
            .await
            .map_err(|e| AuthError::Internal(format!("verification task failed: {e}")))
    }
}
