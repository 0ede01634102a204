//! Service wiring: storage engine selection and account service construction.

use std::sync::Arc;
use std::time::Duration;

use gatehouse_auth::{AccountService, CredentialHasher, StoreError, TokenService, UserStore, bounded};
use gatehouse_infra::{Config, InMemoryUserStore, PostgresUserStore};

/// Everything request handlers need, shared behind an `Arc`.
#[derive(Clone)]
pub struct AppServices {
    accounts: AccountService,
}

impl AppServices {
    pub fn new(accounts: AccountService) -> Self {
        Self { accounts }
    }

    pub fn accounts(&self) -> &AccountService {
        &self.accounts
    }

    pub fn store(&self) -> &Arc<dyn UserStore> {
        self.accounts.store()
    }

    pub fn tokens(&self) -> &Arc<TokenService> {
        self.accounts.tokens()
    }

    pub fn timeout(&self) -> Duration {
        self.accounts.timeout()
    }
}

/// Build services from configuration.
///
/// With `DATABASE_URL` set the Postgres store is connected and its schema
/// ensured; otherwise records live in process memory and are lost on exit.
pub async fn build_services(config: &Config) -> Result<AppServices, StoreError> {
    let store: Arc<dyn UserStore> = match &config.database_url {
        Some(url) => {
            let pg = PostgresUserStore::connect(url, config.storage_timeout).await?;
            bounded(config.storage_timeout, pg.ensure_schema()).await?;
            tracing::info!("using postgres user store");
            Arc::new(pg)
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using in-memory user store");
            Arc::new(InMemoryUserStore::new())
        }
    };

    let tokens = Arc::new(TokenService::with_ttl(&config.secret, config.token_ttl));
    let accounts = AccountService::new(store, tokens, CredentialHasher::default(), config.storage_timeout);
    Ok(AppServices::new(accounts))
}
