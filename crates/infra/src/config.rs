//! Configuration loading and representation.
//!
//! Everything is read once at startup from the environment. Tests go
//! through [`Config::from_lookup`] instead of mutating process state.

use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

use gatehouse_auth::{SigningSecret, TokenTtl};

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_STORAGE_TIMEOUT_SECS: u64 = 100;
pub const DEFAULT_ACCESS_TTL_HOURS: i64 = 24;
pub const DEFAULT_REFRESH_TTL_HOURS: i64 = 160;
/// Ten years.
pub const MAX_TOKEN_TTL_HOURS: i64 = 24 * 365 * 10;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("SECRET_KEY must be set to a non-empty value")]
    MissingSecret,

    #[error("invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

#[derive(Clone)]
pub struct Config {
    pub secret: SigningSecret,
    pub database_url: Option<String>,
    pub bind_addr: SocketAddr,
    pub storage_timeout: Duration,
    pub token_ttl: TokenTtl,
}

impl core::fmt::Debug for Config {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Config")
            .field("secret", &self.secret)
            .field("database_url", &self.database_url.as_ref().map(|_| "<set>"))
            .field("bind_addr", &self.bind_addr)
            .field("storage_timeout", &self.storage_timeout)
            .field("token_ttl", &self.token_ttl)
            .finish()
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let secret = lookup("SECRET_KEY")
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::MissingSecret)
            .and_then(|s| SigningSecret::new(s).map_err(|_| ConfigError::MissingSecret))?;

        let database_url = lookup("DATABASE_URL").filter(|s| !s.trim().is_empty());

        let bind_addr = parse_or(&lookup, "BIND_ADDR", || {
            DEFAULT_BIND_ADDR.parse::<SocketAddr>().map_err(|e| e.to_string())
        })?;

        let timeout_secs: u64 = parse_or(&lookup, "STORAGE_TIMEOUT_SECS", || Ok(DEFAULT_STORAGE_TIMEOUT_SECS))?;
        if timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                var: "STORAGE_TIMEOUT_SECS",
                reason: "must be greater than zero".to_string(),
            });
        }

        let access_hours: i64 = parse_or(&lookup, "ACCESS_TOKEN_TTL_HOURS", || Ok(DEFAULT_ACCESS_TTL_HOURS))?;
        let refresh_hours: i64 = parse_or(&lookup, "REFRESH_TOKEN_TTL_HOURS", || Ok(DEFAULT_REFRESH_TTL_HOURS))?;
        let access = ttl_hours("ACCESS_TOKEN_TTL_HOURS", access_hours)?;
        let refresh = ttl_hours("REFRESH_TOKEN_TTL_HOURS", refresh_hours)?;

        Ok(Self {
            secret,
            database_url,
            bind_addr,
            storage_timeout: Duration::from_secs(timeout_secs),
            token_ttl: TokenTtl { access, refresh },
        })
    }
}

fn ttl_hours(var: &'static str, hours: i64) -> Result<chrono::Duration, ConfigError> {
    if !(1..=MAX_TOKEN_TTL_HOURS).contains(&hours) {
        return Err(ConfigError::Invalid {
            var,
            reason: format!("must be between 1 and {MAX_TOKEN_TTL_HOURS} hours"),
        });
    }
    chrono::Duration::try_hours(hours).ok_or_else(|| ConfigError::Invalid {
        var,
        reason: "out of range".to_string(),
    })
}

fn parse_or<F, T, D>(lookup: &F, var: &'static str, default: D) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: core::fmt::Display,
    D: FnOnce() -> Result<T, String>,
{
    let parsed = match lookup(var) {
        Some(raw) => raw.trim().parse::<T>().map_err(|e| e.to_string()),
        None => default(),
    };
    parsed.map_err(|reason| ConfigError::Invalid { var, reason })
}
