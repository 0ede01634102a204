//! Infrastructure layer: user storage engines and configuration.

pub mod config;
pub mod user_store;

mod integration_tests;

pub use config::{Config, ConfigError};
pub use user_store::{InMemoryUserStore, PostgresUserStore};
