//! `UserStore` engines.
//!
//! - [`InMemoryUserStore`]: process-local, for tests and credential-less dev runs
//! - [`PostgresUserStore`]: durable `users` table via sqlx

mod in_memory;
mod postgres;

pub use in_memory::InMemoryUserStore;
pub use postgres::PostgresUserStore;
