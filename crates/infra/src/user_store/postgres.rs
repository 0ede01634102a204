//! Postgres-backed user store.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError |
//! |------------|----------------------|------------|
//! | Database (unique violation) | `23505` | `Duplicate(<column>)` |
//! | Database (other) | Any other | `Backend` |
//! | PoolClosed / PoolTimedOut / Io | N/A | `Backend` |
//! | Row decode failure | N/A | `Corrupt` |
//!
//! Uniqueness of `user_id`, `email` and `phone` is enforced by the table
//! constraints, so concurrent signups racing past the count check still
//! collide on insert.

use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::postgres::{PgArguments, PgPoolOptions, PgRow};
use sqlx::query::Query;
use sqlx::{PgPool, Postgres, Row};
use tracing::instrument;

use gatehouse_auth::{PageRequest, Role, StoreError, TokenPatch, UserKey, UserPage, UserRecord, UserStore};
use gatehouse_core::UserId;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    user_id        UUID PRIMARY KEY,
    email          TEXT UNIQUE,
    phone          TEXT UNIQUE,
    password_hash  TEXT,
    first_name     TEXT,
    last_name      TEXT,
    user_type      TEXT CHECK (user_type IN ('ADMIN', 'USER')),
    token          TEXT,
    refresh_token  TEXT,
    created_at     TIMESTAMPTZ,
    updated_at     TIMESTAMPTZ
)
"#;

const COLUMNS: &str = "user_id, email, phone, password_hash, first_name, last_name, \
                       user_type, token, refresh_token, created_at, updated_at";

/// Postgres-backed user store over a shared connection pool.
#[derive(Debug, Clone)]
pub struct PostgresUserStore {
    pool: PgPool,
}

impl PostgresUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect a pool whose acquire timeout matches the storage timeout.
    pub async fn connect(database_url: &str, acquire_timeout: Duration) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .acquire_timeout(acquire_timeout)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Create the `users` table if it does not exist.
    #[instrument(skip(self), err)]
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("ensure_schema", e))?;
        Ok(())
    }
}

fn bind_key<'q>(
    query: Query<'q, Postgres, PgArguments>,
    key: &'q UserKey,
) -> Query<'q, Postgres, PgArguments> {
    match key {
        UserKey::UserId(id) => query.bind(*id.as_uuid()),
        UserKey::Email(value) | UserKey::Phone(value) => query.bind(value.as_str()),
    }
}

fn to_i64(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

#[async_trait::async_trait]
impl UserStore for PostgresUserStore {
    #[instrument(skip(self, key), fields(field = %key.field()), err)]
    async fn count_where(&self, key: &UserKey) -> Result<u64, StoreError> {
        let sql = format!("SELECT COUNT(*) FROM users WHERE {} = $1", key.field().column());
        let row = bind_key(sqlx::query(&sql), key)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("count_where", e))?;
        let count: i64 = row
            .try_get(0)
            .map_err(|e| StoreError::Corrupt(format!("count column: {e}")))?;
        Ok(count.max(0) as u64)
    }

    #[instrument(skip(self, key), fields(field = %key.field()), err)]
    async fn find_one_where(&self, key: &UserKey) -> Result<Option<UserRecord>, StoreError> {
        let sql = format!(
            "SELECT {COLUMNS} FROM users WHERE {} = $1 LIMIT 1",
            key.field().column()
        );
        let row = bind_key(sqlx::query(&sql), key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_one_where", e))?;
        row.as_ref().map(user_from_row).transpose()
    }

    #[instrument(skip(self, record), fields(user_id = %record.user_id), err)]
    async fn insert_one(&self, record: &UserRecord) -> Result<UserId, StoreError> {
        sqlx::query(&format!(
            "INSERT INTO users ({COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)"
        ))
        .bind(*record.user_id.as_uuid())
        .bind(record.email.as_deref())
        .bind(record.phone.as_deref())
        .bind(record.password_hash.as_deref())
        .bind(record.first_name.as_deref())
        .bind(record.last_name.as_deref())
        .bind(record.user_type.map(|r| r.as_str()))
        .bind(record.token.as_deref())
        .bind(record.refresh_token.as_deref())
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_one", e))?;
        Ok(record.user_id)
    }

    #[instrument(skip(self, key, patch), fields(field = %key.field()), err)]
    async fn upsert_where(&self, key: &UserKey, patch: &TokenPatch) -> Result<(), StoreError> {
        let column = key.field().column();
        // A miss on email/phone creates a bare record, which still needs an id.
        let new_id = match key {
            UserKey::UserId(id) => *id,
            _ => UserId::new(),
        };

        let sql = if column == "user_id" {
            "INSERT INTO users (user_id, token, refresh_token, updated_at) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (user_id) DO UPDATE SET \
             token = EXCLUDED.token, \
             refresh_token = EXCLUDED.refresh_token, \
             updated_at = EXCLUDED.updated_at"
                .to_string()
        } else {
            format!(
                "INSERT INTO users (user_id, token, refresh_token, updated_at, {column}) \
                 VALUES ($1, $2, $3, $4, $5) \
                 ON CONFLICT ({column}) DO UPDATE SET \
                 token = EXCLUDED.token, \
                 refresh_token = EXCLUDED.refresh_token, \
                 updated_at = EXCLUDED.updated_at"
            )
        };

        let mut query = sqlx::query(&sql)
            .bind(*new_id.as_uuid())
            .bind(patch.token.as_str())
            .bind(patch.refresh_token.as_str())
            .bind(patch.updated_at);
        if let UserKey::Email(value) | UserKey::Phone(value) = key {
            query = query.bind(value.as_str());
        }
        query
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("upsert_where", e))?;
        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn list(&self, page: PageRequest) -> Result<UserPage, StoreError> {
        let total: i64 = sqlx::query("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_count", e))?
            .try_get(0)
            .map_err(|e| StoreError::Corrupt(format!("count column: {e}")))?;

        let rows = sqlx::query(&format!(
            "SELECT {COLUMNS} FROM users ORDER BY user_id ASC LIMIT $1 OFFSET $2"
        ))
        .bind(to_i64(page.limit))
        .bind(to_i64(page.start_index))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list", e))?;

        Ok(UserPage {
            total_count: total.max(0) as u64,
            items: rows.iter().map(user_from_row).collect::<Result<_, _>>()?,
        })
    }
}

fn user_from_row(row: &PgRow) -> Result<UserRecord, StoreError> {
    let decode = |e: sqlx::Error| StoreError::Corrupt(format!("failed to decode user row: {e}"));

    let user_type = row
        .try_get::<Option<String>, _>("user_type")
        .map_err(decode)?
        .map(|raw| Role::from_str(&raw))
        .transpose()
        .map_err(|e| StoreError::Corrupt(e.to_string()))?;

    Ok(UserRecord {
        user_id: UserId::from_uuid(row.try_get("user_id").map_err(decode)?),
        email: row.try_get("email").map_err(decode)?,
        phone: row.try_get("phone").map_err(decode)?,
        password_hash: row.try_get("password_hash").map_err(decode)?,
        first_name: row.try_get("first_name").map_err(decode)?,
        last_name: row.try_get("last_name").map_err(decode)?,
        user_type,
        token: row.try_get("token").map_err(decode)?,
        refresh_token: row.try_get("refresh_token").map_err(decode)?,
        created_at: row.try_get::<Option<DateTime<Utc>>, _>("created_at").map_err(decode)?,
        updated_at: row.try_get::<Option<DateTime<Utc>>, _>("updated_at").map_err(decode)?,
    })
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    if is_unique_violation(&err) {
        return StoreError::Duplicate(violated_column(&err).to_string());
    }
    match err {
        sqlx::Error::Database(db_err) => {
            StoreError::Backend(format!("database error in {operation}: {}", db_err.message()))
        }
        sqlx::Error::PoolClosed => {
            StoreError::Backend(format!("connection pool closed in {operation}"))
        }
        sqlx::Error::PoolTimedOut => {
            StoreError::Backend(format!("connection pool timed out in {operation}"))
        }
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
            StoreError::Corrupt(format!("decode failure in {operation}: {err}"))
        }
        _ => StoreError::Backend(format!("sqlx error in {operation}: {err}")),
    }
}

/// Check if an error is a unique constraint violation.
fn is_unique_violation(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db_err) = err {
        if let Some(code) = db_err.code() {
            return code.as_ref() == "23505";
        }
    }
    false
}

/// Column behind a unique violation, from Postgres' default constraint names
/// (`users_pkey`, `users_email_key`, `users_phone_key`).
fn violated_column(err: &sqlx::Error) -> &'static str {
    let constraint = match err {
        sqlx::Error::Database(db_err) => db_err.constraint().unwrap_or_default(),
        _ => "",
    };
    if constraint.contains("email") {
        "email"
    } else if constraint.contains("phone") {
        "phone"
    } else {
        "user_id"
    }
}
