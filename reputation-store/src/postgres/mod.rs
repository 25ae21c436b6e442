//! Postgres-backed store, used in production deployments where state must
//! survive a process restart and be visible to multiple replicas. Schema in
//! `migrations/`, applied with `sqlx::migrate!` from `reputation-server` at
//! startup.
//!
//! Built on the usual `sqlx::PgPool` + `FromRow` shape common to axum/sqlx
//! services.

mod dnsbl;
mod events;
mod reputation;
mod reservations;

use sqlx::PgPool;

/// A single Postgres connection pool shared by every trait impl in this module.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect and run pending migrations.
    ///
    /// # Errors
    /// Returns [`crate::error::StoreError::Sqlx`] if the connection or
    /// migration step fails.
    pub async fn connect(database_url: &str) -> crate::error::Result<Self> {
        let pool = PgPool::connect(database_url).await?;
        sqlx::migrate!("./migrations").run(&pool).await.map_err(|e| {
            sqlx::Error::Migrate(Box::new(e))
        })?;
        Ok(Self::new(pool))
    }
}
