//! Database layer: connection pool and migrations.
//!
//! Individual stores (`jobs::status_store::PostgresJobStatusStore`,
//! `audit::PostgresAuditSink`, `ingress::PostgresTaskRepository`) each take
//! a `PgPool` directly rather than going through this type — there's no
//! shared cross-table logic between them worth centralizing here.

pub mod health;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::error::{RelayError, Result};

/// Database connection pool.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool.
    pub async fn new(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(20)
            .min_connections(5)
            .acquire_timeout(std::time::Duration::from_secs(5))
            .connect(database_url)
            .await?;

        Ok(Self { pool })
    }

    /// Run migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| RelayError::from(sqlx::Error::Migrate(Box::new(e))))?;
        Ok(())
    }

    /// Get the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}
