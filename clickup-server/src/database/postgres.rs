//! PostgreSQL connection manager with runtime queries

use anyhow::Result;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Postgres, Row, Transaction};
use std::time::Duration;
use tracing::info;

use crate::config::DatabaseConfig;

/// Advisory lock key serializing ticket custom id allocation
pub(crate) const TICKET_SEQUENCE_LOCK: i64 = 0x7469_636b_6574;

#[derive(Clone)]
pub struct PostgresManager {
    pub pool: PgPool,
}

impl PostgresManager {
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        let pool = Self::pool_options(config)
            .connect(&config.postgres_url)
            .await?;
        info!(
            "Connected to PostgreSQL (max {} connections)",
            config.max_connections
        );
        Ok(Self { pool })
    }

    pub fn new_lazy(config: &DatabaseConfig) -> Result<Self> {
        let pool = Self::pool_options(config).connect_lazy(&config.postgres_url)?;
        Ok(Self { pool })
    }

    fn pool_options(config: &DatabaseConfig) -> PgPoolOptions {
        PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
    }

    /// Apply embedded migrations
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("Database migrations applied");
        Ok(())
    }

    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    pub(crate) async fn begin(&self) -> Result<Transaction<'static, Postgres>, sqlx::Error> {
        self.pool.begin().await
    }

    pub(crate) async fn count(&self, table: &str) -> Result<i64, sqlx::Error> {
        let query = format!("SELECT COUNT(*) AS total FROM {}", table);
        let row = sqlx::query(&query).fetch_one(&self.pool).await?;
        row.try_get("total")
    }

    /// Delete a row by primary key, reporting whether it existed
    pub(crate) async fn delete_by_id(&self, table: &str, id: &str) -> Result<bool, sqlx::Error> {
        let query = format!("DELETE FROM {} WHERE id = $1", table);
        let result = sqlx::query(&query).bind(id).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    pub(crate) async fn exists(&self, table: &str, id: &str) -> Result<bool, sqlx::Error> {
        let query = format!("SELECT EXISTS(SELECT 1 FROM {} WHERE id = $1) AS found", table);
        let row = sqlx::query(&query).bind(id).fetch_one(&self.pool).await?;
        row.try_get("found")
    }
}

/// Parse a text column holding a choice enum
pub(crate) fn choice<T>(row: &PgRow, column: &str) -> Result<T, sqlx::Error>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.try_get(column)?;
    raw.parse::<T>().map_err(|e| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(e),
    })
}
