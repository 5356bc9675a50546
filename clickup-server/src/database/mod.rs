//! PostgreSQL persistence layer
//!
//! `PostgresManager` owns the pool; entity queries are grouped per area in
//! the submodules as further `impl PostgresManager` blocks.

pub mod people;
pub mod postgres;
pub mod projects;
pub mod seed;
pub mod tickets;
pub mod users;

pub use postgres::PostgresManager;
pub use seed::{SeedData, SeedReport};
pub use tickets::{AllocationChanges, BoardFilter, TicketChanges};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::DatabaseConfig;

/// Database connection manager
pub struct DatabaseManager {
    pub postgres: Arc<PostgresManager>,
}

impl DatabaseManager {
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        let postgres = PostgresManager::new(config).await?;
        Ok(Self {
            postgres: Arc::new(postgres),
        })
    }

    /// Manager whose pool connects on first use
    pub fn new_lazy(config: &DatabaseConfig) -> Result<Self> {
        let postgres = PostgresManager::new_lazy(config)?;
        Ok(Self {
            postgres: Arc::new(postgres),
        })
    }

    pub async fn migrate(&self) -> Result<()> {
        self.postgres.migrate().await
    }

    pub async fn health_check(&self) -> DatabaseHealth {
        let postgres = self.postgres.health_check().await.is_ok();
        DatabaseHealth {
            postgres,
            overall: postgres,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DatabaseHealth {
    pub postgres: bool,
    pub overall: bool,
}
