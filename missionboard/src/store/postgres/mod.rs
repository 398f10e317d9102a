//! `PostgreSQL` implementation of the repository traits.
//!
//! # Example
//!
//! ```no_run
//! use missionboard::config::PostgresConfig;
//! use missionboard::store::postgres::PostgresStore;
//!
//! # async fn example(config: PostgresConfig) -> Result<(), Box<dyn std::error::Error>> {
//! let store = PostgresStore::connect(&config).await?;
//! store.migrate().await?;
//! # Ok(())
//! # }
//! ```

mod billing;
mod events;
mod members;
mod rows;

use crate::config::PostgresConfig;
use crate::error::Result;
use crate::store::{MissionBoardStore, StoreFuture};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;

/// Store backed by a `sqlx` connection pool.
#[derive(Clone, Debug)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Wrap an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a pool sized and timed from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::MissionBoardError::Database`] if no connection
    /// can be established.
    pub async fn connect(config: &PostgresConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout))
            .idle_timeout(Duration::from_secs(config.idle_timeout))
            .connect(&config.url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Apply pending migrations.
    ///
    /// # Errors
    ///
    /// Returns an error if a migration fails.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    /// The underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl MissionBoardStore for PostgresStore {
    fn ping(&self) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            sqlx::query("SELECT 1").execute(&self.pool).await?;
            Ok(())
        })
    }
}
