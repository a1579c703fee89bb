//! Database layer.
//!
//! PostgreSQL via sqlx. List queries take a [`crate::authz::Scope`] and
//! render it into the `WHERE` clause; nothing in this layer post-filters
//! rows in memory. Ownership-fact lookups live in [`facts`] as narrow
//! projections, separate from full row fetches.

pub mod categories;
pub mod facts;
pub mod models;
pub mod projects;
pub mod tasks;
pub mod users;

use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::config::DatabaseConfig;
use crate::error::Result;

pub use models::{
    AttachmentRow, CategoryRow, ProjectRow, TaskRow, TaskStatus, UserRow, UserStats, UserView,
};

/// Database connection and operations.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool.
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(std::time::Duration::from_secs(5))
            .connect(&config.url)
            .await?;

        Ok(Self { pool })
    }

    /// Run migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| crate::error::ForgeError::from(sqlx::Error::Migrate(Box::new(e))))?;
        Ok(())
    }

    /// Get the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}
