// Copyright (c) MySocial Team
// SPDX-License-Identifier: Apache-2.0

use crate::config::{Config, DatabaseConfig};
use anyhow::{Context, Result};
use diesel_async::async_connection_wrapper::AsyncConnectionWrapper;
use diesel_async::pooled_connection::deadpool::{Object, Pool, PoolError};
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::AsyncPgConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use tracing::info;

pub type DbPool = Pool<AsyncPgConnection>;
pub type DbConnection = Object<AsyncPgConnection>;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Database manager for the API
pub struct Database {
    pool: DbPool,
    url: String,
}

impl Database {
    /// Create a new database manager from the installed configuration
    pub async fn new() -> Result<Self> {
        Self::connect(&Config::get().database).await
    }

    /// Build a pool for `config`, check connectivity and apply migrations
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let manager = AsyncDieselConnectionManager::<AsyncPgConnection>::new(&config.url);

        let pool = DbPool::builder(manager)
            .max_size(config.max_connections)
            .build()
            .context("Failed to build database pool")?;

        let db = Self {
            pool,
            url: config.url.clone(),
        };

        // Test connection and run migrations
        db.initialize().await?;

        Ok(db)
    }

    async fn initialize(&self) -> Result<()> {
        let _conn = self.get_connection().await?;
        info!("Successfully connected to the database");

        self.run_migrations().await?;

        Ok(())
    }

    /// Apply pending migrations on a dedicated connection.
    ///
    /// The migration harness is synchronous, so it runs on the blocking pool.
    async fn run_migrations(&self) -> Result<()> {
        let url = self.url.clone();
        let applied = tokio::task::spawn_blocking(move || -> Result<usize> {
            use diesel::Connection;
            let mut conn = AsyncConnectionWrapper::<AsyncPgConnection>::establish(&url)?;
            let versions = conn
                .run_pending_migrations(MIGRATIONS)
                .map_err(|e| anyhow::anyhow!("Failed to run migrations: {}", e))?;
            Ok(versions.len())
        })
        .await??;

        info!("Database migrations applied successfully ({} new)", applied);
        Ok(())
    }

    /// Get a database connection from the pool
    pub async fn get_connection(&self) -> Result<DbConnection, PoolError> {
        self.pool.get().await
    }

    pub fn get_pool(&self) -> &DbPool {
        &self.pool
    }
}

/// Initialize database connection pool and run migrations
pub async fn init_database() -> Result<Database> {
    Database::new().await
}
