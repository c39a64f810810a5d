//! Persistence layer.
//!
//! `Mirror` owns the SQLite pool for one sync run. The pool is capped at a
//! single connection: one run owns the store exclusively and there are no
//! concurrent writers, so the database's own transaction isolation is the
//! only locking discipline needed.

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::info;

/// Embedded schema, applied idempotently on connect.
const SCHEMA: &str = include_str!("schema.sql");

/// Handle to the local relational mirror.
#[derive(Clone)]
pub struct Mirror {
    pool: SqlitePool,
}

impl Mirror {
    /// Open (creating if missing) the mirror database and ensure the schema
    /// exists.
    pub async fn connect(database_url: &str) -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        sqlx::raw_sql(SCHEMA).execute(&pool).await?;
        info!(database_url, "Connected to mirror store");

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Begin the one logical transaction that covers a batch.
    pub async fn begin(&self) -> Result<Transaction<'static, Sqlite>, sqlx::Error> {
        self.pool.begin().await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
