//! libSQL database handle for the commander.
//!
//! Stores a single connection that is reused for all operations.
//! `libsql::Connection` is `Send + Sync` and safe for concurrent async use;
//! writes serialize through SQLite's single-writer lock, which is all the
//! queue needs since each worker only touches its own rows.

use std::path::Path;
use std::sync::Arc;

use libsql::{Connection, Database as LibSqlDatabase};
use tracing::info;

use crate::error::DatabaseError;
use crate::store::migrations;

/// Shared database handle.
pub struct CommanderDb {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl CommanderDb {
    /// Open (or create) a local database file and run migrations.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, DatabaseError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Connection(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Connection(format!("Failed to open database: {e}")))?;
        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Connection(format!("Failed to create connection: {e}")))?;

        let db = Self {
            db: Arc::new(db),
            conn,
        };
        migrations::run_migrations(&db.conn).await?;
        info!(path = %path.display(), "Database opened");
        Ok(db)
    }

    /// Create an in-memory database (for tests).
    pub async fn open_in_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Connection(format!("Failed to create in-memory database: {e}"))
            })?;
        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Connection(format!("Failed to create connection: {e}")))?;

        let db = Self {
            db: Arc::new(db),
            conn,
        };
        migrations::run_migrations(&db.conn).await?;
        Ok(db)
    }

    /// Get the connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }
}
