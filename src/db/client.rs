//! libsql database client and schema management.
//!
//! The relational store holds users, projects, assets, chunks and query
//! logs. One connection is opened at startup (and cheaply cloned per
//! operation), the schema is created idempotently, and foreign keys are
//! enabled so project deletion cascades to assets and chunks at the SQL
//! level. Multi-row mutations serialize on a write lock; SQLite is
//! single-writer anyway.

use libsql::{Builder, Connection};
use tokio::sync::{Mutex, MutexGuard};

use crate::errors::{ApiError, ApiResult};

pub struct DbClient {
    conn: Connection,
    write_lock: Mutex<()>,
}

impl DbClient {
    /// Open (or create) a local database file.
    pub async fn new_local(path: &str) -> ApiResult<Self> {
        let db = Builder::new_local(path)
            .build()
            .await
            .map_err(|e| ApiError::internal(format!("Failed to open database: {}", e)))?;

        let conn = db
            .connect()
            .map_err(|e| ApiError::internal(format!("Failed to get connection: {}", e)))?;

        conn.execute("PRAGMA foreign_keys = ON", ())
            .await
            .map_err(|e| ApiError::internal(format!("Failed to enable foreign keys: {}", e)))?;

        let client = Self {
            conn,
            write_lock: Mutex::new(()),
        };
        client.initialize_schema().await?;

        Ok(client)
    }

    /// Open an ephemeral in-memory database (tests, local development).
    pub async fn new_memory() -> ApiResult<Self> {
        Self::new_local(":memory:").await
    }

    /// Handle for one operation. Clones share the underlying connection.
    pub fn connection(&self) -> Connection {
        self.conn.clone()
    }

    /// Serializes transactional multi-row writes.
    pub async fn write_guard(&self) -> MutexGuard<'_, ()> {
        self.write_lock.lock().await
    }

    async fn initialize_schema(&self) -> ApiResult<()> {
        let conn = self.connection();

        // Users table
        conn.execute(
            "CREATE TABLE IF NOT EXISTS users (
                user_id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_uuid TEXT UNIQUE NOT NULL,
                email TEXT UNIQUE NOT NULL COLLATE NOCASE,
                hashed_password TEXT NOT NULL,
                is_active INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
            (),
        )
        .await
        .map_err(|e| ApiError::internal(format!("Failed to create users table: {}", e)))?;

        // Projects table; (user_id, project_code) is the tenant-facing key
        conn.execute(
            "CREATE TABLE IF NOT EXISTS projects (
                project_id INTEGER PRIMARY KEY AUTOINCREMENT,
                project_uuid TEXT UNIQUE NOT NULL,
                user_id INTEGER NOT NULL,
                project_code INTEGER NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                FOREIGN KEY (user_id) REFERENCES users(user_id),
                UNIQUE (user_id, project_code)
            )",
            (),
        )
        .await
        .map_err(|e| ApiError::internal(format!("Failed to create projects table: {}", e)))?;

        // Assets table
        conn.execute(
            "CREATE TABLE IF NOT EXISTS assets (
                asset_id INTEGER PRIMARY KEY AUTOINCREMENT,
                asset_project_id INTEGER NOT NULL,
                asset_type TEXT NOT NULL,
                asset_name TEXT NOT NULL,
                asset_size INTEGER NOT NULL,
                created_at TEXT NOT NULL,
                FOREIGN KEY (asset_project_id) REFERENCES projects(project_id) ON DELETE CASCADE,
                UNIQUE (asset_project_id, asset_name)
            )",
            (),
        )
        .await
        .map_err(|e| ApiError::internal(format!("Failed to create assets table: {}", e)))?;

        // Chunks table; chunk_metadata is a JSON object
        conn.execute(
            "CREATE TABLE IF NOT EXISTS chunks (
                chunk_id INTEGER PRIMARY KEY AUTOINCREMENT,
                chunk_text TEXT NOT NULL,
                chunk_metadata TEXT NOT NULL DEFAULT '{}',
                chunk_order INTEGER NOT NULL,
                chunk_project_id INTEGER NOT NULL,
                chunk_asset_id INTEGER NOT NULL,
                FOREIGN KEY (chunk_project_id) REFERENCES projects(project_id) ON DELETE CASCADE,
                FOREIGN KEY (chunk_asset_id) REFERENCES assets(asset_id) ON DELETE CASCADE
            )",
            (),
        )
        .await
        .map_err(|e| ApiError::internal(format!("Failed to create chunks table: {}", e)))?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_chunks_project ON chunks(chunk_project_id)",
            (),
        )
        .await
        .map_err(|e| ApiError::internal(format!("Failed to create chunks index: {}", e)))?;

        // Query logs table (append-only)
        conn.execute(
            "CREATE TABLE IF NOT EXISTS query_logs (
                log_id INTEGER PRIMARY KEY AUTOINCREMENT,
                log_uuid TEXT UNIQUE NOT NULL,
                user_id INTEGER NOT NULL,
                question TEXT NOT NULL,
                llm_response TEXT NOT NULL,
                response_time_ms REAL NOT NULL,
                created_at TEXT NOT NULL,
                FOREIGN KEY (user_id) REFERENCES users(user_id)
            )",
            (),
        )
        .await
        .map_err(|e| ApiError::internal(format!("Failed to create query_logs table: {}", e)))?;

        Ok(())
    }
}

/// Whether a libsql error is a unique-constraint violation. Used by the
/// stores to translate duplicate keys into taxonomy codes.
pub(crate) fn is_unique_violation(err: &libsql::Error) -> bool {
    err.to_string().contains("UNIQUE constraint failed")
}

/// Current timestamp in the wire format used by every table.
pub(crate) fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_schema_initializes_twice() {
        let client = DbClient::new_memory().await.unwrap();
        // Re-running against the same handle must be a no-op.
        client.initialize_schema().await.unwrap();
        let conn = client.connection();
        let mut rows = conn
            .query(
                "SELECT name FROM sqlite_master WHERE type = 'table' AND name = 'chunks'",
                (),
            )
            .await
            .unwrap();
        assert!(rows.next().await.unwrap().is_some());
    }
}
