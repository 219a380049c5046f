//! Chunk store.
//!
//! Chunks are the retrieval unit: a bounded slice of source text plus a
//! JSON metadata object. `chunk_id` doubles as the vector-index record id,
//! and `chunk_order` is 1-based and contiguous within one processing run
//! of one asset.

use std::sync::Arc;

use libsql::Row;
use serde::Serialize;
use serde_json::Value;

use crate::db::client::DbClient;
use crate::errors::{ApiError, ApiResult};

/// A chunk row ready for insertion (id not yet assigned).
#[derive(Debug, Clone)]
pub struct NewChunk {
    pub chunk_text: String,
    pub chunk_metadata: Value,
    pub chunk_order: i64,
    pub chunk_project_id: i64,
    pub chunk_asset_id: i64,
}

/// A persisted chunk row.
#[derive(Debug, Clone, Serialize)]
pub struct Chunk {
    pub chunk_id: i64,
    pub chunk_text: String,
    pub chunk_metadata: Value,
    pub chunk_order: i64,
    pub chunk_project_id: i64,
    pub chunk_asset_id: i64,
}

fn row_to_chunk(row: &Row) -> ApiResult<Chunk> {
    let metadata_raw: String = row.get(2).map_err(ApiError::internal)?;
    Ok(Chunk {
        chunk_id: row.get(0).map_err(ApiError::internal)?,
        chunk_text: row.get(1).map_err(ApiError::internal)?,
        chunk_metadata: serde_json::from_str(&metadata_raw).unwrap_or(Value::Null),
        chunk_order: row.get(3).map_err(ApiError::internal)?,
        chunk_project_id: row.get(4).map_err(ApiError::internal)?,
        chunk_asset_id: row.get(5).map_err(ApiError::internal)?,
    })
}

const CHUNK_COLUMNS: &str =
    "chunk_id, chunk_text, chunk_metadata, chunk_order, chunk_project_id, chunk_asset_id";

pub struct ChunkStore {
    db: Arc<DbClient>,
}

impl ChunkStore {
    pub fn new(db: Arc<DbClient>) -> Self {
        Self { db }
    }

    /// Insert chunks in transactional batches; returns the inserted count.
    pub async fn insert_many(&self, chunks: &[NewChunk], batch_size: usize) -> ApiResult<usize> {
        if chunks.is_empty() {
            return Ok(0);
        }

        let conn = self.db.connection();
        let mut inserted = 0usize;

        // One transactional writer at a time on the shared connection
        let _guard = self.db.write_guard().await;

        for batch in chunks.chunks(batch_size.max(1)) {
            let tx = conn
                .transaction()
                .await
                .map_err(|e| ApiError::internal(format!("Failed to begin transaction: {}", e)))?;

            for chunk in batch {
                let metadata_json = serde_json::to_string(&chunk.chunk_metadata)
                    .map_err(|e| ApiError::internal(format!("Invalid chunk metadata: {}", e)))?;

                tx.execute(
                    "INSERT INTO chunks
                     (chunk_text, chunk_metadata, chunk_order, chunk_project_id, chunk_asset_id)
                     VALUES (?, ?, ?, ?, ?)",
                    libsql::params![
                        chunk.chunk_text.clone(),
                        metadata_json,
                        chunk.chunk_order,
                        chunk.chunk_project_id,
                        chunk.chunk_asset_id
                    ],
                )
                .await
                .map_err(|e| ApiError::internal(format!("Failed to insert chunk: {}", e)))?;
            }

            tx.commit()
                .await
                .map_err(|e| ApiError::internal(format!("Failed to commit chunks: {}", e)))?;

            inserted += batch.len();
        }

        Ok(inserted)
    }

    /// One page of a project's chunks in stable `chunk_id` order.
    /// Pages are 1-based.
    pub async fn get_page(
        &self,
        project_id: i64,
        page: i64,
        page_size: i64,
    ) -> ApiResult<Vec<Chunk>> {
        let conn = self.db.connection();

        let mut rows = conn
            .query(
                &format!(
                    "SELECT {} FROM chunks WHERE chunk_project_id = ?
                     ORDER BY chunk_id LIMIT ? OFFSET ?",
                    CHUNK_COLUMNS
                ),
                libsql::params![project_id, page_size, (page.max(1) - 1) * page_size],
            )
            .await
            .map_err(|e| ApiError::internal(format!("Failed to page chunks: {}", e)))?;

        let mut chunks = Vec::new();
        while let Some(row) = rows.next().await.map_err(ApiError::internal)? {
            chunks.push(row_to_chunk(&row)?);
        }

        Ok(chunks)
    }

    pub async fn total_count(&self, project_id: i64) -> ApiResult<i64> {
        let conn = self.db.connection();

        let mut rows = conn
            .query(
                "SELECT COUNT(*) FROM chunks WHERE chunk_project_id = ?",
                libsql::params![project_id],
            )
            .await
            .map_err(|e| ApiError::internal(format!("Failed to count chunks: {}", e)))?;

        match rows.next().await.map_err(ApiError::internal)? {
            Some(row) => row.get(0).map_err(ApiError::internal),
            None => Ok(0),
        }
    }

    /// Chunk ids of one asset, for vector deletion fallback by id list.
    pub async fn ids_by_asset(&self, project_id: i64, asset_id: i64) -> ApiResult<Vec<i64>> {
        let conn = self.db.connection();

        let mut rows = conn
            .query(
                "SELECT chunk_id FROM chunks WHERE chunk_project_id = ? AND chunk_asset_id = ?",
                libsql::params![project_id, asset_id],
            )
            .await
            .map_err(|e| ApiError::internal(format!("Failed to query chunk ids: {}", e)))?;

        let mut ids = Vec::new();
        while let Some(row) = rows.next().await.map_err(ApiError::internal)? {
            ids.push(row.get(0).map_err(ApiError::internal)?);
        }

        Ok(ids)
    }

    pub async fn delete_by_project(&self, project_id: i64) -> ApiResult<u64> {
        let conn = self.db.connection();

        conn.execute(
            "DELETE FROM chunks WHERE chunk_project_id = ?",
            libsql::params![project_id],
        )
        .await
        .map_err(|e| ApiError::internal(format!("Failed to delete chunks: {}", e)))
    }

    pub async fn delete_by_asset(&self, project_id: i64, asset_id: i64) -> ApiResult<u64> {
        let conn = self.db.connection();

        conn.execute(
            "DELETE FROM chunks WHERE chunk_project_id = ? AND chunk_asset_id = ?",
            libsql::params![project_id, asset_id],
        )
        .await
        .map_err(|e| ApiError::internal(format!("Failed to delete chunks: {}", e)))
    }
}
