//! Vector index abstraction.
//!
//! A [`VectorStore`] is a uniform interface over a vector backend:
//! collection lifecycle, batch upsert, top-k search and targeted
//! deletion. Two backends ship behind feature flags (both on by
//! default): Qdrant and Postgres+pgvector. The factory selects one from
//! configuration and returns `None` when the backend cannot be built,
//! which dependent endpoints surface as 503.

#[cfg(feature = "pgvector")]
pub mod pgvector;
#[cfg(feature = "qdrant")]
pub mod qdrant;

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::errors::ApiResult;
use crate::utils::config::Settings;

/// Deterministic collection name for a project. The embedding size is
/// part of the name so a dimensionality change starts a fresh namespace.
pub fn collection_name(embedding_size: u64, project_id: i64) -> String {
    format!("collection_{}_{}", embedding_size, project_id)
}

/// Aggregate statistics about one collection.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CollectionInfo {
    pub vectors_count: u64,
    pub points_count: u64,
    pub segments_count: u64,
    pub status: String,
}

/// One search hit, ordered by descending similarity.
#[derive(Debug, Clone, Serialize)]
pub struct RetrievedDocument {
    pub text: String,
    pub score: f32,
}

/// Payload-metadata filter for targeted deletion. Set fields combine
/// with AND.
#[derive(Debug, Clone, Default)]
pub struct VectorFilter {
    pub asset_id: Option<i64>,
    pub project_id: Option<i64>,
    pub chunk_id: Option<i64>,
}

impl VectorFilter {
    pub fn by_asset(asset_id: i64) -> Self {
        Self {
            asset_id: Some(asset_id),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.asset_id.is_none() && self.project_id.is_none() && self.chunk_id.is_none()
    }
}

/// Uniform interface over a vector backend.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Idempotently create a collection; with `reset` the existing one is
    /// dropped first. Returns whether a new collection was created.
    async fn create_collection(
        &self,
        name: &str,
        embedding_size: u64,
        reset: bool,
    ) -> ApiResult<bool>;

    async fn collection_exists(&self, name: &str) -> ApiResult<bool>;

    /// Statistics for an existing collection; `None` when it is missing.
    async fn collection_info(&self, name: &str) -> ApiResult<Option<CollectionInfo>>;

    async fn delete_collection(&self, name: &str) -> ApiResult<()>;

    /// Upsert records in batches. `texts`, `vectors`, `metadata` and
    /// `record_ids` must have equal lengths; a mismatch is a programmer
    /// error and fails fast. An unknown collection is a recoverable
    /// error.
    async fn insert_many(
        &self,
        name: &str,
        texts: &[String],
        vectors: &[Vec<f32>],
        metadata: &[Value],
        record_ids: &[i64],
        batch_size: usize,
    ) -> ApiResult<()>;

    /// Top-`limit` records by descending similarity to `vector`.
    async fn search_by_vector(
        &self,
        name: &str,
        vector: &[f32],
        limit: u64,
    ) -> ApiResult<Vec<RetrievedDocument>>;

    async fn delete_by_ids(&self, name: &str, ids: &[i64]) -> ApiResult<()>;

    async fn delete_by_filter(&self, name: &str, filter: &VectorFilter) -> ApiResult<()>;
}

/// Build the vector store selected by `VECTOR_DB_BACKEND`, or `None`
/// when the backend is unknown, disabled at compile time, or fails to
/// construct.
pub fn create_vector_store(settings: &Settings) -> Option<Arc<dyn VectorStore>> {
    match settings.vector_db_backend.as_str() {
        #[cfg(feature = "qdrant")]
        "qdrant" => match qdrant::QdrantStore::new(
            &settings.vector_db_path,
            settings.vector_db_distance_method,
        ) {
            Ok(store) => Some(Arc::new(store)),
            Err(err) => {
                tracing::error!(%err, "failed to build qdrant client");
                None
            }
        },
        #[cfg(feature = "pgvector")]
        "pgvector" => match pgvector::PgVectorStore::new(
            &settings.vector_db_path,
            settings.vector_db_distance_method,
            settings.vector_db_pgvec_index_threshold,
        ) {
            Ok(store) => Some(Arc::new(store)),
            Err(err) => {
                tracing::error!(%err, "failed to build pgvector pool");
                None
            }
        },
        other => {
            tracing::warn!(backend = other, "unknown or disabled vector backend");
            None
        }
    }
}
