//! Postgres + pgvector vector store.
//!
//! Each collection is its own table `{id, text, embedding vector(dim),
//! metadata jsonb, chunk_id}`. After an insert batch, once the row count
//! crosses the configured threshold, an HNSW index is created with the
//! configured distance operator class; explicit reset drops and rebuilds
//! it.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};

use crate::errors::{ApiError, ApiResult, ErrorCode};
use crate::utils::config::DistanceMethod;
use crate::vectordb::{CollectionInfo, RetrievedDocument, VectorFilter, VectorStore};

pub struct PgVectorStore {
    pool: PgPool,
    distance: DistanceMethod,
    index_threshold: i64,
}

impl PgVectorStore {
    /// Build a lazily-connected pool; the first query opens the
    /// connection, so a missing server degrades at use time, not startup.
    pub fn new(
        connection_string: &str,
        distance: DistanceMethod,
        index_threshold: i64,
    ) -> ApiResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect_lazy(connection_string)
            .map_err(|e| ApiError::internal(format!("Invalid postgres connection: {}", e)))?;

        Ok(Self {
            pool,
            distance,
            index_threshold,
        })
    }

    fn index_name(collection: &str) -> String {
        format!("{}_vector_idx", collection)
    }

    fn operator_class(&self) -> &'static str {
        match self.distance {
            DistanceMethod::Cosine => "vector_cosine_ops",
            DistanceMethod::Dot => "vector_ip_ops",
        }
    }

    fn vector_literal(vector: &[f32]) -> String {
        let parts: Vec<String> = vector.iter().map(|v| v.to_string()).collect();
        format!("[{}]", parts.join(","))
    }

    async fn row_count(&self, name: &str) -> ApiResult<i64> {
        let row = sqlx::query(&format!("SELECT COUNT(*) FROM {}", name))
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!(collection = name, %e, "row count failed");
                ApiError::new(ErrorCode::VectordbConnectionFailed)
            })?;

        Ok(row.get::<i64, _>(0))
    }

    async fn index_exists(&self, name: &str) -> ApiResult<bool> {
        let row = sqlx::query(
            "SELECT 1 FROM pg_indexes WHERE tablename = $1 AND indexname = $2",
        )
        .bind(name)
        .bind(Self::index_name(name))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(collection = name, %e, "index check failed");
            ApiError::new(ErrorCode::VectordbConnectionFailed)
        })?;

        Ok(row.is_some())
    }

    /// Create the ANN index once the table is big enough to benefit.
    async fn maybe_create_index(&self, name: &str) -> ApiResult<()> {
        if self.index_exists(name).await? {
            return Ok(());
        }

        if self.row_count(name).await? < self.index_threshold {
            return Ok(());
        }

        tracing::info!(collection = name, "creating hnsw index");
        sqlx::query(&format!(
            "CREATE INDEX {} ON {} USING hnsw (embedding {})",
            Self::index_name(name),
            name,
            self.operator_class()
        ))
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(collection = name, %e, "index creation failed");
            ApiError::new(ErrorCode::VectordbConnectionFailed)
        })?;

        Ok(())
    }

    async fn drop_index(&self, name: &str) -> ApiResult<()> {
        sqlx::query(&format!("DROP INDEX IF EXISTS {}", Self::index_name(name)))
            .execute(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!(collection = name, %e, "index drop failed");
                ApiError::new(ErrorCode::VectordbConnectionFailed)
            })?;

        Ok(())
    }
}

#[async_trait]
impl VectorStore for PgVectorStore {
    async fn create_collection(
        &self,
        name: &str,
        embedding_size: u64,
        reset: bool,
    ) -> ApiResult<bool> {
        if reset {
            self.delete_collection(name).await?;
        }

        if self.collection_exists(name).await? {
            return Ok(false);
        }

        tracing::info!(collection = name, "creating pgvector collection");

        sqlx::query("CREATE EXTENSION IF NOT EXISTS vector")
            .execute(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!(%e, "vector extension unavailable");
                ApiError::new(ErrorCode::VectordbConnectionFailed)
            })?;

        sqlx::query(&format!(
            "CREATE TABLE {} (
                id bigserial PRIMARY KEY,
                text text,
                embedding vector({}),
                metadata jsonb DEFAULT '{{}}',
                chunk_id integer
            )",
            name, embedding_size
        ))
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(collection = name, %e, "create table failed");
            ApiError::new(ErrorCode::VectordbConnectionFailed)
        })?;

        Ok(true)
    }

    async fn collection_exists(&self, name: &str) -> ApiResult<bool> {
        let row = sqlx::query("SELECT 1 FROM pg_tables WHERE tablename = $1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!(collection = name, %e, "table check failed");
                ApiError::new(ErrorCode::VectordbConnectionFailed)
            })?;

        Ok(row.is_some())
    }

    async fn collection_info(&self, name: &str) -> ApiResult<Option<CollectionInfo>> {
        if !self.collection_exists(name).await? {
            return Ok(None);
        }

        let count = self.row_count(name).await? as u64;
        let indexed = self.index_exists(name).await?;

        Ok(Some(CollectionInfo {
            vectors_count: count,
            points_count: count,
            segments_count: 1,
            status: if indexed { "indexed" } else { "plain" }.to_string(),
        }))
    }

    async fn delete_collection(&self, name: &str) -> ApiResult<()> {
        tracing::info!(collection = name, "dropping pgvector collection");

        self.drop_index(name).await?;

        sqlx::query(&format!("DROP TABLE IF EXISTS {}", name))
            .execute(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!(collection = name, %e, "drop table failed");
                ApiError::new(ErrorCode::VectordbConnectionFailed)
            })?;

        Ok(())
    }

    async fn insert_many(
        &self,
        name: &str,
        texts: &[String],
        vectors: &[Vec<f32>],
        metadata: &[Value],
        record_ids: &[i64],
        batch_size: usize,
    ) -> ApiResult<()> {
        if texts.len() != vectors.len()
            || texts.len() != metadata.len()
            || texts.len() != record_ids.len()
        {
            return Err(ApiError::internal(format!(
                "insert_many length mismatch: {} texts, {} vectors, {} metadata, {} ids",
                texts.len(),
                vectors.len(),
                metadata.len(),
                record_ids.len()
            )));
        }

        if !self.collection_exists(name).await? {
            return Err(ApiError::new(ErrorCode::VectordbCollectionNotFound));
        }

        let insert_sql = format!(
            "INSERT INTO {} (text, embedding, metadata, chunk_id)
             VALUES ($1, $2::vector, $3::jsonb, $4)",
            name
        );

        for start in (0..texts.len()).step_by(batch_size.max(1)) {
            let end = (start + batch_size.max(1)).min(texts.len());

            let mut tx = self.pool.begin().await.map_err(|e| {
                tracing::error!(collection = name, %e, "begin failed");
                ApiError::new(ErrorCode::VectordbInsertFailed)
            })?;

            for i in start..end {
                let metadata_json = serde_json::to_string(&metadata[i])
                    .unwrap_or_else(|_| "{}".to_string());

                sqlx::query(&insert_sql)
                    .bind(&texts[i])
                    .bind(Self::vector_literal(&vectors[i]))
                    .bind(metadata_json)
                    .bind(record_ids[i])
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| {
                        tracing::error!(collection = name, %e, "batch insert failed");
                        ApiError::new(ErrorCode::VectordbInsertFailed)
                    })?;
            }

            tx.commit().await.map_err(|e| {
                tracing::error!(collection = name, %e, "commit failed");
                ApiError::new(ErrorCode::VectordbInsertFailed)
            })?;
        }

        self.maybe_create_index(name).await?;

        Ok(())
    }

    async fn search_by_vector(
        &self,
        name: &str,
        vector: &[f32],
        limit: u64,
    ) -> ApiResult<Vec<RetrievedDocument>> {
        if !self.collection_exists(name).await? {
            return Err(ApiError::new(ErrorCode::VectordbCollectionNotFound));
        }

        let score_expr = match self.distance {
            DistanceMethod::Cosine => "1 - (embedding <=> $1::vector)",
            DistanceMethod::Dot => "-(embedding <#> $1::vector)",
        };
        let order_op = match self.distance {
            DistanceMethod::Cosine => "<=>",
            DistanceMethod::Dot => "<#>",
        };

        let search_sql = format!(
            "SELECT text, {} AS score FROM {}
             ORDER BY embedding {} $1::vector
             LIMIT $2",
            score_expr, name, order_op
        );

        let rows = sqlx::query(&search_sql)
            .bind(Self::vector_literal(vector))
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!(collection = name, %e, "search failed");
                ApiError::new(ErrorCode::VectordbSearchFailed)
            })?;

        Ok(rows
            .into_iter()
            .map(|row| RetrievedDocument {
                text: row.get::<String, _>(0),
                score: row.get::<f64, _>(1) as f32,
            })
            .collect())
    }

    async fn delete_by_ids(&self, name: &str, ids: &[i64]) -> ApiResult<()> {
        if ids.is_empty() {
            return Ok(());
        }

        if !self.collection_exists(name).await? {
            return Err(ApiError::new(ErrorCode::VectordbCollectionNotFound));
        }

        sqlx::query(&format!(
            "DELETE FROM {} WHERE chunk_id = ANY($1)",
            name
        ))
        .bind(ids)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(collection = name, %e, "delete_by_ids failed");
            ApiError::new(ErrorCode::VectordbConnectionFailed)
        })?;

        Ok(())
    }

    async fn delete_by_filter(&self, name: &str, filter: &VectorFilter) -> ApiResult<()> {
        if filter.is_empty() {
            return Err(ApiError::internal("delete_by_filter requires a condition"));
        }

        if !self.collection_exists(name).await? {
            return Err(ApiError::new(ErrorCode::VectordbCollectionNotFound));
        }

        let mut clauses = Vec::new();
        let mut values = Vec::new();
        if let Some(asset_id) = filter.asset_id {
            values.push(asset_id.to_string());
            clauses.push(format!("metadata->>'asset_id' = ${}", values.len()));
        }
        if let Some(project_id) = filter.project_id {
            values.push(project_id.to_string());
            clauses.push(format!("metadata->>'project_id' = ${}", values.len()));
        }
        if let Some(chunk_id) = filter.chunk_id {
            values.push(chunk_id.to_string());
            clauses.push(format!("metadata->>'chunk_id' = ${}", values.len()));
        }

        let delete_sql = format!(
            "DELETE FROM {} WHERE {}",
            name,
            clauses.join(" AND ")
        );

        let mut query = sqlx::query(&delete_sql);
        for value in &values {
            query = query.bind(value);
        }

        query.execute(&self.pool).await.map_err(|e| {
            tracing::error!(collection = name, %e, "delete_by_filter failed");
            ApiError::new(ErrorCode::VectordbConnectionFailed)
        })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vector_literal() {
        assert_eq!(PgVectorStore::vector_literal(&[1.0, 0.5]), "[1,0.5]");
        assert_eq!(PgVectorStore::vector_literal(&[]), "[]");
    }

    #[test]
    fn test_index_name() {
        assert_eq!(
            PgVectorStore::index_name("collection_1536_3"),
            "collection_1536_3_vector_idx"
        );
    }
}
