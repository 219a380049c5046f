//! Qdrant-backed vector store.
//!
//! Distance is fixed at collection creation. Payloads store `text` plus a
//! nested `metadata` object, so targeted deletion filters on
//! `metadata.asset_id` / `metadata.project_id` / `metadata.chunk_id`.

use async_trait::async_trait;
use qdrant_client::qdrant::value::Kind;
use qdrant_client::qdrant::{
    Condition, CreateCollectionBuilder, DeletePointsBuilder, Distance, Filter, PointStruct,
    PointsIdsList, SearchPointsBuilder, UpsertPointsBuilder, VectorParamsBuilder,
};
use qdrant_client::{Payload, Qdrant};
use serde_json::{json, Value};

use crate::errors::{ApiError, ApiResult, ErrorCode};
use crate::utils::config::DistanceMethod;
use crate::vectordb::{CollectionInfo, RetrievedDocument, VectorFilter, VectorStore};

pub struct QdrantStore {
    client: Qdrant,
    distance: Distance,
}

impl QdrantStore {
    pub fn new(url: &str, distance: DistanceMethod) -> ApiResult<Self> {
        let client = Qdrant::from_url(url)
            .build()
            .map_err(|e| ApiError::internal(format!("Failed to build qdrant client: {}", e)))?;

        let distance = match distance {
            DistanceMethod::Cosine => Distance::Cosine,
            DistanceMethod::Dot => Distance::Dot,
        };

        Ok(Self { client, distance })
    }

    fn filter_conditions(filter: &VectorFilter) -> Vec<Condition> {
        let mut conditions = Vec::new();
        if let Some(asset_id) = filter.asset_id {
            conditions.push(Condition::matches("metadata.asset_id", asset_id));
        }
        if let Some(project_id) = filter.project_id {
            conditions.push(Condition::matches("metadata.project_id", project_id));
        }
        if let Some(chunk_id) = filter.chunk_id {
            conditions.push(Condition::matches("metadata.chunk_id", chunk_id));
        }
        conditions
    }
}

#[async_trait]
impl VectorStore for QdrantStore {
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

        tracing::info!(collection = name, "creating qdrant collection");
        self.client
            .create_collection(
                CreateCollectionBuilder::new(name)
                    .vectors_config(VectorParamsBuilder::new(embedding_size, self.distance)),
            )
            .await
            .map_err(|e| {
                tracing::error!(collection = name, %e, "create_collection failed");
                ApiError::new(ErrorCode::VectordbConnectionFailed)
            })?;

        Ok(true)
    }

    async fn collection_exists(&self, name: &str) -> ApiResult<bool> {
        self.client.collection_exists(name).await.map_err(|e| {
            tracing::error!(collection = name, %e, "collection_exists failed");
            ApiError::new(ErrorCode::VectordbConnectionFailed)
        })
    }

    async fn collection_info(&self, name: &str) -> ApiResult<Option<CollectionInfo>> {
        if !self.collection_exists(name).await? {
            return Ok(None);
        }

        let response = self.client.collection_info(name).await.map_err(|e| {
            tracing::error!(collection = name, %e, "collection_info failed");
            ApiError::new(ErrorCode::VectordbConnectionFailed)
        })?;

        Ok(response.result.map(|info| CollectionInfo {
            vectors_count: info.vectors_count.unwrap_or(0),
            points_count: info.points_count.unwrap_or(0),
            segments_count: info.segments_count,
            status: format!("{:?}", info.status()).to_lowercase(),
        }))
    }

    async fn delete_collection(&self, name: &str) -> ApiResult<()> {
        if !self.collection_exists(name).await? {
            return Ok(());
        }

        tracing::info!(collection = name, "deleting qdrant collection");
        self.client.delete_collection(name).await.map_err(|e| {
            tracing::error!(collection = name, %e, "delete_collection failed");
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

        for start in (0..texts.len()).step_by(batch_size.max(1)) {
            let end = (start + batch_size.max(1)).min(texts.len());

            let points: Vec<PointStruct> = (start..end)
                .map(|i| {
                    let payload = Payload::try_from(json!({
                        "text": texts[i],
                        "metadata": metadata[i],
                    }))
                    .unwrap_or_default();

                    PointStruct::new(record_ids[i] as u64, vectors[i].clone(), payload)
                })
                .collect();

            self.client
                .upsert_points(UpsertPointsBuilder::new(name, points).wait(true))
                .await
                .map_err(|e| {
                    tracing::error!(collection = name, %e, "batch upsert failed");
                    ApiError::new(ErrorCode::VectordbInsertFailed)
                })?;
        }

        Ok(())
    }

    async fn search_by_vector(
        &self,
        name: &str,
        vector: &[f32],
        limit: u64,
    ) -> ApiResult<Vec<RetrievedDocument>> {
        let response = self
            .client
            .search_points(
                SearchPointsBuilder::new(name, vector.to_vec(), limit).with_payload(true),
            )
            .await
            .map_err(|e| {
                tracing::error!(collection = name, %e, "search failed");
                ApiError::new(ErrorCode::VectordbSearchFailed)
            })?;

        Ok(response
            .result
            .into_iter()
            .map(|point| {
                let text = point
                    .payload
                    .get("text")
                    .and_then(|value| match &value.kind {
                        Some(Kind::StringValue(s)) => Some(s.clone()),
                        _ => None,
                    })
                    .unwrap_or_default();

                RetrievedDocument {
                    text,
                    score: point.score,
                }
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

        let points = PointsIdsList {
            ids: ids.iter().map(|&id| (id as u64).into()).collect(),
        };

        self.client
            .delete_points(DeletePointsBuilder::new(name).points(points).wait(true))
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

        let conditions = Self::filter_conditions(filter);

        self.client
            .delete_points(
                DeletePointsBuilder::new(name)
                    .points(Filter::must(conditions))
                    .wait(true),
            )
            .await
            .map_err(|e| {
                tracing::error!(collection = name, %e, "delete_by_filter failed");
                ApiError::new(ErrorCode::VectordbConnectionFailed)
            })?;

        Ok(())
    }
}
