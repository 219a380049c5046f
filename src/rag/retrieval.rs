//! Retrieval service: vector indexing and RAG answering.
//!
//! The read pipeline: push chunk pages into the project's collection,
//! search it by embedded query, and answer questions by conditioning the
//! generation model on retrieved context. Every operation re-verifies
//! project ownership.

use std::sync::Arc;
use std::time::Instant;

use serde_json::{json, Value};

use crate::db::{Chunk, ChunkStore, Project, ProjectStore, QueryLogStore};
use crate::errors::{ApiError, ApiResult, ErrorCode};
use crate::llm::{ChatMessage, EmbedKind, Provider, TemplateRegistry};
use crate::utils::config::Settings;
use crate::vectordb::{collection_name, CollectionInfo, RetrievedDocument, VectorFilter, VectorStore};
use crate::AppState;

/// Chunks are read and embedded in pages of this size.
const INDEX_PAGE_SIZE: i64 = 50;

/// Vector upsert batch size.
const VECTOR_INSERT_BATCH: usize = 50;

/// Result of one answered question.
#[derive(Debug)]
pub struct AnswerOutcome {
    pub answer: String,
    pub full_prompt: String,
    pub chat_history: Vec<ChatMessage>,
    pub response_time_ms: f64,
}

pub struct RetrievalService {
    settings: Arc<Settings>,
    projects: Arc<ProjectStore>,
    chunks: Arc<ChunkStore>,
    query_logs: Arc<QueryLogStore>,
    embedding_provider: Arc<dyn Provider>,
    generation_provider: Arc<dyn Provider>,
    vector_store: Option<Arc<dyn VectorStore>>,
    templates: Arc<TemplateRegistry>,
}

impl RetrievalService {
    pub fn from_state(state: &AppState) -> Self {
        Self {
            settings: state.settings.clone(),
            projects: state.project_store.clone(),
            chunks: state.chunk_store.clone(),
            query_logs: state.query_log_store.clone(),
            embedding_provider: state.embedding_provider.clone(),
            generation_provider: state.generation_provider.clone(),
            vector_store: state.vector_store.clone(),
            templates: state.templates.clone(),
        }
    }

    /// Collection name for a project under the configured embedding size.
    pub fn collection_for(&self, project: &Project) -> String {
        collection_name(self.settings.embedding_model_size, project.project_id)
    }

    fn vector_store(&self) -> ApiResult<&Arc<dyn VectorStore>> {
        self.vector_store
            .as_ref()
            .ok_or(ApiError::new(ErrorCode::NlpServiceUnavailable))
    }

    async fn resolve_project(&self, user_id: i64, project_code: i64) -> ApiResult<Project> {
        // Missing and foreign projects are indistinguishable on purpose
        self.projects
            .get_by_code_for_user(user_id, project_code)
            .await?
            .ok_or(ApiError::new(ErrorCode::ProjectNotFound))
    }

    // ========================================================================
    // Index push
    // ========================================================================

    /// Embed and upsert all chunks of a project, paging through them in
    /// stable order. Returns the number of indexed items. A batch failure
    /// aborts and leaves the partially populated collection in place;
    /// retrying with `do_reset = 1` is the recovery path.
    pub async fn index_push(
        &self,
        user_id: i64,
        project_code: i64,
        do_reset: bool,
    ) -> ApiResult<usize> {
        let store = self.vector_store()?.clone();
        let project = self.resolve_project(user_id, project_code).await?;
        let collection = self.collection_for(&project);

        store
            .create_collection(&collection, self.settings.embedding_model_size, do_reset)
            .await?;

        let total = self.chunks.total_count(project.project_id).await?;
        tracing::info!(project_code, total, %collection, "starting index push");

        let mut inserted = 0usize;
        let mut page = 1i64;

        loop {
            let page_chunks = self
                .chunks
                .get_page(project.project_id, page, INDEX_PAGE_SIZE)
                .await?;

            if page_chunks.is_empty() {
                break;
            }
            page += 1;

            // Skip chunks whose text is empty; they carry no signal
            let valid: Vec<&Chunk> = page_chunks
                .iter()
                .filter(|chunk| !chunk.chunk_text.trim().is_empty())
                .collect();

            if valid.is_empty() {
                continue;
            }

            let texts: Vec<String> = valid.iter().map(|c| c.chunk_text.clone()).collect();
            let record_ids: Vec<i64> = valid.iter().map(|c| c.chunk_id).collect();
            let metadata: Vec<Value> = valid
                .iter()
                .map(|c| index_metadata(c, project.project_id))
                .collect();

            let vectors = self
                .embedding_provider
                .embed(&texts, EmbedKind::Document)
                .await?;

            if vectors.len() != texts.len() {
                tracing::error!(project_code, "embedding batch failed during index push");
                return Err(ApiError::new(ErrorCode::VectordbInsertFailed));
            }

            store
                .insert_many(
                    &collection,
                    &texts,
                    &vectors,
                    &metadata,
                    &record_ids,
                    VECTOR_INSERT_BATCH,
                )
                .await?;

            inserted += valid.len();
            tracing::debug!(project_code, inserted, total, "index push progress");
        }

        tracing::info!(project_code, inserted, "index push complete");
        Ok(inserted)
    }

    // ========================================================================
    // Collection info & lifecycle
    // ========================================================================

    /// Collection statistics for the info endpoint.
    pub async fn index_info(
        &self,
        user_id: i64,
        project_code: i64,
    ) -> ApiResult<(String, Option<CollectionInfo>)> {
        let store = self.vector_store()?.clone();
        let project = self.resolve_project(user_id, project_code).await?;
        let collection = self.collection_for(&project);

        let info = store.collection_info(&collection).await?;
        Ok((collection, info))
    }

    /// Whether the project's collection exists. Unavailable backends
    /// read as not indexed.
    pub async fn is_indexed(&self, project: &Project) -> bool {
        let Some(store) = &self.vector_store else {
            return false;
        };

        store
            .collection_exists(&self.collection_for(project))
            .await
            .unwrap_or(false)
    }

    /// Collection statistics without an ownership lookup (callers already
    /// hold the project). `None` when missing or unavailable.
    pub async fn collection_stats(&self, project: &Project) -> Option<CollectionInfo> {
        let store = self.vector_store.as_ref()?;
        store
            .collection_info(&self.collection_for(project))
            .await
            .ok()
            .flatten()
    }

    /// Best-effort collection drop for reset and project deletion paths.
    pub async fn drop_collection(&self, project: &Project) {
        let Some(store) = &self.vector_store else {
            return;
        };

        let collection = self.collection_for(project);
        if let Err(err) = store.delete_collection(&collection).await {
            tracing::warn!(%collection, %err, "failed to drop collection, continuing");
        }
    }

    /// Best-effort vector deletion for one asset: filtered delete first,
    /// explicit chunk-id enumeration as the fallback.
    pub async fn delete_asset_vectors(&self, project: &Project, asset_id: i64, chunk_ids: &[i64]) {
        let Some(store) = &self.vector_store else {
            return;
        };

        let collection = self.collection_for(project);
        match store
            .delete_by_filter(&collection, &VectorFilter::by_asset(asset_id))
            .await
        {
            Ok(()) => {}
            Err(err) => {
                tracing::warn!(%collection, asset_id, %err, "filtered delete failed, trying ids");
                if let Err(err) = store.delete_by_ids(&collection, chunk_ids).await {
                    tracing::warn!(%collection, asset_id, %err, "id-list delete failed");
                }
            }
        }
    }

    // ========================================================================
    // Search & answer
    // ========================================================================

    /// Top-`limit` chunks for a query text.
    pub async fn search(
        &self,
        user_id: i64,
        project_code: i64,
        text: &str,
        limit: usize,
    ) -> ApiResult<Vec<RetrievedDocument>> {
        let project = self.resolve_project(user_id, project_code).await?;
        self.search_project(&project, text, limit).await
    }

    async fn search_project(
        &self,
        project: &Project,
        text: &str,
        limit: usize,
    ) -> ApiResult<Vec<RetrievedDocument>> {
        let store = self.vector_store()?.clone();
        let collection = self.collection_for(project);

        let vectors = self
            .embedding_provider
            .embed(&[text.to_string()], EmbedKind::Query)
            .await?;

        let Some(query_vector) = vectors.first() else {
            tracing::error!(%collection, "query embedding failed");
            return Err(ApiError::new(ErrorCode::VectordbSearchFailed));
        };

        store
            .search_by_vector(&collection, query_vector, limit as u64)
            .await
    }

    /// Answer a question from retrieved context, logging the interaction.
    pub async fn answer(
        &self,
        user_id: i64,
        project_code: i64,
        question: &str,
        limit: usize,
    ) -> ApiResult<AnswerOutcome> {
        let project = self.resolve_project(user_id, project_code).await?;

        let started = Instant::now();

        let retrieved = self.search_project(&project, question, limit).await?;
        if retrieved.is_empty() {
            return Err(ApiError::new(ErrorCode::NlpNoRelevantContent));
        }

        let system_prompt = self
            .templates
            .get("rag", "system_prompt", &[])
            .ok_or_else(|| ApiError::internal("missing rag.system_prompt template"))?;

        let documents_prompt = retrieved
            .iter()
            .enumerate()
            .filter_map(|(idx, doc)| {
                let doc_num = (idx + 1).to_string();
                let chunk_text = self.generation_provider.normalize_text(&doc.text);
                self.templates.get(
                    "rag",
                    "document_prompt",
                    &[
                        ("doc_num", doc_num.as_str()),
                        ("chunk_text", chunk_text.as_str()),
                    ],
                )
            })
            .collect::<Vec<_>>()
            .join("\n");

        let footer_prompt = self
            .templates
            .get("rag", "footer_prompt", &[("query", question)])
            .ok_or_else(|| ApiError::internal("missing rag.footer_prompt template"))?;

        let chat_history = vec![ChatMessage {
            role: self.generation_provider.system_role().to_string(),
            content: system_prompt,
        }];

        let full_prompt = format!("{}\n\n{}", documents_prompt, footer_prompt);

        let answer = self
            .generation_provider
            .generate(&full_prompt, &chat_history)
            .await?;

        if answer.trim().is_empty() {
            return Err(ApiError::new(ErrorCode::NlpGenerationFailed));
        }

        let response_time_ms = started.elapsed().as_secs_f64() * 1000.0;

        self.query_logs
            .insert(user_id, question, &answer, response_time_ms)
            .await?;

        Ok(AnswerOutcome {
            answer,
            full_prompt,
            chat_history,
            response_time_ms,
        })
    }
}

/// Vector payload metadata: the chunk's own metadata plus the ids that
/// make filtered deletion possible.
fn index_metadata(chunk: &Chunk, project_id: i64) -> Value {
    let mut metadata = chunk
        .chunk_metadata
        .as_object()
        .cloned()
        .unwrap_or_default();
    metadata.insert("asset_id".to_string(), json!(chunk.chunk_asset_id));
    metadata.insert("project_id".to_string(), json!(project_id));
    metadata.insert("chunk_id".to_string(), json!(chunk.chunk_id));
    Value::Object(metadata)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_metadata_adds_filter_keys() {
        let chunk = Chunk {
            chunk_id: 11,
            chunk_text: "hello".to_string(),
            chunk_metadata: json!({ "source": "a.txt", "chunk_index": 0 }),
            chunk_order: 1,
            chunk_project_id: 3,
            chunk_asset_id: 7,
        };

        let metadata = index_metadata(&chunk, 3);

        assert_eq!(metadata["source"], "a.txt");
        assert_eq!(metadata["asset_id"], 7);
        assert_eq!(metadata["project_id"], 3);
        assert_eq!(metadata["chunk_id"], 11);
    }
}
