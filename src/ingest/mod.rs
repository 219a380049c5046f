//! Ingestion service: the write pipeline.
//!
//! Upload validates and streams a file to the project's directory and
//! records an Asset; process parses, chunks and persists Chunk rows with
//! per-file failure isolation; a single asset (and its chunks/vectors)
//! can be deleted again. Vector indexing is deliberately *not* part of
//! processing; it is a separate retrieval-side operation.

pub mod parser;

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use axum::body::Bytes;
use futures::{Stream, StreamExt};
use rand::distr::Alphanumeric;
use rand::Rng;
use tokio::io::AsyncWriteExt;

use crate::db::{Asset, AssetStore, ChunkStore, NewChunk, Project, ProjectStore, ASSET_TYPE_FILE};
use crate::errors::{ApiError, ApiResult, ErrorCode};
use crate::ingest::parser::{file_extension, FileParser};
use crate::llm::Provider;
use crate::rag::chunker::{Chunker, ChunkingMethod};
use crate::rag::retrieval::RetrievalService;
use crate::types::{FailedFile, ProcessRequest};
use crate::utils::config::Settings;
use crate::AppState;

/// Chunk rows are written in transactional batches of this size.
const CHUNK_INSERT_BATCH: usize = 100;

/// Length of the random filename prefix.
const RANDOM_KEY_LENGTH: usize = 12;

/// Outcome of one processing run.
#[derive(Debug)]
pub struct ProcessOutcome {
    pub inserted_chunks: usize,
    pub processed_files: usize,
    pub total_files: usize,
    pub failed_files: Vec<FailedFile>,
}

pub struct IngestionService {
    settings: Arc<Settings>,
    projects: Arc<ProjectStore>,
    assets: Arc<AssetStore>,
    chunks: Arc<ChunkStore>,
    embedding_provider: Arc<dyn Provider>,
    retrieval: RetrievalService,
}

impl IngestionService {
    pub fn from_state(state: &AppState) -> Self {
        Self {
            settings: state.settings.clone(),
            projects: state.project_store.clone(),
            assets: state.asset_store.clone(),
            chunks: state.chunk_store.clone(),
            embedding_provider: state.embedding_provider.clone(),
            retrieval: RetrievalService::from_state(state),
        }
    }

    /// Directory holding one project's uploads.
    pub fn project_dir(&self, project_id: i64) -> PathBuf {
        PathBuf::from(&self.settings.files_dir).join(project_id.to_string())
    }

    // ========================================================================
    // Upload
    // ========================================================================

    /// Validate and persist one uploaded file, recording its Asset row.
    /// The project is auto-created on first upload of a fresh code.
    pub async fn upload<S, E>(
        &self,
        user_id: i64,
        project_code: i64,
        original_name: &str,
        mut payload: S,
    ) -> ApiResult<(Project, Asset)>
    where
        S: Stream<Item = Result<Bytes, E>> + Unpin,
        E: std::fmt::Display,
    {
        let project = self.projects.get_or_create(user_id, project_code).await?;

        let extension = file_extension(original_name);
        if !self.settings.is_allowed_type(&extension) {
            return Err(ApiError::new(ErrorCode::FileTypeNotSupported));
        }

        let project_dir = self.project_dir(project.project_id);
        tokio::fs::create_dir_all(&project_dir)
            .await
            .map_err(|e| ApiError::internal(format!("Failed to create project dir: {}", e)))?;

        let (file_path, file_name) = generate_unique_filepath(&project_dir, original_name);

        let file = tokio::fs::File::create(&file_path)
            .await
            .map_err(|e| ApiError::internal(format!("Failed to create file: {}", e)))?;
        let mut file =
            tokio::io::BufWriter::with_capacity(self.settings.file_default_chunk_size, file);

        let mut written: u64 = 0;
        while let Some(chunk) = payload.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(err) => {
                    tracing::error!(%err, "error while uploading file");
                    remove_partial(&file_path).await;
                    return Err(ApiError::new(ErrorCode::FileUploadFailed));
                }
            };

            written += chunk.len() as u64;
            if written > self.settings.file_max_size {
                remove_partial(&file_path).await;
                return Err(ApiError::new(ErrorCode::FileSizeExceeded));
            }

            if let Err(err) = file.write_all(&chunk).await {
                tracing::error!(%err, "error while writing upload");
                remove_partial(&file_path).await;
                return Err(ApiError::new(ErrorCode::FileUploadFailed));
            }
        }

        if let Err(err) = file.flush().await {
            tracing::error!(%err, "error while flushing upload");
            remove_partial(&file_path).await;
            return Err(ApiError::new(ErrorCode::FileUploadFailed));
        }
        drop(file);

        let asset = self
            .assets
            .insert(
                project.project_id,
                ASSET_TYPE_FILE,
                &file_name,
                written as i64,
            )
            .await?;

        tracing::info!(
            project_code,
            asset_id = asset.asset_id,
            file = %file_name,
            size = written,
            "file uploaded"
        );

        Ok((project, asset))
    }

    // ========================================================================
    // Process
    // ========================================================================

    /// Parse, chunk and persist the project's files. Failures are isolated
    /// per file; a partially successful run still returns 200 with a
    /// `failed_files` list.
    pub async fn process(
        &self,
        user_id: i64,
        project_code: i64,
        request: &ProcessRequest,
    ) -> ApiResult<ProcessOutcome> {
        let chunk_size = request.chunk_size.unwrap_or(100);
        let overlap_size = request.overlap_size.unwrap_or(20);
        let do_reset = request.do_reset.unwrap_or(0);
        let method = request
            .chunking_method
            .as_deref()
            .map(|raw| ChunkingMethod::from_str(raw).unwrap_or_default())
            .unwrap_or(ChunkingMethod::Semantic);

        tracing::info!(
            project_code,
            chunk_size,
            overlap_size,
            do_reset,
            %method,
            file_id = request.file_id.as_deref().unwrap_or("<all>"),
            "processing request"
        );

        let project = self
            .projects
            .get_by_code_for_user(user_id, project_code)
            .await?
            .ok_or(ApiError::new(ErrorCode::ProjectNotFound))?;

        let target_assets = self.resolve_assets(&project, request.file_id.as_deref()).await?;

        if target_assets.is_empty() {
            return Err(ApiError::new(ErrorCode::ProcessingNoFiles));
        }

        if do_reset == 1 {
            self.retrieval.drop_collection(&project).await;
            let removed = self.chunks.delete_by_project(project.project_id).await?;
            tracing::info!(project_code, removed, "reset removed existing chunks");
        }

        let project_dir = self.project_dir(project.project_id);
        let chunker = Chunker::new(self.embedding_provider.clone());

        let mut inserted_chunks = 0usize;
        let mut processed_files = 0usize;
        let mut failed_files: Vec<FailedFile> = Vec::new();

        for asset in &target_assets {
            let pages = FileParser::parse(&project_dir, &asset.asset_name).await;

            if pages.is_empty() {
                tracing::error!(file = %asset.asset_name, "failed to load file content");
                failed_files.push(FailedFile {
                    file_id: asset.asset_name.clone(),
                    asset_id: asset.asset_id,
                    reason: "Could not load file content".to_string(),
                });
                continue;
            }

            let documents = chunker.chunk(&pages, method, chunk_size, overlap_size).await;

            if documents.is_empty() {
                tracing::error!(file = %asset.asset_name, "no chunks generated");
                failed_files.push(FailedFile {
                    file_id: asset.asset_name.clone(),
                    asset_id: asset.asset_id,
                    reason: "No text chunks generated".to_string(),
                });
                continue;
            }

            let rows: Vec<NewChunk> = documents
                .into_iter()
                .enumerate()
                .map(|(i, doc)| NewChunk {
                    chunk_text: doc.page_content,
                    chunk_metadata: doc.metadata,
                    chunk_order: (i + 1) as i64,
                    chunk_project_id: project.project_id,
                    chunk_asset_id: asset.asset_id,
                })
                .collect();

            let count = self.chunks.insert_many(&rows, CHUNK_INSERT_BATCH).await?;
            inserted_chunks += count;
            processed_files += 1;

            tracing::info!(
                file = %asset.asset_name,
                chunks = count,
                "file processed"
            );
        }

        tracing::info!(
            project_code,
            processed = processed_files,
            total = target_assets.len(),
            failed = failed_files.len(),
            "processing complete"
        );

        Ok(ProcessOutcome {
            inserted_chunks,
            processed_files,
            total_files: target_assets.len(),
            failed_files,
        })
    }

    /// Resolve the asset set targeted by a processing request: a single
    /// asset addressed by server filename or integer id, or every file
    /// asset of the project.
    async fn resolve_assets(
        &self,
        project: &Project,
        file_id: Option<&str>,
    ) -> ApiResult<Vec<Asset>> {
        match file_id {
            Some(file_id) => {
                let mut asset = self
                    .assets
                    .get_by_name(project.project_id, file_id)
                    .await?;

                if asset.is_none() {
                    if let Ok(asset_id) = file_id.parse::<i64>() {
                        asset = self.assets.get_by_id(asset_id, project.project_id).await?;
                    }
                }

                match asset {
                    Some(asset) => Ok(vec![asset]),
                    None => {
                        tracing::warn!(file_id, "file not found in project");
                        Err(ApiError::new(ErrorCode::FileNotFound))
                    }
                }
            }
            None => {
                self.assets
                    .list_by_type(project.project_id, ASSET_TYPE_FILE)
                    .await
            }
        }
    }

    // ========================================================================
    // Content & deletion
    // ========================================================================

    /// Parsed text of one asset, pages joined with newlines.
    pub async fn file_content(
        &self,
        user_id: i64,
        project_code: i64,
        file_id: &str,
    ) -> ApiResult<String> {
        let project = self
            .projects
            .get_by_code_for_user(user_id, project_code)
            .await?
            .ok_or(ApiError::new(ErrorCode::ProjectNotFound))?;

        let assets = self.resolve_assets(&project, Some(file_id)).await?;
        let asset = assets.first().ok_or(ApiError::new(ErrorCode::FileNotFound))?;

        let pages = FileParser::parse(&self.project_dir(project.project_id), &asset.asset_name).await;
        if pages.is_empty() {
            return Err(ApiError::new(ErrorCode::FileProcessingFailed));
        }

        Ok(pages
            .into_iter()
            .map(|page| page.page_content)
            .collect::<Vec<_>>()
            .join("\n"))
    }

    /// Delete one asset: its vectors (filter first, id-list fallback),
    /// chunk rows, the asset row, and the blob on disk (best effort).
    pub async fn delete_asset(
        &self,
        user_id: i64,
        project_code: i64,
        file_id: &str,
    ) -> ApiResult<u64> {
        let project = self
            .projects
            .get_by_code_for_user(user_id, project_code)
            .await?
            .ok_or(ApiError::new(ErrorCode::ProjectNotFound))?;

        let assets = self.resolve_assets(&project, Some(file_id)).await?;
        let asset = assets.first().ok_or(ApiError::new(ErrorCode::FileNotFound))?;

        let chunk_ids = self
            .chunks
            .ids_by_asset(project.project_id, asset.asset_id)
            .await?;
        self.retrieval
            .delete_asset_vectors(&project, asset.asset_id, &chunk_ids)
            .await;

        let removed_chunks = self
            .chunks
            .delete_by_asset(project.project_id, asset.asset_id)
            .await?;

        self.assets
            .delete_by_id(asset.asset_id, project.project_id)
            .await?;

        let blob_path = self.project_dir(project.project_id).join(&asset.asset_name);
        if let Err(err) = tokio::fs::remove_file(&blob_path).await {
            tracing::warn!(file = %asset.asset_name, %err, "failed to remove blob");
        }

        tracing::info!(
            project_code,
            asset_id = asset.asset_id,
            removed_chunks,
            "asset deleted"
        );

        Ok(removed_chunks)
    }
}

// ============================================================================
// Filename helpers
// ============================================================================

/// Replace spaces with underscores, then drop every character outside
/// `[A-Za-z0-9_.]`.
pub fn clean_file_name(original: &str) -> String {
    original
        .trim()
        .replace(' ', "_")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '.')
        .collect()
}

fn random_key() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(RANDOM_KEY_LENGTH)
        .map(char::from)
        .collect()
}

/// Pick a `randomkey_cleanedname` path that does not collide on disk,
/// re-rolling the key until unique.
fn generate_unique_filepath(project_dir: &std::path::Path, original_name: &str) -> (PathBuf, String) {
    let cleaned = clean_file_name(original_name);

    loop {
        let file_name = format!("{}_{}", random_key(), cleaned);
        let path = project_dir.join(&file_name);
        if !path.exists() {
            return (path, file_name);
        }
    }
}

async fn remove_partial(path: &std::path::Path) {
    if let Err(err) = tokio::fs::remove_file(path).await {
        tracing::warn!(?path, %err, "failed to remove partial upload");
    }
}
