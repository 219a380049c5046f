//! Project service: create, list, fetch and delete retrieval scopes.
//!
//! Everything is scoped to the authenticated user; a missing project and
//! a foreign project produce the same `PROJECT_NOT_FOUND` so existence
//! never leaks across tenants.

use std::sync::Arc;

use serde_json::{json, Value};

use crate::db::{AssetStore, ChunkStore, Project, ProjectStore};
use crate::errors::{ApiError, ApiResult, ErrorCode};
use crate::rag::RetrievalService;
use crate::utils::config::Settings;
use crate::AppState;

/// Derived project status: indexed collections are `active`, everything
/// else is still `pending_indexing`.
fn status_label(is_indexed: bool) -> &'static str {
    if is_indexed {
        "active"
    } else {
        "pending_indexing"
    }
}

/// Public JSON shape of a project. The user-visible `project_id` is the
/// project code; the internal row id never leaves the service.
pub fn project_json(project: &Project) -> Value {
    json!({
        "project_id": project.project_code,
        "project_uuid": project.project_uuid,
        "created_at": project.created_at,
        "updated_at": project.updated_at,
    })
}

pub struct ProjectService {
    settings: Arc<Settings>,
    projects: Arc<ProjectStore>,
    assets: Arc<AssetStore>,
    chunks: Arc<ChunkStore>,
    retrieval: RetrievalService,
}

impl ProjectService {
    pub fn from_state(state: &AppState) -> Self {
        Self {
            settings: state.settings.clone(),
            projects: state.project_store.clone(),
            assets: state.asset_store.clone(),
            chunks: state.chunk_store.clone(),
            retrieval: RetrievalService::from_state(state),
        }
    }

    /// Create a project. A concurrent create of the same code loses the
    /// race cleanly: the unique-key failure is re-read and surfaced as
    /// `PROJECT_ALREADY_EXISTS` with the winner embedded.
    pub async fn create(&self, user_id: i64, project_code: i64) -> ApiResult<Project> {
        match self.projects.insert(user_id, project_code).await {
            Ok(project) => {
                tracing::info!(project_code, "project created");
                Ok(project)
            }
            Err(err) if err.code() == ErrorCode::ProjectAlreadyExists => {
                let existing = self
                    .projects
                    .get_by_code_for_user(user_id, project_code)
                    .await?
                    .ok_or(ApiError::new(ErrorCode::ProjectCreationFailed))?;

                Err(ApiError::new(ErrorCode::ProjectAlreadyExists)
                    .with_details(json!({ "project": project_json(&existing) })))
            }
            Err(err) => Err(err),
        }
    }

    pub async fn get(&self, user_id: i64, project_code: i64) -> ApiResult<Project> {
        self.projects
            .get_by_code_for_user(user_id, project_code)
            .await?
            .ok_or(ApiError::new(ErrorCode::ProjectNotFound))
    }

    /// One page of the user's projects, enriched with asset/chunk counts
    /// and the derived status.
    pub async fn list(
        &self,
        user_id: i64,
        page: i64,
        page_size: i64,
    ) -> ApiResult<(Vec<Value>, i64)> {
        let (projects, total_pages) = self.projects.list_for_user(user_id, page, page_size).await?;

        let mut items = Vec::with_capacity(projects.len());
        for project in &projects {
            let asset_count = self.assets.count_by_project(project.project_id).await?;
            let chunk_count = self.chunks.total_count(project.project_id).await?;
            let is_indexed = self.retrieval.is_indexed(project).await;

            let mut item = project_json(project);
            item["asset_count"] = json!(asset_count);
            item["chunk_count"] = json!(chunk_count);
            item["status"] = json!(status_label(is_indexed));
            items.push(item);
        }

        Ok((items, total_pages))
    }

    /// Detail view: counts, vector statistics and the asset list.
    pub async fn details(&self, user_id: i64, project_code: i64) -> ApiResult<Value> {
        let project = self.get(user_id, project_code).await?;

        let asset_count = self.assets.count_by_project(project.project_id).await?;
        let chunk_count = self.chunks.total_count(project.project_id).await?;
        let assets = self.assets.list_by_project(project.project_id).await?;

        let stats = self.retrieval.collection_stats(&project).await;
        let is_indexed = stats.is_some();
        let (vector_count, points_count) = stats
            .map(|info| (info.vectors_count, info.points_count))
            .unwrap_or((0, 0));

        let asset_items: Vec<Value> = assets
            .iter()
            .map(|asset| {
                json!({
                    "asset_id": asset.asset_id,
                    "asset_name": asset.asset_name,
                    "asset_size": asset.asset_size,
                    "created_at": asset.created_at,
                })
            })
            .collect();

        let mut details = project_json(&project);
        details["asset_count"] = json!(asset_count);
        details["chunk_count"] = json!(chunk_count);
        details["vector_count"] = json!(vector_count);
        details["points_count"] = json!(points_count);
        details["is_indexed"] = json!(is_indexed);
        details["status"] = json!(status_label(is_indexed));
        details["assets"] = json!(asset_items);

        Ok(details)
    }

    /// Delete a project: drop its collection (best effort), cascade the
    /// database rows, then clear the upload directory (best effort).
    pub async fn delete(&self, user_id: i64, project_code: i64) -> ApiResult<()> {
        let project = self.get(user_id, project_code).await?;

        self.retrieval.drop_collection(&project).await;

        self.projects.delete(project.project_id).await?;

        let project_dir =
            std::path::PathBuf::from(&self.settings.files_dir).join(project.project_id.to_string());
        if project_dir.exists() {
            if let Err(err) = tokio::fs::remove_dir_all(&project_dir).await {
                tracing::warn!(?project_dir, %err, "failed to remove project files");
            }
        }

        tracing::info!(project_code, "project deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_label() {
        assert_eq!(status_label(true), "active");
        assert_eq!(status_label(false), "pending_indexing");
    }

    #[test]
    fn test_project_json_hides_internal_ids() {
        let project = Project {
            project_id: 99,
            project_uuid: "u-u-i-d".to_string(),
            user_id: 5,
            project_code: 7,
            created_at: "2026-01-01T00:00:00Z".to_string(),
            updated_at: "2026-01-01T00:00:00Z".to_string(),
        };

        let value = project_json(&project);

        assert_eq!(value["project_id"], 7);
        assert!(value.get("user_id").is_none());
        assert_eq!(value["project_uuid"], "u-u-i-d");
    }
}
