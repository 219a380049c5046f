//! Project store.
//!
//! A project is the retrieval scope: every asset, chunk and vector
//! collection hangs off one `(user_id, project_code)` pair. The internal
//! `project_id` is never exposed in URLs; `project_code` is the
//! user-visible identifier.

use std::sync::Arc;

use libsql::Row;
use serde::Serialize;
use uuid::Uuid;

use crate::db::client::{is_unique_violation, now_rfc3339, DbClient};
use crate::errors::{ApiError, ApiResult, ErrorCode};

/// A retrieval scope owned by exactly one user.
#[derive(Debug, Clone, Serialize)]
pub struct Project {
    #[serde(skip_serializing)]
    pub project_id: i64,
    pub project_uuid: String,
    #[serde(skip_serializing)]
    pub user_id: i64,
    pub project_code: i64,
    pub created_at: String,
    pub updated_at: String,
}

fn row_to_project(row: &Row) -> ApiResult<Project> {
    Ok(Project {
        project_id: row.get(0).map_err(ApiError::internal)?,
        project_uuid: row.get(1).map_err(ApiError::internal)?,
        user_id: row.get(2).map_err(ApiError::internal)?,
        project_code: row.get(3).map_err(ApiError::internal)?,
        created_at: row.get(4).map_err(ApiError::internal)?,
        updated_at: row.get(5).map_err(ApiError::internal)?,
    })
}

const PROJECT_COLUMNS: &str =
    "project_id, project_uuid, user_id, project_code, created_at, updated_at";

pub struct ProjectStore {
    db: Arc<DbClient>,
}

impl ProjectStore {
    pub fn new(db: Arc<DbClient>) -> Self {
        Self { db }
    }

    /// Insert a new project row. A `(user_id, project_code)` collision maps
    /// to `PROJECT_ALREADY_EXISTS`; callers decide whether to re-read.
    pub async fn insert(&self, user_id: i64, project_code: i64) -> ApiResult<Project> {
        let conn = self.db.connection();
        let now = now_rfc3339();
        let project_uuid = Uuid::new_v4().to_string();

        let mut rows = conn
            .query(
                "INSERT INTO projects (project_uuid, user_id, project_code, created_at, updated_at)
                 VALUES (?, ?, ?, ?, ?) RETURNING project_id",
                libsql::params![
                    project_uuid.clone(),
                    user_id,
                    project_code,
                    now.clone(),
                    now.clone()
                ],
            )
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    ApiError::new(ErrorCode::ProjectAlreadyExists)
                } else {
                    ApiError::internal(format!("Failed to insert project: {}", e))
                }
            })?;

        let project_id: i64 = match rows.next().await.map_err(ApiError::internal)? {
            Some(row) => row.get(0).map_err(ApiError::internal)?,
            None => return Err(ApiError::internal("insert returned no project_id")),
        };

        Ok(Project {
            project_id,
            project_uuid,
            user_id,
            project_code,
            created_at: now.clone(),
            updated_at: now,
        })
    }

    /// Fetch the project for this user, creating it when absent. The
    /// concurrent-create race resolves by re-reading the winner's row.
    pub async fn get_or_create(&self, user_id: i64, project_code: i64) -> ApiResult<Project> {
        if let Some(project) = self.get_by_code_for_user(user_id, project_code).await? {
            return Ok(project);
        }

        match self.insert(user_id, project_code).await {
            Ok(project) => Ok(project),
            Err(err) if err.code() == ErrorCode::ProjectAlreadyExists => self
                .get_by_code_for_user(user_id, project_code)
                .await?
                .ok_or_else(|| ApiError::new(ErrorCode::ProjectCreationFailed)),
            Err(err) => Err(err),
        }
    }

    pub async fn get_by_code_for_user(
        &self,
        user_id: i64,
        project_code: i64,
    ) -> ApiResult<Option<Project>> {
        let conn = self.db.connection();

        let mut rows = conn
            .query(
                &format!(
                    "SELECT {} FROM projects WHERE user_id = ? AND project_code = ?",
                    PROJECT_COLUMNS
                ),
                libsql::params![user_id, project_code],
            )
            .await
            .map_err(|e| ApiError::internal(format!("Failed to query project: {}", e)))?;

        match rows.next().await.map_err(ApiError::internal)? {
            Some(row) => Ok(Some(row_to_project(&row)?)),
            None => Ok(None),
        }
    }

    pub async fn get_by_id_for_user(
        &self,
        user_id: i64,
        project_id: i64,
    ) -> ApiResult<Option<Project>> {
        let conn = self.db.connection();

        let mut rows = conn
            .query(
                &format!(
                    "SELECT {} FROM projects WHERE user_id = ? AND project_id = ?",
                    PROJECT_COLUMNS
                ),
                libsql::params![user_id, project_id],
            )
            .await
            .map_err(|e| ApiError::internal(format!("Failed to query project: {}", e)))?;

        match rows.next().await.map_err(ApiError::internal)? {
            Some(row) => Ok(Some(row_to_project(&row)?)),
            None => Ok(None),
        }
    }

    /// List one page of the user's projects, oldest first, plus the total
    /// page count for the given page size.
    pub async fn list_for_user(
        &self,
        user_id: i64,
        page: i64,
        page_size: i64,
    ) -> ApiResult<(Vec<Project>, i64)> {
        let conn = self.db.connection();

        let mut count_rows = conn
            .query(
                "SELECT COUNT(*) FROM projects WHERE user_id = ?",
                libsql::params![user_id],
            )
            .await
            .map_err(|e| ApiError::internal(format!("Failed to count projects: {}", e)))?;
        let total: i64 = match count_rows.next().await.map_err(ApiError::internal)? {
            Some(row) => row.get(0).map_err(ApiError::internal)?,
            None => 0,
        };
        let total_pages = (total + page_size - 1) / page_size;

        let mut rows = conn
            .query(
                &format!(
                    "SELECT {} FROM projects WHERE user_id = ?
                     ORDER BY project_id LIMIT ? OFFSET ?",
                    PROJECT_COLUMNS
                ),
                libsql::params![user_id, page_size, (page - 1) * page_size],
            )
            .await
            .map_err(|e| ApiError::internal(format!("Failed to list projects: {}", e)))?;

        let mut projects = Vec::new();
        while let Some(row) = rows.next().await.map_err(ApiError::internal)? {
            projects.push(row_to_project(&row)?);
        }

        Ok((projects, total_pages))
    }

    /// Delete a project; assets and chunks cascade at the SQL level.
    pub async fn delete(&self, project_id: i64) -> ApiResult<bool> {
        let conn = self.db.connection();

        let affected = conn
            .execute(
                "DELETE FROM projects WHERE project_id = ?",
                libsql::params![project_id],
            )
            .await
            .map_err(|e| ApiError::internal(format!("Failed to delete project: {}", e)))?;

        Ok(affected > 0)
    }
}
