//! Asset store.
//!
//! An asset is one stored source file; the filesystem blob is named by
//! `asset_name`, which is unique within its project.

use std::sync::Arc;

use libsql::Row;
use serde::Serialize;

use crate::db::client::{now_rfc3339, DbClient};
use crate::errors::{ApiError, ApiResult};

/// Asset types; only plain files exist today.
pub const ASSET_TYPE_FILE: &str = "file";

/// A stored source file belonging to one project.
#[derive(Debug, Clone, Serialize)]
pub struct Asset {
    pub asset_id: i64,
    #[serde(skip_serializing)]
    pub asset_project_id: i64,
    pub asset_type: String,
    pub asset_name: String,
    pub asset_size: i64,
    pub created_at: String,
}

fn row_to_asset(row: &Row) -> ApiResult<Asset> {
    Ok(Asset {
        asset_id: row.get(0).map_err(ApiError::internal)?,
        asset_project_id: row.get(1).map_err(ApiError::internal)?,
        asset_type: row.get(2).map_err(ApiError::internal)?,
        asset_name: row.get(3).map_err(ApiError::internal)?,
        asset_size: row.get(4).map_err(ApiError::internal)?,
        created_at: row.get(5).map_err(ApiError::internal)?,
    })
}

const ASSET_COLUMNS: &str =
    "asset_id, asset_project_id, asset_type, asset_name, asset_size, created_at";

pub struct AssetStore {
    db: Arc<DbClient>,
}

impl AssetStore {
    pub fn new(db: Arc<DbClient>) -> Self {
        Self { db }
    }

    pub async fn insert(
        &self,
        project_id: i64,
        asset_type: &str,
        asset_name: &str,
        asset_size: i64,
    ) -> ApiResult<Asset> {
        let conn = self.db.connection();
        let now = now_rfc3339();

        let mut rows = conn
            .query(
                "INSERT INTO assets (asset_project_id, asset_type, asset_name, asset_size, created_at)
                 VALUES (?, ?, ?, ?, ?) RETURNING asset_id",
                libsql::params![project_id, asset_type, asset_name, asset_size, now.clone()],
            )
            .await
            .map_err(|e| ApiError::internal(format!("Failed to insert asset: {}", e)))?;

        let asset_id: i64 = match rows.next().await.map_err(ApiError::internal)? {
            Some(row) => row.get(0).map_err(ApiError::internal)?,
            None => return Err(ApiError::internal("insert returned no asset_id")),
        };

        Ok(Asset {
            asset_id,
            asset_project_id: project_id,
            asset_type: asset_type.to_string(),
            asset_name: asset_name.to_string(),
            asset_size,
            created_at: now,
        })
    }

    pub async fn get_by_name(&self, project_id: i64, asset_name: &str) -> ApiResult<Option<Asset>> {
        let conn = self.db.connection();

        let mut rows = conn
            .query(
                &format!(
                    "SELECT {} FROM assets WHERE asset_project_id = ? AND asset_name = ?",
                    ASSET_COLUMNS
                ),
                libsql::params![project_id, asset_name],
            )
            .await
            .map_err(|e| ApiError::internal(format!("Failed to query asset: {}", e)))?;

        match rows.next().await.map_err(ApiError::internal)? {
            Some(row) => Ok(Some(row_to_asset(&row)?)),
            None => Ok(None),
        }
    }

    pub async fn get_by_id(&self, asset_id: i64, project_id: i64) -> ApiResult<Option<Asset>> {
        let conn = self.db.connection();

        let mut rows = conn
            .query(
                &format!(
                    "SELECT {} FROM assets WHERE asset_id = ? AND asset_project_id = ?",
                    ASSET_COLUMNS
                ),
                libsql::params![asset_id, project_id],
            )
            .await
            .map_err(|e| ApiError::internal(format!("Failed to query asset: {}", e)))?;

        match rows.next().await.map_err(ApiError::internal)? {
            Some(row) => Ok(Some(row_to_asset(&row)?)),
            None => Ok(None),
        }
    }

    pub async fn list_by_type(&self, project_id: i64, asset_type: &str) -> ApiResult<Vec<Asset>> {
        let conn = self.db.connection();

        let mut rows = conn
            .query(
                &format!(
                    "SELECT {} FROM assets WHERE asset_project_id = ? AND asset_type = ?
                     ORDER BY asset_id",
                    ASSET_COLUMNS
                ),
                libsql::params![project_id, asset_type],
            )
            .await
            .map_err(|e| ApiError::internal(format!("Failed to list assets: {}", e)))?;

        let mut assets = Vec::new();
        while let Some(row) = rows.next().await.map_err(ApiError::internal)? {
            assets.push(row_to_asset(&row)?);
        }

        Ok(assets)
    }

    pub async fn list_by_project(&self, project_id: i64) -> ApiResult<Vec<Asset>> {
        let conn = self.db.connection();

        let mut rows = conn
            .query(
                &format!(
                    "SELECT {} FROM assets WHERE asset_project_id = ? ORDER BY asset_id",
                    ASSET_COLUMNS
                ),
                libsql::params![project_id],
            )
            .await
            .map_err(|e| ApiError::internal(format!("Failed to list assets: {}", e)))?;

        let mut assets = Vec::new();
        while let Some(row) = rows.next().await.map_err(ApiError::internal)? {
            assets.push(row_to_asset(&row)?);
        }

        Ok(assets)
    }

    pub async fn count_by_project(&self, project_id: i64) -> ApiResult<i64> {
        let conn = self.db.connection();

        let mut rows = conn
            .query(
                "SELECT COUNT(*) FROM assets WHERE asset_project_id = ?",
                libsql::params![project_id],
            )
            .await
            .map_err(|e| ApiError::internal(format!("Failed to count assets: {}", e)))?;

        match rows.next().await.map_err(ApiError::internal)? {
            Some(row) => row.get(0).map_err(ApiError::internal),
            None => Ok(0),
        }
    }

    pub async fn delete_by_id(&self, asset_id: i64, project_id: i64) -> ApiResult<bool> {
        let conn = self.db.connection();

        let affected = conn
            .execute(
                "DELETE FROM assets WHERE asset_id = ? AND asset_project_id = ?",
                libsql::params![asset_id, project_id],
            )
            .await
            .map_err(|e| ApiError::internal(format!("Failed to delete asset: {}", e)))?;

        Ok(affected > 0)
    }

    pub async fn delete_all_by_project(&self, project_id: i64) -> ApiResult<u64> {
        let conn = self.db.connection();

        conn.execute(
            "DELETE FROM assets WHERE asset_project_id = ?",
            libsql::params![project_id],
        )
        .await
        .map_err(|e| ApiError::internal(format!("Failed to delete assets: {}", e)))
    }
}
