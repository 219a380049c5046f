//! User store.

use std::sync::Arc;

use libsql::Row;
use serde::Serialize;
use uuid::Uuid;

use crate::db::client::{is_unique_violation, now_rfc3339, DbClient};
use crate::errors::{ApiError, ApiResult, ErrorCode};

/// A registered identity principal.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub user_id: i64,
    pub user_uuid: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub hashed_password: String,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

fn row_to_user(row: &Row) -> ApiResult<User> {
    Ok(User {
        user_id: row.get(0).map_err(ApiError::internal)?,
        user_uuid: row.get(1).map_err(ApiError::internal)?,
        email: row.get(2).map_err(ApiError::internal)?,
        hashed_password: row.get(3).map_err(ApiError::internal)?,
        is_active: row.get::<i64>(4).map_err(ApiError::internal)? != 0,
        created_at: row.get(5).map_err(ApiError::internal)?,
        updated_at: row.get(6).map_err(ApiError::internal)?,
    })
}

const USER_COLUMNS: &str =
    "user_id, user_uuid, email, hashed_password, is_active, created_at, updated_at";

pub struct UserStore {
    db: Arc<DbClient>,
}

impl UserStore {
    pub fn new(db: Arc<DbClient>) -> Self {
        Self { db }
    }

    /// Insert a new user. Duplicate email (case-insensitive) maps to
    /// `AUTH_USER_ALREADY_EXISTS`.
    pub async fn insert(&self, email: &str, hashed_password: &str) -> ApiResult<User> {
        let conn = self.db.connection();
        let now = now_rfc3339();
        let user_uuid = Uuid::new_v4().to_string();

        let mut rows = conn
            .query(
                "INSERT INTO users (user_uuid, email, hashed_password, is_active, created_at, updated_at)
                 VALUES (?, ?, ?, 1, ?, ?) RETURNING user_id",
                libsql::params![user_uuid.clone(), email, hashed_password, now.clone(), now.clone()],
            )
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    ApiError::new(ErrorCode::AuthUserAlreadyExists)
                } else {
                    ApiError::internal(format!("Failed to insert user: {}", e))
                }
            })?;

        let user_id: i64 = match rows.next().await.map_err(ApiError::internal)? {
            Some(row) => row.get(0).map_err(ApiError::internal)?,
            None => return Err(ApiError::internal("insert returned no user_id")),
        };

        Ok(User {
            user_id,
            user_uuid,
            email: email.to_string(),
            hashed_password: hashed_password.to_string(),
            is_active: true,
            created_at: now.clone(),
            updated_at: now,
        })
    }

    pub async fn get_by_email(&self, email: &str) -> ApiResult<Option<User>> {
        let conn = self.db.connection();

        let mut rows = conn
            .query(
                &format!("SELECT {} FROM users WHERE email = ?", USER_COLUMNS),
                [email],
            )
            .await
            .map_err(|e| ApiError::internal(format!("Failed to query user: {}", e)))?;

        match rows.next().await.map_err(ApiError::internal)? {
            Some(row) => Ok(Some(row_to_user(&row)?)),
            None => Ok(None),
        }
    }

    pub async fn get_by_id(&self, user_id: i64) -> ApiResult<Option<User>> {
        let conn = self.db.connection();

        let mut rows = conn
            .query(
                &format!("SELECT {} FROM users WHERE user_id = ?", USER_COLUMNS),
                libsql::params![user_id],
            )
            .await
            .map_err(|e| ApiError::internal(format!("Failed to query user: {}", e)))?;

        match rows.next().await.map_err(ApiError::internal)? {
            Some(row) => Ok(Some(row_to_user(&row)?)),
            None => Ok(None),
        }
    }
}
