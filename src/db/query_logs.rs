//! Query log store (append-only audit of RAG answers).

use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::db::client::{now_rfc3339, DbClient};
use crate::errors::{ApiError, ApiResult};

/// Audit record of one answered question.
#[derive(Debug, Clone, Serialize)]
pub struct QueryLog {
    pub log_id: i64,
    pub log_uuid: String,
    pub user_id: i64,
    pub question: String,
    pub llm_response: String,
    pub response_time_ms: f64,
    pub created_at: String,
}

pub struct QueryLogStore {
    db: Arc<DbClient>,
}

impl QueryLogStore {
    pub fn new(db: Arc<DbClient>) -> Self {
        Self { db }
    }

    pub async fn insert(
        &self,
        user_id: i64,
        question: &str,
        llm_response: &str,
        response_time_ms: f64,
    ) -> ApiResult<QueryLog> {
        let conn = self.db.connection();
        let now = now_rfc3339();
        let log_uuid = Uuid::new_v4().to_string();

        let mut rows = conn
            .query(
                "INSERT INTO query_logs
                 (log_uuid, user_id, question, llm_response, response_time_ms, created_at)
                 VALUES (?, ?, ?, ?, ?, ?) RETURNING log_id",
                libsql::params![
                    log_uuid.clone(),
                    user_id,
                    question,
                    llm_response,
                    response_time_ms,
                    now.clone()
                ],
            )
            .await
            .map_err(|e| ApiError::internal(format!("Failed to insert query log: {}", e)))?;

        let log_id: i64 = match rows.next().await.map_err(ApiError::internal)? {
            Some(row) => row.get(0).map_err(ApiError::internal)?,
            None => return Err(ApiError::internal("insert returned no log_id")),
        };

        Ok(QueryLog {
            log_id,
            log_uuid,
            user_id,
            question: question.to_string(),
            llm_response: llm_response.to_string(),
            response_time_ms,
            created_at: now,
        })
    }
}
