//! Core wire types used throughout the quarry server.
//!
//! This module contains the common data structures for:
//! - API requests and responses
//! - Response signals carried inside success envelopes
//! - Authentication claims
//! - Pagination

use serde::{Deserialize, Serialize};

// ============= Authentication Types =============

/// Request payload for user registration.
#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterRequest {
    /// Email address for the new account.
    pub email: String,
    /// Password for the new account.
    pub password: String,
}

/// Form payload for user login (OAuth2 password style).
#[derive(Debug, Serialize, Deserialize)]
pub struct LoginForm {
    /// Email address of the account.
    pub username: String,
    /// Account password.
    pub password: String,
}

/// JWT claims embedded in access tokens.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user id).
    pub sub: String,
    /// Expiration time (Unix timestamp).
    pub exp: usize,
    /// Issued at time (Unix timestamp).
    pub iat: usize,
}

/// Authenticated principal resolved by the bearer middleware.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user_id: i64,
    pub email: String,
    pub is_active: bool,
}

// ============= Data Pipeline Requests =============

/// Request payload for the processing endpoint.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ProcessRequest {
    /// Target a single asset by server filename or integer asset id.
    #[serde(default)]
    pub file_id: Option<String>,
    /// Maximum chunk size in characters.
    #[serde(default)]
    pub chunk_size: Option<usize>,
    /// Overlap between chunks in characters.
    #[serde(default)]
    pub overlap_size: Option<usize>,
    /// `1` drops the project's collection and chunk rows first.
    #[serde(default)]
    pub do_reset: Option<u8>,
    /// Chunking strategy (`semantic` | `sentence_based` | `simple`).
    #[serde(default)]
    pub chunking_method: Option<String>,
}

/// Request payload for the index push endpoint.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct PushRequest {
    /// `1` recreates the collection before indexing.
    #[serde(default)]
    pub do_reset: Option<u8>,
}

/// Request payload for search and answer endpoints.
#[derive(Debug, Serialize, Deserialize)]
pub struct SearchRequest {
    /// Query text.
    pub text: String,
    /// Maximum number of retrieved chunks.
    #[serde(default = "default_search_limit")]
    pub limit: usize,
}

fn default_search_limit() -> usize {
    10
}

/// A file that could not be processed, reported inside a 200 response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedFile {
    pub file_id: String,
    pub asset_id: i64,
    pub reason: String,
}

// ============= Pagination =============

/// Query parameters for paginated listings.
#[derive(Debug, Default, Deserialize)]
pub struct PaginationQuery {
    #[serde(default)]
    pub page: Option<i64>,
    #[serde(default)]
    pub page_size: Option<i64>,
}

/// Default page size for listings.
pub const DEFAULT_PAGE_SIZE: i64 = 10;
/// Largest accepted page size.
pub const MAX_PAGE_SIZE: i64 = 100;

impl PaginationQuery {
    /// Clamp to a valid `(page, page_size)` pair: page is at least 1,
    /// page_size outside `[1, 100]` falls back to the default.
    pub fn clamp(&self) -> (i64, i64) {
        let page = self.page.unwrap_or(1).max(1);
        let page_size = match self.page_size.unwrap_or(DEFAULT_PAGE_SIZE) {
            size if (1..=MAX_PAGE_SIZE).contains(&size) => size,
            _ => DEFAULT_PAGE_SIZE,
        };
        (page, page_size)
    }
}

// ============= Response Signals =============

/// Operation outcome markers carried in success payloads.
///
/// These are wire-stable strings; clients branch on them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResponseSignal {
    FileUploadSuccess,
    ProcessingSuccess,
    InsertIntoVectordbSuccess,
    VectordbCollectionRetrieved,
    VectordbSearchSuccess,
    RagAnswerSuccess,
}

impl ResponseSignal {
    /// Wire form of the signal.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FileUploadSuccess => "FILE_UPLOAD_SUCCESS",
            Self::ProcessingSuccess => "PROCESSING_SUCCESS",
            Self::InsertIntoVectordbSuccess => "INSERT_INTO_VECTORDB_SUCCESS",
            Self::VectordbCollectionRetrieved => "VECTORDB_COLLECTION_RETRIEVED",
            Self::VectordbSearchSuccess => "VECTORDB_SEARCH_SUCCESS",
            Self::RagAnswerSuccess => "RAG_ANSWER_SUCCESS",
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(None, None, 1, DEFAULT_PAGE_SIZE)]
    #[case(Some(0), Some(25), 1, 25)]
    #[case(Some(2), Some(101), 2, DEFAULT_PAGE_SIZE)]
    #[case(Some(1), Some(0), 1, DEFAULT_PAGE_SIZE)]
    #[case(Some(3), Some(100), 3, 100)]
    #[case(Some(-5), Some(-1), 1, DEFAULT_PAGE_SIZE)]
    fn test_pagination_clamp(
        #[case] page: Option<i64>,
        #[case] page_size: Option<i64>,
        #[case] expected_page: i64,
        #[case] expected_page_size: i64,
    ) {
        let query = PaginationQuery { page, page_size };
        assert_eq!(query.clamp(), (expected_page, expected_page_size));
    }

    #[test]
    fn test_signal_wire_form() {
        assert_eq!(
            ResponseSignal::ProcessingSuccess.as_str(),
            "PROCESSING_SUCCESS"
        );
        assert_eq!(
            serde_json::to_value(ResponseSignal::RagAnswerSuccess).unwrap(),
            serde_json::json!("RAG_ANSWER_SUCCESS")
        );
    }

    #[test]
    fn test_search_request_default_limit() {
        let req: SearchRequest =
            serde_json::from_str(r#"{"text": "what is quarry?"}"#).unwrap();
        assert_eq!(req.limit, 10);
    }
}
