//! Provider abstraction for embedding and generation backends.
//!
//! All remote model providers implement [`Provider`], so the pipeline can
//! swap between them (or an explicit unavailable placeholder) without
//! changing application code.
//!
//! Failure contract: a configured provider that hits a remote error logs
//! it and returns an empty result (callers treat that as a retryable
//! transient); only the [`Unavailable`] placeholder returns
//! `NLP_SERVICE_UNAVAILABLE` outright.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::{ApiError, ApiResult, ErrorCode};

/// Whether a text is embedded as a stored document or a search query.
///
/// Some providers produce different vectors for the two roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbedKind {
    Document,
    Query,
}

/// One turn of chat history handed to the generation model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// Uniform interface over remote LLM providers.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Human-readable provider name for logging.
    fn name(&self) -> &'static str;

    /// Whether the provider holds working credentials.
    fn is_available(&self) -> bool {
        true
    }

    /// Role tag this provider uses to mark system messages.
    fn system_role(&self) -> &'static str;

    /// Provider-specific text normalization applied before embedding or
    /// prompt assembly.
    fn normalize_text(&self, text: &str) -> String;

    /// Embed a batch of texts. Returns one vector per input, or an empty
    /// sequence when the remote call fails.
    async fn embed(&self, texts: &[String], kind: EmbedKind) -> ApiResult<Vec<Vec<f32>>>;

    /// Generate a completion for `prompt` given prior `history`. Returns
    /// an empty string when the remote call fails.
    async fn generate(&self, prompt: &str, history: &[ChatMessage]) -> ApiResult<String>;
}

/// Placeholder returned by the factory when the selected provider lacks
/// credentials. Every call surfaces `NLP_SERVICE_UNAVAILABLE`.
pub struct Unavailable;

#[async_trait]
impl Provider for Unavailable {
    fn name(&self) -> &'static str {
        "unavailable"
    }

    fn is_available(&self) -> bool {
        false
    }

    fn system_role(&self) -> &'static str {
        "system"
    }

    fn normalize_text(&self, text: &str) -> String {
        text.trim().to_string()
    }

    async fn embed(&self, _texts: &[String], _kind: EmbedKind) -> ApiResult<Vec<Vec<f32>>> {
        Err(ApiError::new(ErrorCode::NlpServiceUnavailable))
    }

    async fn generate(&self, _prompt: &str, _history: &[ChatMessage]) -> ApiResult<String> {
        Err(ApiError::new(ErrorCode::NlpServiceUnavailable))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unavailable_provider_surfaces_503() {
        let provider = Unavailable;
        assert!(!provider.is_available());

        let err = provider
            .embed(&["hello".to_string()], EmbedKind::Document)
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::NlpServiceUnavailable);

        let err = provider.generate("hello", &[]).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::NlpServiceUnavailable);
    }
}
