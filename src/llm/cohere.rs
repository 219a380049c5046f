//! Cohere-compatible provider over the plain JSON API.

use async_trait::async_trait;
use serde_json::json;

use crate::errors::ApiResult;
use crate::llm::provider::{ChatMessage, EmbedKind, Provider};

const DEFAULT_API_BASE: &str = "https://api.cohere.ai";

/// Cohere-compatible provider (`/v1/embed`, `/v1/chat`).
pub struct CohereProvider {
    http: reqwest::Client,
    api_key: String,
    api_base: String,
    generation_model_id: String,
    embedding_model_id: String,
}

impl CohereProvider {
    pub fn new(
        api_key: String,
        generation_model_id: String,
        embedding_model_id: String,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            api_base: DEFAULT_API_BASE.to_string(),
            generation_model_id,
            embedding_model_id,
        }
    }

    fn input_type(kind: EmbedKind) -> &'static str {
        match kind {
            EmbedKind::Document => "search_document",
            EmbedKind::Query => "search_query",
        }
    }

    /// Cohere chat roles are upper-case; map ours over.
    fn chat_role(role: &str) -> &'static str {
        match role {
            "SYSTEM" | "system" => "SYSTEM",
            "CHATBOT" | "assistant" => "CHATBOT",
            _ => "USER",
        }
    }
}

#[async_trait]
impl Provider for CohereProvider {
    fn name(&self) -> &'static str {
        "cohere"
    }

    fn system_role(&self) -> &'static str {
        "SYSTEM"
    }

    fn normalize_text(&self, text: &str) -> String {
        text.trim().to_string()
    }

    async fn embed(&self, texts: &[String], kind: EmbedKind) -> ApiResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let payload = json!({
            "model": self.embedding_model_id,
            "texts": texts,
            "input_type": Self::input_type(kind),
            "truncate": "END",
        });

        let response = match self
            .http
            .post(format!("{}/v1/embed", self.api_base))
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!(provider = self.name(), %err, "embedding request failed");
                return Ok(vec![]);
            }
        };

        if !response.status().is_success() {
            tracing::warn!(
                provider = self.name(),
                status = %response.status(),
                "embedding request rejected"
            );
            return Ok(vec![]);
        }

        let body: serde_json::Value = match response.json().await {
            Ok(body) => body,
            Err(err) => {
                tracing::warn!(provider = self.name(), %err, "invalid embedding response");
                return Ok(vec![]);
            }
        };

        let Some(data) = body.get("embeddings").and_then(|e| e.as_array()) else {
            tracing::warn!(provider = self.name(), "embed response missing embeddings");
            return Ok(vec![]);
        };

        let vectors: Vec<Vec<f32>> = data
            .iter()
            .filter_map(|item| {
                item.as_array().map(|arr| {
                    arr.iter()
                        .filter_map(|v| v.as_f64().map(|f| f as f32))
                        .collect()
                })
            })
            .collect();

        if vectors.len() != texts.len() {
            tracing::warn!(
                provider = self.name(),
                expected = texts.len(),
                got = vectors.len(),
                "embedding count mismatch"
            );
            return Ok(vec![]);
        }

        Ok(vectors)
    }

    async fn generate(&self, prompt: &str, history: &[ChatMessage]) -> ApiResult<String> {
        let chat_history: Vec<serde_json::Value> = history
            .iter()
            .map(|message| {
                json!({
                    "role": Self::chat_role(&message.role),
                    "message": message.content,
                })
            })
            .collect();

        let payload = json!({
            "model": self.generation_model_id,
            "message": prompt,
            "chat_history": chat_history,
        });

        let response = match self
            .http
            .post(format!("{}/v1/chat", self.api_base))
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!(provider = self.name(), %err, "chat request failed");
                return Ok(String::new());
            }
        };

        if !response.status().is_success() {
            tracing::warn!(
                provider = self.name(),
                status = %response.status(),
                "chat request rejected"
            );
            return Ok(String::new());
        }

        let body: serde_json::Value = match response.json().await {
            Ok(body) => body,
            Err(err) => {
                tracing::warn!(provider = self.name(), %err, "invalid chat response");
                return Ok(String::new());
            }
        };

        Ok(body
            .get("text")
            .and_then(|t| t.as_str())
            .unwrap_or_default()
            .to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_type_mapping() {
        assert_eq!(
            CohereProvider::input_type(EmbedKind::Document),
            "search_document"
        );
        assert_eq!(CohereProvider::input_type(EmbedKind::Query), "search_query");
    }

    #[test]
    fn test_chat_role_mapping() {
        assert_eq!(CohereProvider::chat_role("system"), "SYSTEM");
        assert_eq!(CohereProvider::chat_role("assistant"), "CHATBOT");
        assert_eq!(CohereProvider::chat_role("user"), "USER");
        assert_eq!(CohereProvider::chat_role("anything"), "USER");
    }
}
