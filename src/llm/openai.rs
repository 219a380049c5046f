//! OpenAI-compatible provider.
//!
//! Chat completions go through the `async-openai` client; embeddings use
//! a plain JSON call against the `/embeddings` endpoint so the same code
//! works for OpenAI-compatible gateways that only implement the wire
//! format.

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use serde_json::json;

use crate::errors::ApiResult;
use crate::llm::provider::{ChatMessage, EmbedKind, Provider};

const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

/// OpenAI-compatible provider (OpenAI, Azure-style gateways, local
/// OpenAI-format servers).
pub struct OpenAiProvider {
    chat: Client<OpenAIConfig>,
    http: reqwest::Client,
    api_key: String,
    api_base: String,
    generation_model_id: String,
    embedding_model_id: String,
}

impl OpenAiProvider {
    pub fn new(
        api_key: String,
        api_base: Option<String>,
        generation_model_id: String,
        embedding_model_id: String,
    ) -> Self {
        let api_base = api_base
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string())
            .trim_end_matches('/')
            .to_string();

        let config = OpenAIConfig::new()
            .with_api_key(api_key.clone())
            .with_api_base(api_base.clone());

        Self {
            chat: Client::with_config(config),
            http: reqwest::Client::new(),
            api_key,
            api_base,
            generation_model_id,
            embedding_model_id,
        }
    }

    fn to_request_message(message: &ChatMessage) -> Option<ChatCompletionRequestMessage> {
        match message.role.as_str() {
            "system" => ChatCompletionRequestSystemMessageArgs::default()
                .content(message.content.as_str())
                .build()
                .ok()
                .map(ChatCompletionRequestMessage::System),
            "assistant" => ChatCompletionRequestAssistantMessageArgs::default()
                .content(message.content.as_str())
                .build()
                .ok()
                .map(ChatCompletionRequestMessage::Assistant),
            _ => ChatCompletionRequestUserMessageArgs::default()
                .content(message.content.as_str())
                .build()
                .ok()
                .map(ChatCompletionRequestMessage::User),
        }
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    fn system_role(&self) -> &'static str {
        "system"
    }

    fn normalize_text(&self, text: &str) -> String {
        text.replace('\n', " ").trim().to_string()
    }

    async fn embed(&self, texts: &[String], _kind: EmbedKind) -> ApiResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let payload = json!({
            "model": self.embedding_model_id,
            "input": texts,
        });

        let response = match self
            .http
            .post(format!("{}/embeddings", self.api_base))
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

        let Some(data) = body.get("data").and_then(|d| d.as_array()) else {
            tracing::warn!(provider = self.name(), "embedding response missing data");
            return Ok(vec![]);
        };

        let vectors: Vec<Vec<f32>> = data
            .iter()
            .filter_map(|item| {
                item.get("embedding").and_then(|e| e.as_array()).map(|arr| {
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
        let mut messages: Vec<ChatCompletionRequestMessage> =
            history.iter().filter_map(Self::to_request_message).collect();

        let user_message = ChatMessage {
            role: "user".to_string(),
            content: prompt.to_string(),
        };
        if let Some(message) = Self::to_request_message(&user_message) {
            messages.push(message);
        }

        let request = match CreateChatCompletionRequestArgs::default()
            .model(&self.generation_model_id)
            .messages(messages)
            .build()
        {
            Ok(request) => request,
            Err(err) => {
                tracing::warn!(provider = self.name(), %err, "failed to build chat request");
                return Ok(String::new());
            }
        };

        match self.chat.chat().create(request).await {
            Ok(response) => Ok(response
                .choices
                .first()
                .and_then(|choice| choice.message.content.clone())
                .unwrap_or_default()),
            Err(err) => {
                tracing::warn!(provider = self.name(), %err, "chat completion failed");
                Ok(String::new())
            }
        }
    }
}
