//! LLM provider clients and selection.
//!
//! The factory picks a concrete provider from configuration. A selected
//! backend without credentials yields the explicit [`Unavailable`]
//! provider; dependent endpoints then answer 503 instead of crashing.

pub mod cohere;
pub mod openai;
pub mod provider;
pub mod templates;

use std::sync::Arc;

use crate::llm::cohere::CohereProvider;
use crate::llm::openai::OpenAiProvider;
use crate::utils::config::Settings;

pub use provider::{ChatMessage, EmbedKind, Provider, Unavailable};
pub use templates::TemplateRegistry;

/// Build a provider for the given backend selector (`openai` | `cohere`).
pub fn create_provider(settings: &Settings, backend: &str) -> Arc<dyn Provider> {
    match backend {
        "openai" => match &settings.openai_api_key {
            Some(api_key) => Arc::new(OpenAiProvider::new(
                api_key.clone(),
                settings.openai_api_url.clone(),
                settings.generation_model_id.clone(),
                settings.embedding_model_id.clone(),
            )),
            None => {
                tracing::warn!("OPENAI_API_KEY not set; openai provider unavailable");
                Arc::new(Unavailable)
            }
        },
        "cohere" => match &settings.cohere_api_key {
            Some(api_key) => Arc::new(CohereProvider::new(
                api_key.clone(),
                settings.generation_model_id.clone(),
                settings.embedding_model_id.clone(),
            )),
            None => {
                tracing::warn!("COHERE_API_KEY not set; cohere provider unavailable");
                Arc::new(Unavailable)
            }
        },
        other => {
            tracing::warn!(backend = other, "unknown provider backend");
            Arc::new(Unavailable)
        }
    }
}
