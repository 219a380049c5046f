//! Runtime settings loaded from the environment.
//!
//! Settings are read once at startup (after `.env` is merged into the
//! process environment) and shared immutably behind an `Arc`. Missing
//! provider credentials never abort startup; the provider factories
//! downgrade the affected features to an explicit unavailable state.

use std::env;

/// Distance functions supported by the vector backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistanceMethod {
    Cosine,
    Dot,
}

impl DistanceMethod {
    fn parse(value: &str) -> Self {
        match value.to_lowercase().as_str() {
            "dot" => Self::Dot,
            _ => Self::Cosine,
        }
    }
}

/// Immutable application configuration.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Bind address for the HTTP server.
    pub host: String,
    /// Bind port for the HTTP server.
    pub port: u16,

    /// Path to the relational database file (`:memory:` for ephemeral).
    pub database_path: String,
    /// Root directory for uploaded project files.
    pub files_dir: String,

    /// Accepted upload extensions, lowercase, without dots.
    pub file_allowed_types: Vec<String>,
    /// Hard cap in bytes for a single upload.
    pub file_max_size: u64,
    /// Streaming read/write granularity for uploads, in bytes.
    pub file_default_chunk_size: usize,

    /// Generation provider selector (`openai` | `cohere`).
    pub generation_backend: String,
    /// Embedding provider selector (`openai` | `cohere`).
    pub embedding_backend: String,
    /// Vector backend selector (`qdrant` | `pgvector`).
    pub vector_db_backend: String,

    /// Model id used for text generation.
    pub generation_model_id: String,
    /// Model id used for embeddings.
    pub embedding_model_id: String,
    /// Dimensionality of the embedding vectors.
    pub embedding_model_size: u64,

    pub openai_api_key: Option<String>,
    pub openai_api_url: Option<String>,
    pub cohere_api_key: Option<String>,

    /// Qdrant URL or Postgres connection string, depending on the backend.
    pub vector_db_path: String,
    pub vector_db_distance_method: DistanceMethod,
    /// Row count past which the pgvector backend builds its ANN index.
    pub vector_db_pgvec_index_threshold: i64,

    /// Signing secret for access tokens.
    pub secret_key: String,
    /// JWT signing algorithm name (HS256 family).
    pub algorithm: String,
    /// Access token validity in minutes.
    pub access_token_expire_minutes: i64,

    /// Preferred template language.
    pub primary_lang: String,
    /// Fallback template language.
    pub default_lang: String,
}

impl Settings {
    /// Load settings from the process environment.
    pub fn from_env() -> Self {
        let secret_key = env::var("SECRET_KEY").unwrap_or_else(|_| {
            tracing::warn!(
                "SECRET_KEY not set, using a development default (not suitable for production)"
            );
            "quarry-dev-secret-key-change-me-in-prod".to_string()
        });

        Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: parse_or("PORT", 8000),

            database_path: env::var("DATABASE_PATH").unwrap_or_else(|_| "quarry.db".to_string()),
            files_dir: env::var("FILES_DIR").unwrap_or_else(|_| "projects".to_string()),

            file_allowed_types: env::var("FILE_ALLOWED_TYPES")
                .unwrap_or_else(|_| "pdf,txt".to_string())
                .split(',')
                .map(|ext| ext.trim().trim_start_matches('.').to_lowercase())
                .filter(|ext| !ext.is_empty())
                .collect(),
            file_max_size: parse_or("FILE_MAX_SIZE", 10 * 1024 * 1024),
            file_default_chunk_size: parse_or("FILE_DEFAULT_CHUNK_SIZE", 512_000),

            generation_backend: env::var("GENERATION_BACKEND")
                .unwrap_or_else(|_| "openai".to_string())
                .to_lowercase(),
            embedding_backend: env::var("EMBEDDING_BACKEND")
                .unwrap_or_else(|_| "openai".to_string())
                .to_lowercase(),
            vector_db_backend: env::var("VECTOR_DB_BACKEND")
                .unwrap_or_else(|_| "qdrant".to_string())
                .to_lowercase(),

            generation_model_id: env::var("GENERATION_MODEL_ID")
                .unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            embedding_model_id: env::var("EMBEDDING_MODEL_ID")
                .unwrap_or_else(|_| "text-embedding-3-small".to_string()),
            embedding_model_size: parse_or("EMBEDDING_MODEL_SIZE", 1536),

            openai_api_key: non_empty(env::var("OPENAI_API_KEY").ok()),
            openai_api_url: non_empty(env::var("OPENAI_API_URL").ok()),
            cohere_api_key: non_empty(env::var("COHERE_API_KEY").ok()),

            vector_db_path: env::var("VECTOR_DB_PATH")
                .unwrap_or_else(|_| "http://localhost:6334".to_string()),
            vector_db_distance_method: DistanceMethod::parse(
                &env::var("VECTOR_DB_DISTANCE_METHOD").unwrap_or_else(|_| "cosine".to_string()),
            ),
            vector_db_pgvec_index_threshold: parse_or("VECTOR_DB_PGVEC_INDEX_THRESHOLD", 100),

            secret_key,
            algorithm: env::var("ALGORITHM").unwrap_or_else(|_| "HS256".to_string()),
            access_token_expire_minutes: parse_or("ACCESS_TOKEN_EXPIRE_MINUTES", 30),

            primary_lang: env::var("PRIMARY_LANG").unwrap_or_else(|_| "en".to_string()),
            default_lang: env::var("DEFAULT_LANG").unwrap_or_else(|_| "en".to_string()),
        }
    }

    /// Whether an uploaded extension (lowercase, no dot) is accepted.
    pub fn is_allowed_type(&self, extension: &str) -> bool {
        self.file_allowed_types
            .iter()
            .any(|allowed| allowed == extension)
    }
}

fn parse_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(default)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_method_parse() {
        assert_eq!(DistanceMethod::parse("cosine"), DistanceMethod::Cosine);
        assert_eq!(DistanceMethod::parse("dot"), DistanceMethod::Dot);
        assert_eq!(DistanceMethod::parse("unknown"), DistanceMethod::Cosine);
    }

    #[test]
    fn test_non_empty_filters_blank_credentials() {
        assert_eq!(non_empty(Some("  ".to_string())), None);
        assert_eq!(non_empty(None), None);
        assert_eq!(
            non_empty(Some("sk-test".to_string())),
            Some("sk-test".to_string())
        );
    }
}
