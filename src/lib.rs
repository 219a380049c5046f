//! # Quarry
//!
//! A multi-tenant retrieval-augmented question-answering server.
//!
//! Authenticated users upload documents into named projects; quarry
//! parses them, splits them into semantically coherent chunks, embeds
//! each chunk, stores the vectors in a per-project collection and
//! answers free-form questions by conditioning a generation model on the
//! retrieved context.
//!
//! ## Overview
//!
//! Quarry can be used in two ways:
//!
//! 1. **As a standalone server** - Run the `quarry-server` binary
//! 2. **As a library** - Import components into your own Rust project
//!
//! ## Modules
//!
//! - [`api`] - REST API handlers and routes
//! - [`auth`] - JWT authentication and middleware
//! - [`db`] - Relational store adapters (users, projects, assets, chunks)
//! - [`llm`] - Embedding/generation providers and prompt templates
//! - [`vectordb`] - Vector index backends (Qdrant, pgvector)
//! - [`rag`] - Chunking and the retrieval/answer pipeline
//! - [`ingest`] - Upload and document processing pipeline
//! - [`projects`] - Project lifecycle and tenant isolation
//! - [`errors`] - Error taxonomy and the response envelope

/// HTTP API handlers and routes.
pub mod api;
/// JWT authentication and middleware.
pub mod auth;
/// Relational store adapters over libsql.
pub mod db;
/// Error taxonomy and response envelope.
pub mod errors;
/// Upload and document processing pipeline.
pub mod ingest;
/// LLM provider clients and prompt templates.
pub mod llm;
/// Project lifecycle service.
pub mod projects;
/// RAG components: chunker and retrieval service.
pub mod rag;
/// Core wire types.
pub mod types;
/// Shared utilities (configuration).
pub mod utils;
/// Vector index clients.
pub mod vectordb;

use std::sync::Arc;

// Re-export commonly used types
pub use errors::{ApiError, ApiResult, ErrorCode};
pub use utils::config::Settings;

use crate::auth::AuthService;
use crate::db::{AssetStore, ChunkStore, DbClient, ProjectStore, QueryLogStore, UserStore};
use crate::llm::{Provider, TemplateRegistry};
use crate::vectordb::VectorStore;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Immutable runtime configuration.
    pub settings: Arc<Settings>,
    /// Relational database handle.
    pub db: Arc<DbClient>,
    /// User store.
    pub user_store: Arc<UserStore>,
    /// Project store.
    pub project_store: Arc<ProjectStore>,
    /// Asset store.
    pub asset_store: Arc<AssetStore>,
    /// Chunk store.
    pub chunk_store: Arc<ChunkStore>,
    /// Query log store.
    pub query_log_store: Arc<QueryLogStore>,
    /// Provider used for text generation.
    pub generation_provider: Arc<dyn Provider>,
    /// Provider used for embeddings.
    pub embedding_provider: Arc<dyn Provider>,
    /// Vector backend; `None` when unavailable (nlp endpoints answer 503).
    pub vector_store: Option<Arc<dyn VectorStore>>,
    /// Prompt template registry.
    pub templates: Arc<TemplateRegistry>,
    /// Token/password service.
    pub auth_service: Arc<AuthService>,
}

impl AppState {
    /// Wire up the full application state from settings. Providers
    /// without credentials degrade to unavailable instead of failing.
    pub async fn build(settings: Settings) -> ApiResult<Self> {
        let db = Arc::new(if settings.database_path == ":memory:" {
            DbClient::new_memory().await?
        } else {
            DbClient::new_local(&settings.database_path).await?
        });

        let generation_provider = llm::create_provider(&settings, &settings.generation_backend);
        let embedding_provider = llm::create_provider(&settings, &settings.embedding_backend);

        // The vector index is useless without embeddings; treat the pair
        // as one availability unit the way the nlp surface reports it
        let vector_store = if embedding_provider.is_available() {
            vectordb::create_vector_store(&settings)
        } else {
            tracing::warn!("embedding provider unavailable; vector features disabled");
            None
        };

        let templates = Arc::new(TemplateRegistry::new(
            &settings.primary_lang,
            &settings.default_lang,
        ));

        let auth_service = Arc::new(AuthService::new(
            settings.secret_key.clone(),
            &settings.algorithm,
            settings.access_token_expire_minutes,
        ));

        Ok(Self {
            settings: Arc::new(settings),
            user_store: Arc::new(UserStore::new(db.clone())),
            project_store: Arc::new(ProjectStore::new(db.clone())),
            asset_store: Arc::new(AssetStore::new(db.clone())),
            chunk_store: Arc::new(ChunkStore::new(db.clone())),
            query_log_store: Arc::new(QueryLogStore::new(db.clone())),
            db,
            generation_provider,
            embedding_provider,
            vector_store,
            templates,
            auth_service,
        })
    }
}
