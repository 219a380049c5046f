//! Shared test harness: in-memory database, no provider credentials,
//! uploads under a temp directory.

use std::path::Path;

use axum_test::TestServer;
use quarry::utils::config::DistanceMethod;
use quarry::{api, AppState, Settings};
use serde_json::{json, Value};

pub fn test_settings(files_dir: &Path) -> Settings {
    Settings {
        host: "127.0.0.1".to_string(),
        port: 0,
        database_path: ":memory:".to_string(),
        files_dir: files_dir.to_string_lossy().to_string(),
        file_allowed_types: vec!["pdf".to_string(), "txt".to_string()],
        file_max_size: 10 * 1024 * 1024,
        file_default_chunk_size: 512_000,
        generation_backend: "openai".to_string(),
        embedding_backend: "openai".to_string(),
        vector_db_backend: "qdrant".to_string(),
        generation_model_id: "gpt-4o-mini".to_string(),
        embedding_model_id: "text-embedding-3-small".to_string(),
        embedding_model_size: 1536,
        openai_api_key: None,
        openai_api_url: None,
        cohere_api_key: None,
        vector_db_path: "http://localhost:6334".to_string(),
        vector_db_distance_method: DistanceMethod::Cosine,
        vector_db_pgvec_index_threshold: 100,
        secret_key: "test-secret-key-that-is-at-least-32-chars".to_string(),
        algorithm: "HS256".to_string(),
        access_token_expire_minutes: 30,
        primary_lang: "en".to_string(),
        default_lang: "en".to_string(),
    }
}

pub async fn test_server(files_dir: &Path) -> TestServer {
    test_server_with(test_settings(files_dir)).await
}

pub async fn test_server_with(settings: Settings) -> TestServer {
    let state = AppState::build(settings).await.expect("state should build");
    TestServer::new(api::create_router(state)).expect("server should start")
}

/// Register a user and log in; returns the bearer token.
pub async fn register_and_login(server: &TestServer, email: &str, password: &str) -> String {
    let response = server
        .post("/auth/register")
        .json(&json!({ "email": email, "password": password }))
        .await;
    response.assert_status_ok();

    let response = server
        .post("/auth/login")
        .form(&[("username", email), ("password", password)])
        .await;
    response.assert_status_ok();

    let body: Value = response.json();
    body["data"]["access_token"]
        .as_str()
        .expect("login should return a token")
        .to_string()
}
