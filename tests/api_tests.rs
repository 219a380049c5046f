//! HTTP-level tests against the full router: auth flows, tenant
//! isolation, upload validation, processing semantics and the provider
//! outage behavior of the nlp surface.

mod common;

use axum_test::multipart::{MultipartForm, Part};
use axum_test::TestServer;
use serde_json::{json, Value};

use common::{register_and_login, test_server, test_server_with, test_settings};

fn bearer(token: &str) -> String {
    format!("Bearer {}", token)
}

async fn upload_text(
    server: &TestServer,
    token: &str,
    project_code: i64,
    file_name: &str,
    content: &str,
) -> Value {
    let form = MultipartForm::new().add_part(
        "file",
        Part::bytes(content.as_bytes().to_vec())
            .file_name(file_name)
            .mime_type("text/plain"),
    );

    let response = server
        .post(&format!("/api/v1/data/upload/{}", project_code))
        .add_header(axum::http::header::AUTHORIZATION, bearer(token))
        .multipart(form)
        .await;
    response.assert_status_ok();

    response.json()
}

// ============================================================================
// Auth
// ============================================================================

#[tokio::test]
async fn test_register_login_me_flow() {
    let dir = tempfile::tempdir().unwrap();
    let server = test_server(dir.path()).await;

    let response = server
        .post("/auth/register")
        .json(&json!({ "email": "alice@example.com", "password": "password1" }))
        .await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["data"]["email"], "alice@example.com");
    assert_eq!(body["data"]["is_active"], true);
    assert!(body["data"]["user_id"].is_i64());

    let token = register_and_login(&server, "bob@example.com", "password1").await;

    let response = server
        .get("/auth/me")
        .add_header(axum::http::header::AUTHORIZATION, bearer(&token))
        .await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["data"]["email"], "bob@example.com");
}

#[tokio::test]
async fn test_register_duplicate_email_conflicts() {
    let dir = tempfile::tempdir().unwrap();
    let server = test_server(dir.path()).await;

    let payload = json!({ "email": "dup@example.com", "password": "password1" });
    server.post("/auth/register").json(&payload).await.assert_status_ok();

    let response = server.post("/auth/register").json(&payload).await;
    assert_eq!(response.status_code(), 409);

    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "AUTH_USER_ALREADY_EXISTS");
    assert_eq!(body["error"]["category"], "authentication");
}

#[tokio::test]
async fn test_login_failures() {
    let dir = tempfile::tempdir().unwrap();
    let server = test_server(dir.path()).await;

    server
        .post("/auth/register")
        .json(&json!({ "email": "carol@example.com", "password": "password1" }))
        .await
        .assert_status_ok();

    let response = server
        .post("/auth/login")
        .form(&[("username", "nobody@example.com"), ("password", "password1")])
        .await;
    assert_eq!(response.status_code(), 401);
    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "AUTH_USER_NOT_FOUND");

    let response = server
        .post("/auth/login")
        .form(&[("username", "carol@example.com"), ("password", "wrong-password")])
        .await;
    assert_eq!(response.status_code(), 401);
    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "AUTH_INVALID_CREDENTIALS");
}

#[tokio::test]
async fn test_protected_routes_require_token() {
    let dir = tempfile::tempdir().unwrap();
    let server = test_server(dir.path()).await;

    let response = server.get("/api/v1/data/projects").await;
    assert_eq!(response.status_code(), 401);

    let response = server
        .get("/api/v1/data/projects")
        .add_header(axum::http::header::AUTHORIZATION, "Bearer not.a.real.token")
        .await;
    assert_eq!(response.status_code(), 401);
    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "AUTH_INVALID_TOKEN");
}

// ============================================================================
// Projects
// ============================================================================

#[tokio::test]
async fn test_create_project_then_duplicate_conflicts_with_details() {
    let dir = tempfile::tempdir().unwrap();
    let server = test_server(dir.path()).await;
    let token = register_and_login(&server, "dave@example.com", "password1").await;

    let response = server
        .post("/api/v1/data/projects/create/7")
        .add_header(axum::http::header::AUTHORIZATION, bearer(&token))
        .await;
    response.assert_status(axum::http::StatusCode::CREATED);
    let body: Value = response.json();
    assert_eq!(body["data"]["project"]["project_id"], 7);

    let response = server
        .post("/api/v1/data/projects/create/7")
        .add_header(axum::http::header::AUTHORIZATION, bearer(&token))
        .await;
    assert_eq!(response.status_code(), 409);
    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "PROJECT_ALREADY_EXISTS");
    assert_eq!(body["error"]["details"]["project"]["project_id"], 7);
}

#[tokio::test]
async fn test_tenant_isolation() {
    let dir = tempfile::tempdir().unwrap();
    let server = test_server(dir.path()).await;

    let token_u1 = register_and_login(&server, "u1@example.com", "password1").await;
    let token_u2 = register_and_login(&server, "u2@example.com", "password1").await;

    // Both users own a project with the same code
    for token in [&token_u1, &token_u2] {
        server
            .post("/api/v1/data/projects/create/1")
            .add_header(axum::http::header::AUTHORIZATION, bearer(token))
            .await
            .assert_status(axum::http::StatusCode::CREATED);
    }

    upload_text(&server, &token_u1, 1, "a.txt", "only for u1").await;

    // u2 sees exactly their own empty project, never u1's data
    let response = server
        .get("/api/v1/data/projects")
        .add_header(axum::http::header::AUTHORIZATION, bearer(&token_u2))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    let projects = body["data"]["projects"].as_array().unwrap();
    assert_eq!(projects.len(), 1);
    assert_eq!(projects[0]["asset_count"], 0);

    // A code the user does not own reads as missing, not forbidden
    let response = server
        .get("/api/v1/data/projects/99")
        .add_header(axum::http::header::AUTHORIZATION, bearer(&token_u2))
        .await;
    assert_eq!(response.status_code(), 404);
    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "PROJECT_NOT_FOUND");
}

#[tokio::test]
async fn test_project_list_pagination_clamps() {
    let dir = tempfile::tempdir().unwrap();
    let server = test_server(dir.path()).await;
    let token = register_and_login(&server, "page@example.com", "password1").await;

    server
        .post("/api/v1/data/projects/create/1")
        .add_header(axum::http::header::AUTHORIZATION, bearer(&token))
        .await
        .assert_status(axum::http::StatusCode::CREATED);

    let response = server
        .get("/api/v1/data/projects?page=0&page_size=101")
        .add_header(axum::http::header::AUTHORIZATION, bearer(&token))
        .await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["data"]["page"], 1);
    assert_eq!(body["data"]["page_size"], 10);
}

#[tokio::test]
async fn test_project_delete_cascades() {
    let dir = tempfile::tempdir().unwrap();
    let server = test_server(dir.path()).await;
    let token = register_and_login(&server, "del@example.com", "password1").await;

    upload_text(&server, &token, 3, "doc.txt", "line one\nline two").await;

    let response = server
        .delete("/api/v1/data/projects/3")
        .add_header(axum::http::header::AUTHORIZATION, bearer(&token))
        .await;
    response.assert_status_ok();

    let response = server
        .get("/api/v1/data/projects/3")
        .add_header(axum::http::header::AUTHORIZATION, bearer(&token))
        .await;
    assert_eq!(response.status_code(), 404);
}

// ============================================================================
// Upload
// ============================================================================

#[tokio::test]
async fn test_upload_rejects_unsupported_type() {
    let dir = tempfile::tempdir().unwrap();
    let server = test_server(dir.path()).await;
    let token = register_and_login(&server, "ext@example.com", "password1").await;

    let form = MultipartForm::new().add_part(
        "file",
        Part::bytes(b"binary".to_vec())
            .file_name("tool.exe")
            .mime_type("application/octet-stream"),
    );

    let response = server
        .post("/api/v1/data/upload/1")
        .add_header(axum::http::header::AUTHORIZATION, bearer(&token))
        .multipart(form)
        .await;
    assert_eq!(response.status_code(), 400);

    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "FILE_TYPE_NOT_SUPPORTED");
}

#[tokio::test]
async fn test_upload_rejects_oversized_file() {
    let dir = tempfile::tempdir().unwrap();
    let mut settings = test_settings(dir.path());
    settings.file_max_size = 16;
    let server = test_server_with(settings).await;
    let token = register_and_login(&server, "big@example.com", "password1").await;

    let form = MultipartForm::new().add_part(
        "file",
        Part::bytes(vec![b'a'; 17])
            .file_name("big.txt")
            .mime_type("text/plain"),
    );

    let response = server
        .post("/api/v1/data/upload/1")
        .add_header(axum::http::header::AUTHORIZATION, bearer(&token))
        .multipart(form)
        .await;
    assert_eq!(response.status_code(), 400);

    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "FILE_SIZE_EXCEEDED");
}

#[tokio::test]
async fn test_upload_cleanses_filename_and_stores_blob() {
    let dir = tempfile::tempdir().unwrap();
    let server = test_server(dir.path()).await;
    let token = register_and_login(&server, "clean@example.com", "password1").await;

    let body = upload_text(&server, &token, 1, "my doc (final)!.txt", "hello world").await;

    assert_eq!(body["data"]["signal"], "FILE_UPLOAD_SUCCESS");
    let file_name = body["data"]["file_name"].as_str().unwrap();
    assert!(file_name.ends_with("_my_doc_final.txt"), "got {file_name}");

    let prefix = file_name.strip_suffix("_my_doc_final.txt").unwrap();
    assert_eq!(prefix.len(), 12);
    assert!(prefix.chars().all(|c| c.is_ascii_alphanumeric()));

    // The blob is on disk under the project directory with the final size
    let blob = walkdir(dir.path())
        .into_iter()
        .find(|path| path.ends_with(file_name))
        .expect("blob should exist");
    let size = std::fs::metadata(dir.path().join(blob)).unwrap().len();
    assert_eq!(size, "hello world".len() as u64);
}

fn walkdir(root: &std::path::Path) -> Vec<String> {
    let mut found = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        let Ok(entries) = std::fs::read_dir(&dir) else {
            continue;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
            } else {
                found.push(
                    path.strip_prefix(root)
                        .unwrap()
                        .to_string_lossy()
                        .to_string(),
                );
            }
        }
    }
    found
}

// ============================================================================
// Processing
// ============================================================================

#[tokio::test]
async fn test_process_without_files_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let server = test_server(dir.path()).await;
    let token = register_and_login(&server, "empty@example.com", "password1").await;

    server
        .post("/api/v1/data/projects/create/1")
        .add_header(axum::http::header::AUTHORIZATION, bearer(&token))
        .await
        .assert_status(axum::http::StatusCode::CREATED);

    let response = server
        .post("/api/v1/data/process/1")
        .add_header(axum::http::header::AUTHORIZATION, bearer(&token))
        .json(&json!({ "chunking_method": "simple" }))
        .await;
    assert_eq!(response.status_code(), 400);

    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "PROCESSING_NO_FILES");
}

#[tokio::test]
async fn test_process_unknown_file_id_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let server = test_server(dir.path()).await;
    let token = register_and_login(&server, "badfile@example.com", "password1").await;

    upload_text(&server, &token, 1, "a.txt", "content").await;

    let response = server
        .post("/api/v1/data/process/1")
        .add_header(axum::http::header::AUTHORIZATION, bearer(&token))
        .json(&json!({ "file_id": "does-not-exist", "chunking_method": "simple" }))
        .await;
    assert_eq!(response.status_code(), 404);

    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "FILE_NOT_FOUND");
}

#[tokio::test]
async fn test_process_and_reset_semantics() {
    let dir = tempfile::tempdir().unwrap();
    let server = test_server(dir.path()).await;
    let token = register_and_login(&server, "proc@example.com", "password1").await;

    upload_text(
        &server,
        &token,
        1,
        "facts.txt",
        "The capital of France is Paris.",
    )
    .await;

    let process = |do_reset: u8| {
        server
            .post("/api/v1/data/process/1")
            .add_header(axum::http::header::AUTHORIZATION, bearer(&token))
            .json(&json!({
                "chunk_size": 100,
                "overlap_size": 20,
                "do_reset": do_reset,
                "chunking_method": "simple",
            }))
    };

    let response = process(0).await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["data"]["signal"], "PROCESSING_SUCCESS");
    assert_eq!(body["data"]["inserted_chunks"], 1);
    assert_eq!(body["data"]["processed_files"], 1);
    assert_eq!(body["data"]["total_files"], 1);
    assert!(body["data"].get("failed_files").is_none());

    let chunk_count = |body: &Value| body["data"]["project"]["chunk_count"].as_i64().unwrap();

    // Append without reset: duplicates allowed
    process(0).await.assert_status_ok();
    let details: Value = server
        .get("/api/v1/data/projects/1")
        .add_header(axum::http::header::AUTHORIZATION, bearer(&token))
        .await
        .json();
    assert_eq!(chunk_count(&details), 2);

    // Reset replaces previous chunks
    process(1).await.assert_status_ok();
    let details: Value = server
        .get("/api/v1/data/projects/1")
        .add_header(axum::http::header::AUTHORIZATION, bearer(&token))
        .await
        .json();
    assert_eq!(chunk_count(&details), 1);
}

#[tokio::test]
async fn test_file_content_endpoint() {
    let dir = tempfile::tempdir().unwrap();
    let server = test_server(dir.path()).await;
    let token = register_and_login(&server, "content@example.com", "password1").await;

    let body = upload_text(
        &server,
        &token,
        1,
        "facts.txt",
        "The capital of France is Paris.",
    )
    .await;
    let file_id = body["data"]["file_id"].as_str().unwrap().to_string();

    let response = server
        .get(&format!("/api/v1/data/file/content/1/{}", file_id))
        .add_header(axum::http::header::AUTHORIZATION, bearer(&token))
        .await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert!(body["data"]["content"]
        .as_str()
        .unwrap()
        .contains("Paris"));
}

#[tokio::test]
async fn test_delete_file_removes_chunks_and_blob() {
    let dir = tempfile::tempdir().unwrap();
    let server = test_server(dir.path()).await;
    let token = register_and_login(&server, "rmfile@example.com", "password1").await;

    let body = upload_text(&server, &token, 1, "gone.txt", "some text to chunk").await;
    let file_id = body["data"]["file_id"].as_str().unwrap().to_string();

    server
        .post("/api/v1/data/process/1")
        .add_header(axum::http::header::AUTHORIZATION, bearer(&token))
        .json(&json!({ "chunking_method": "simple" }))
        .await
        .assert_status_ok();

    let response = server
        .delete(&format!("/api/v1/data/file/1/{}", file_id))
        .add_header(axum::http::header::AUTHORIZATION, bearer(&token))
        .await;
    response.assert_status_ok();

    let details: Value = server
        .get("/api/v1/data/projects/1")
        .add_header(axum::http::header::AUTHORIZATION, bearer(&token))
        .await
        .json();
    assert_eq!(details["data"]["project"]["asset_count"], 0);
    assert_eq!(details["data"]["project"]["chunk_count"], 0);
}

// ============================================================================
// Provider outage (nlp surface)
// ============================================================================

#[tokio::test]
async fn test_nlp_endpoints_answer_503_without_credentials() {
    let dir = tempfile::tempdir().unwrap();
    let server = test_server(dir.path()).await;
    let token = register_and_login(&server, "outage@example.com", "password1").await;

    // Data plane keeps working
    upload_text(&server, &token, 1, "a.txt", "some data").await;
    server
        .post("/api/v1/data/process/1")
        .add_header(axum::http::header::AUTHORIZATION, bearer(&token))
        .json(&json!({ "chunking_method": "simple" }))
        .await
        .assert_status_ok();

    // NLP plane is explicitly unavailable
    for (method, path, body) in [
        ("post", "/api/v1/nlp/index/push/1", json!({ "do_reset": 1 })),
        ("get", "/api/v1/nlp/index/info/1", Value::Null),
        (
            "post",
            "/api/v1/nlp/index/search/1",
            json!({ "text": "anything", "limit": 3 }),
        ),
        (
            "post",
            "/api/v1/nlp/index/answer/1",
            json!({ "text": "anything", "limit": 3 }),
        ),
    ] {
        let response = match method {
            "get" => {
                server
                    .get(path)
                    .add_header(axum::http::header::AUTHORIZATION, bearer(&token))
                    .await
            }
            _ => {
                server
                    .post(path)
                    .add_header(axum::http::header::AUTHORIZATION, bearer(&token))
                    .json(&body)
                    .await
            }
        };

        assert_eq!(response.status_code(), 503, "{path} should be unavailable");
        let body: Value = response.json();
        assert_eq!(body["error"]["code"], "NLP_SERVICE_UNAVAILABLE");
    }
}
