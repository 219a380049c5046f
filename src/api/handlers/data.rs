//! Data-plane handlers: projects, upload, processing, file content.

use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::response::Response;
use axum::Json;
use serde_json::json;

use crate::auth::AuthUser;
use crate::errors::{success_response, ApiError, ApiResult, ErrorCode};
use crate::ingest::IngestionService;
use crate::projects::{project_json, ProjectService};
use crate::types::{PaginationQuery, ProcessRequest, ResponseSignal};
use crate::AppState;

// ============================================================================
// Projects
// ============================================================================

pub async fn list_projects(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Query(pagination): Query<PaginationQuery>,
) -> ApiResult<Response> {
    let (page, page_size) = pagination.clamp();

    let service = ProjectService::from_state(&state);
    let (projects, total_pages) = service.list(user.user_id, page, page_size).await?;

    Ok(success_response(
        "Projects retrieved successfully",
        json!({
            "projects": projects,
            "page": page,
            "page_size": page_size,
            "total_pages": total_pages,
        }),
        StatusCode::OK,
    ))
}

pub async fn create_project(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(project_code): Path<i64>,
) -> ApiResult<Response> {
    let service = ProjectService::from_state(&state);
    let project = service.create(user.user_id, project_code).await?;

    Ok(success_response(
        "Project created successfully",
        json!({ "project": project_json(&project) }),
        StatusCode::CREATED,
    ))
}

pub async fn get_project(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(project_code): Path<i64>,
) -> ApiResult<Response> {
    let service = ProjectService::from_state(&state);
    let details = service.details(user.user_id, project_code).await?;

    Ok(success_response(
        "Project retrieved successfully",
        json!({ "project": details }),
        StatusCode::OK,
    ))
}

pub async fn delete_project(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(project_code): Path<i64>,
) -> ApiResult<Response> {
    let service = ProjectService::from_state(&state);
    service.delete(user.user_id, project_code).await?;

    Ok(success_response(
        "Project deleted successfully",
        json!({ "project_id": project_code }),
        StatusCode::OK,
    ))
}

// ============================================================================
// Upload & processing
// ============================================================================

pub async fn upload(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(project_code): Path<i64>,
    mut multipart: Multipart,
) -> ApiResult<Response> {
    let field = loop {
        match multipart.next_field().await {
            Ok(Some(field)) if field.file_name().is_some() => break field,
            Ok(Some(_)) => continue,
            Ok(None) => {
                return Err(ApiError::new(ErrorCode::ValidationError)
                    .with_details(json!({ "reason": "multipart file field required" })))
            }
            Err(err) => {
                tracing::error!(%err, "malformed multipart body");
                return Err(ApiError::new(ErrorCode::FileUploadFailed));
            }
        }
    };

    let original_name = field
        .file_name()
        .map(str::to_string)
        .unwrap_or_default();

    let service = IngestionService::from_state(&state);
    let (_project, asset) = service
        .upload(user.user_id, project_code, &original_name, field)
        .await?;

    Ok(success_response(
        "File uploaded successfully",
        json!({
            "signal": ResponseSignal::FileUploadSuccess,
            "file_id": asset.asset_id.to_string(),
            "file_name": asset.asset_name,
        }),
        StatusCode::OK,
    ))
}

pub async fn process(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(project_code): Path<i64>,
    Json(request): Json<ProcessRequest>,
) -> ApiResult<Response> {
    let service = IngestionService::from_state(&state);
    let outcome = service.process(user.user_id, project_code, &request).await?;

    let mut data = json!({
        "signal": ResponseSignal::ProcessingSuccess,
        "inserted_chunks": outcome.inserted_chunks,
        "processed_files": outcome.processed_files,
        "total_files": outcome.total_files,
    });

    // Partial success stays a 200; the failures ride along as a warning
    if !outcome.failed_files.is_empty() {
        data["failed_files"] = json!(outcome.failed_files);
        data["warning"] = json!(format!(
            "{} file(s) could not be processed",
            outcome.failed_files.len()
        ));
    }

    Ok(success_response(
        "Processing completed",
        data,
        StatusCode::OK,
    ))
}

// ============================================================================
// File content & deletion
// ============================================================================

pub async fn file_content(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path((project_code, asset_id)): Path<(i64, String)>,
) -> ApiResult<Response> {
    let service = IngestionService::from_state(&state);
    let content = service
        .file_content(user.user_id, project_code, &asset_id)
        .await?;

    Ok(success_response(
        "File content retrieved successfully",
        json!({ "content": content }),
        StatusCode::OK,
    ))
}

pub async fn delete_file(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path((project_code, asset_id)): Path<(i64, String)>,
) -> ApiResult<Response> {
    let service = IngestionService::from_state(&state);
    let removed_chunks = service
        .delete_asset(user.user_id, project_code, &asset_id)
        .await?;

    Ok(success_response(
        "File deleted successfully",
        json!({ "removed_chunks": removed_chunks }),
        StatusCode::OK,
    ))
}
