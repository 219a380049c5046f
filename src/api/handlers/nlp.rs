//! Retrieval-plane handlers: index push, collection info, search, answer.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Response;
use axum::Json;
use serde_json::json;

use crate::auth::AuthUser;
use crate::errors::{success_response, ApiError, ApiResult, ErrorCode};
use crate::rag::RetrievalService;
use crate::types::{PushRequest, ResponseSignal, SearchRequest};
use crate::AppState;

pub async fn index_push(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(project_code): Path<i64>,
    Json(request): Json<PushRequest>,
) -> ApiResult<Response> {
    let service = RetrievalService::from_state(&state);
    let inserted_items_count = service
        .index_push(
            user.user_id,
            project_code,
            request.do_reset.unwrap_or(0) == 1,
        )
        .await?;

    Ok(success_response(
        "Project indexed successfully",
        json!({
            "signal": ResponseSignal::InsertIntoVectordbSuccess,
            "inserted_items_count": inserted_items_count,
        }),
        StatusCode::OK,
    ))
}

pub async fn index_info(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(project_code): Path<i64>,
) -> ApiResult<Response> {
    let service = RetrievalService::from_state(&state);
    let (collection_name, info) = service.index_info(user.user_id, project_code).await?;

    let collection_info = match info {
        Some(info) => json!({
            "collection_name": collection_name,
            "vectors_count": info.vectors_count,
            "points_count": info.points_count,
            "segments_count": info.segments_count,
            "status": info.status,
        }),
        None => json!({
            "collection_name": collection_name,
            "vectors_count": 0,
            "points_count": 0,
            "segments_count": 0,
            "status": "unknown",
        }),
    };

    Ok(success_response(
        "Collection info retrieved successfully",
        json!({
            "signal": ResponseSignal::VectordbCollectionRetrieved,
            "collection_info": collection_info,
        }),
        StatusCode::OK,
    ))
}

pub async fn search(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(project_code): Path<i64>,
    Json(request): Json<SearchRequest>,
) -> ApiResult<Response> {
    let service = RetrievalService::from_state(&state);
    let results = service
        .search(user.user_id, project_code, &request.text, request.limit)
        .await?;

    if results.is_empty() {
        return Err(
            ApiError::new(ErrorCode::VectordbSearchFailed).with_status(StatusCode::BAD_REQUEST)
        );
    }

    Ok(success_response(
        "Search completed successfully",
        json!({
            "signal": ResponseSignal::VectordbSearchSuccess,
            "results": results,
        }),
        StatusCode::OK,
    ))
}

pub async fn answer(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(project_code): Path<i64>,
    Json(request): Json<SearchRequest>,
) -> ApiResult<Response> {
    let service = RetrievalService::from_state(&state);
    let outcome = service
        .answer(user.user_id, project_code, &request.text, request.limit)
        .await?;

    Ok(success_response(
        "Answer generated successfully",
        json!({
            "signal": ResponseSignal::RagAnswerSuccess,
            "answer": outcome.answer,
            "full_prompt": outcome.full_prompt,
            "chat_history": outcome.chat_history,
            "response_time_ms": outcome.response_time_ms,
        }),
        StatusCode::OK,
    ))
}
