//! Route table.
//!
//! Public auth routes are merged with the protected data and nlp routers;
//! everything protected sits behind the bearer middleware, which injects
//! the authenticated user.

use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{delete, get, post};
use axum::{middleware, Json, Router};
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::api::handlers;
use crate::auth::auth_middleware;
use crate::AppState;

async fn health() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "app": "quarry",
            "version": env!("CARGO_PKG_VERSION"),
        })),
    )
}

pub fn create_router(state: AppState) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/", get(health))
        .route("/auth/register", post(handlers::auth::register))
        .route("/auth/login", post(handlers::auth::login));

    // Protected routes (bearer token required)
    let protected_routes = Router::new()
        .route("/auth/me", get(handlers::auth::me))
        .route("/api/v1/data/projects", get(handlers::data::list_projects))
        .route(
            "/api/v1/data/projects/create/{project_code}",
            post(handlers::data::create_project),
        )
        .route(
            "/api/v1/data/projects/{project_code}",
            get(handlers::data::get_project).delete(handlers::data::delete_project),
        )
        .route("/api/v1/data/upload/{project_code}", post(handlers::data::upload))
        .route(
            "/api/v1/data/process/{project_code}",
            post(handlers::data::process),
        )
        .route(
            "/api/v1/data/file/content/{project_code}/{asset_id}",
            get(handlers::data::file_content),
        )
        .route(
            "/api/v1/data/file/{project_code}/{asset_id}",
            delete(handlers::data::delete_file),
        )
        .route(
            "/api/v1/nlp/index/push/{project_code}",
            post(handlers::nlp::index_push),
        )
        .route(
            "/api/v1/nlp/index/info/{project_code}",
            get(handlers::nlp::index_info),
        )
        .route(
            "/api/v1/nlp/index/search/{project_code}",
            post(handlers::nlp::search),
        )
        .route(
            "/api/v1/nlp/index/answer/{project_code}",
            post(handlers::nlp::answer),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    // Uploads are bounded by FILE_MAX_SIZE, plus multipart overhead
    let body_limit = state.settings.file_max_size as usize + 1024 * 1024;

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
