//! Authentication handlers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Response;
use axum::{Form, Json};
use serde_json::json;

use crate::auth::AuthUser;
use crate::errors::{success_response, ApiError, ApiResult, ErrorCode};
use crate::types::{LoginForm, RegisterRequest};
use crate::AppState;

/// Register a new user.
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> ApiResult<Response> {
    if payload.email.trim().is_empty() || !payload.email.contains('@') {
        return Err(ApiError::new(ErrorCode::ValidationError)
            .with_details(json!({ "field": "email" })));
    }
    if payload.password.len() < 8 {
        return Err(ApiError::new(ErrorCode::ValidationError)
            .with_details(json!({ "field": "password", "reason": "at least 8 characters" })));
    }

    let email = payload.email.trim().to_lowercase();

    if state.user_store.get_by_email(&email).await?.is_some() {
        return Err(ApiError::new(ErrorCode::AuthUserAlreadyExists));
    }

    let hashed_password = state.auth_service.hash_password(&payload.password)?;
    let user = state.user_store.insert(&email, &hashed_password).await?;

    tracing::info!(user_id = user.user_id, "user registered");

    Ok(success_response(
        "User registered successfully",
        json!({
            "user_id": user.user_id,
            "email": user.email,
            "is_active": user.is_active,
        }),
        StatusCode::OK,
    ))
}

/// Login with email and password (form-encoded, OAuth2 password style).
pub async fn login(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> ApiResult<Response> {
    let user = state
        .user_store
        .get_by_email(form.username.trim())
        .await?
        .ok_or(ApiError::new(ErrorCode::AuthUserNotFound))?;

    if !state
        .auth_service
        .verify_password(&form.password, &user.hashed_password)?
    {
        return Err(ApiError::new(ErrorCode::AuthInvalidCredentials));
    }

    if !user.is_active {
        return Err(ApiError::new(ErrorCode::AuthInactiveUser));
    }

    let access_token = state.auth_service.generate_access_token(user.user_id)?;

    Ok(success_response(
        "Login successful",
        json!({
            "access_token": access_token,
            "token_type": "bearer",
            "user_id": user.user_id,
            "email": user.email,
        }),
        StatusCode::OK,
    ))
}

/// Current user information.
pub async fn me(AuthUser(user): AuthUser) -> ApiResult<Response> {
    Ok(success_response(
        "User information retrieved successfully",
        json!({
            "user_id": user.user_id,
            "email": user.email,
            "is_active": user.is_active,
        }),
        StatusCode::OK,
    ))
}
