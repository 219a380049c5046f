//! Bearer-token middleware and the authenticated-user extractor.
//!
//! The middleware verifies the JWT, loads the user row and injects a
//! [`CurrentUser`] into request extensions. Handlers receive it through
//! the [`AuthUser`] extractor, so every protected route re-verifies the
//! principal on each request.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::Response,
};

use crate::errors::{ApiError, ErrorCode};
use crate::types::CurrentUser;
use crate::AppState;

pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or(ApiError::new(ErrorCode::AuthInvalidToken))?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or(ApiError::new(ErrorCode::AuthInvalidToken))?;

    let claims = state.auth_service.verify_token(token)?;

    let user_id: i64 = claims
        .sub
        .parse()
        .map_err(|_| ApiError::new(ErrorCode::AuthInvalidToken))?;

    let user = state
        .user_store
        .get_by_id(user_id)
        .await?
        .ok_or(ApiError::new(ErrorCode::AuthInvalidToken))?;

    if !user.is_active {
        return Err(ApiError::new(ErrorCode::AuthInactiveUser));
    }

    req.extensions_mut().insert(CurrentUser {
        user_id: user.user_id,
        email: user.email,
        is_active: user.is_active,
    });

    Ok(next.run(req).await)
}

/// Extractor for the authenticated user injected by [`auth_middleware`].
pub struct AuthUser(pub CurrentUser);

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .map(AuthUser)
            .ok_or(ApiError::new(ErrorCode::AuthInvalidToken))
    }
}
