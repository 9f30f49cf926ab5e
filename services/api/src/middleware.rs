//! Authentication middleware for JWT token validation

use axum::{
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};
use tracing::error;

use crate::{error::ApiError, state::AppState};

/// Authentication middleware
///
/// Validates the bearer token, loads the account it names, and makes the
/// user available to handlers via request extensions. Deactivated
/// accounts are treated as unauthorized.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, ApiError> {
    // Extract the Authorization header
    let auth_header = req
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .ok_or(ApiError::Unauthorized)?;

    // Check if it's a Bearer token
    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or(ApiError::Unauthorized)?;

    // Validate the token; refresh tokens are not accepted here
    let claims = state
        .jwt_service
        .validate_access_token(token)
        .map_err(|_| ApiError::Unauthorized)?;

    // Load the account behind the token
    let user = state
        .user_repository
        .find_active_by_id(claims.sub)
        .await
        .map_err(|e| {
            error!("Failed to load authenticated user: {}", e);
            ApiError::InternalServerError
        })?
        .ok_or(ApiError::Unauthorized)?;

    // Insert the user into the request extensions
    req.extensions_mut().insert(user);

    // Call the next service
    let response = next.run(req).await;

    Ok(response)
}
