//! Registration, login, and token refresh

use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::post,
};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info};
use uuid::Uuid;

use crate::{
    error::ApiError,
    models::user::{LoginRequest, NewUser, Profile, RegisterRequest},
    state::AppState,
    validation,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/refresh", post(refresh))
}

/// Register a new account with email and password
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = payload.email.trim().to_lowercase();

    let mut errors = Vec::new();
    if let Err(e) = validation::validate_email(&email) {
        errors.push(e);
    }
    if let Err(e) = validation::validate_password(&payload.password) {
        errors.push(e);
    }
    if let Err(e) = validation::validate_name(&payload.first_name, "First name") {
        errors.push(e);
    }
    if let Err(e) = validation::validate_name(&payload.last_name, "Last name") {
        errors.push(e);
    }
    if let Some(phone) = payload.phone_number.as_deref()
        && let Err(e) = validation::validate_phone_number(phone)
    {
        errors.push(e);
    }
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    if state
        .user_repository
        .find_by_email(&email)
        .await
        .map_err(internal)?
        .is_some()
    {
        return Err(ApiError::BadRequest(
            "An account with this email already exists".to_string(),
        ));
    }

    let password_hash = hash_password(&payload.password)?;
    let profile = Profile {
        first_name: payload.first_name.trim().to_string(),
        last_name: payload.last_name.trim().to_string(),
        phone_number: payload.phone_number.map(|p| p.trim().to_string()),
        ..Profile::default()
    };

    let new_user = NewUser {
        // Local accounts use a synthetic auth subject
        auth_id: format!("local:{}", Uuid::new_v4()),
        email: email.clone(),
        password_hash: Some(password_hash),
        profile,
    };

    let user = state
        .user_repository
        .create(&new_user)
        .await
        .map_err(internal)?;

    state
        .user_repository
        .record_login(user.id)
        .await
        .map_err(internal)?;

    let tokens = state
        .jwt_service
        .generate_token_pair(user.id, &user.email)
        .map_err(internal)?;

    info!("Registered new user {}", user.id);

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "user": user,
            "tokens": tokens
        })),
    ))
}

/// Log in with email and password
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = payload.email.trim().to_lowercase();

    let user = state
        .user_repository
        .find_by_email(&email)
        .await
        .map_err(internal)?
        .ok_or_else(|| ApiError::NotFound("No account found with this email".to_string()))?;

    if !user.is_active {
        return Err(ApiError::Unauthorized);
    }

    let Some(hash) = user.password_hash.as_deref() else {
        return Err(ApiError::Unauthorized);
    };
    if !verify_password(&payload.password, hash)? {
        return Err(ApiError::Unauthorized);
    }

    state
        .user_repository
        .record_login(user.id)
        .await
        .map_err(internal)?;

    let tokens = state
        .jwt_service
        .generate_token_pair(user.id, &user.email)
        .map_err(internal)?;

    Ok(Json(json!({
        "success": true,
        "user": user,
        "tokens": tokens
    })))
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Exchange a refresh token for a new token pair
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let tokens = state
        .jwt_service
        .refresh_token_pair(&payload.refresh_token)
        .map_err(|_| ApiError::Unauthorized)?;

    // The account may have been deactivated since the token was issued
    let claims = state
        .jwt_service
        .validate_token(&tokens.access_token)
        .map_err(|_| ApiError::Unauthorized)?;
    state
        .user_repository
        .find_active_by_id(claims.sub)
        .await
        .map_err(internal)?
        .ok_or(ApiError::Unauthorized)?;

    Ok(Json(json!({
        "success": true,
        "tokens": tokens
    })))
}

fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut rand::thread_rng());
    let argon2 = Argon2::default();
    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| {
            error!("Failed to hash password: {}", e);
            ApiError::InternalServerError
        })
}

fn verify_password(password: &str, hash: &str) -> Result<bool, ApiError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|e| {
        error!("Failed to parse password hash: {}", e);
        ApiError::InternalServerError
    })?;

    let argon2 = Argon2::default();
    Ok(argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

fn internal(e: anyhow::Error) -> ApiError {
    error!("Auth operation failed: {}", e);
    ApiError::InternalServerError
}
