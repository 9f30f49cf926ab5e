//! User directory and profile management

use axum::{
    Extension, Json, Router,
    extract::{Path, State},
    response::IntoResponse,
    routing::get,
};
use serde_json::json;
use tracing::error;
use uuid::Uuid;

use crate::{
    error::ApiError,
    models::user::{UpdateProfileRequest, User},
    state::AppState,
    validation,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/me", get(get_me).put(update_me).delete(deactivate_me))
        .route("/me/recommendations", get(interest_recommendations))
        .route("/:id", get(get_user))
}

/// Current user's full record
pub async fn get_me(Extension(user): Extension<User>) -> impl IntoResponse {
    Json(json!({
        "success": true,
        "user": user
    }))
}

/// Update allow-listed profile fields on the current user
pub async fn update_me(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if payload.is_empty() {
        return Err(ApiError::BadRequest(
            "No valid profile fields to update".to_string(),
        ));
    }

    let mut errors = Vec::new();
    if let Some(username) = payload.username.as_deref() {
        let username = username.trim().to_lowercase();
        if let Err(e) = validation::validate_username(&username) {
            errors.push(e);
        } else if state
            .user_repository
            .username_taken(&username, user.id)
            .await
            .map_err(internal)?
        {
            errors.push("Username is already taken".to_string());
        }
    }
    if let Some(phone) = payload.phone_number.as_deref()
        && let Err(e) = validation::validate_phone_number(phone)
    {
        errors.push(e);
    }
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    let mut profile = user.profile.clone();
    payload.apply(&mut profile);

    let updated = state
        .user_repository
        .update_profile(user.id, &profile)
        .await
        .map_err(internal)?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(json!({
        "success": true,
        "user": updated
    })))
}

/// Deactivate the current user's account
pub async fn deactivate_me(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> Result<impl IntoResponse, ApiError> {
    let deactivated = state
        .user_repository
        .deactivate(user.id)
        .await
        .map_err(internal)?;

    if !deactivated {
        return Err(ApiError::NotFound("User not found".to_string()));
    }

    Ok(Json(json!({
        "success": true,
        "message": "Account deactivated"
    })))
}

/// Public profile of another user
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .user_repository
        .find_active_by_id(id)
        .await
        .map_err(internal)?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(json!({
        "success": true,
        "user": user.summary()
    })))
}

/// Interest-overlap friend recommendations for the current user
pub async fn interest_recommendations(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> Result<impl IntoResponse, ApiError> {
    let recommendations =
        crate::routes::follow::compute_interest_recommendations(&state, &user).await?;

    Ok(Json(json!({
        "success": true,
        "recommendations": recommendations
    })))
}

fn internal(e: anyhow::Error) -> ApiError {
    error!("User operation failed: {}", e);
    ApiError::InternalServerError
}
