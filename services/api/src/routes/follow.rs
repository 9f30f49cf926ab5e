//! Follow graph routes: edges, lists, and recommendations

use axum::{
    Extension, Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
};
use serde::Deserialize;
use serde_json::json;
use tracing::error;
use uuid::Uuid;

use crate::{
    error::ApiError,
    models::follow::{InterestRecommendation, Relationship, similarity},
    models::user::User,
    models::{Pagination, page_bounds},
    state::AppState,
};

const DEFAULT_PAGE_SIZE: u32 = 20;
const SUGGESTION_LIMIT: i64 = 10;
const RECOMMENDATION_LIMIT: usize = 20;
const CANDIDATE_POOL: i64 = 200;

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/me", get(my_follows))
        .route("/mutual", get(mutual_follows))
        .route("/suggestions", get(suggested_follows))
        .route("/recommendations/interests", get(interest_recommendations))
        .route("/followers/:user_id", delete(remove_follower))
        .route("/:user_id", post(follow_user).delete(unfollow_user).get(user_follows))
        .route("/:user_id/status", get(follow_status))
}

/// Follow another user
pub async fn follow_user(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(target_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    if target_id == user.id {
        return Err(ApiError::BadRequest("You cannot follow yourself".to_string()));
    }

    state
        .user_repository
        .find_active_by_id(target_id)
        .await
        .map_err(internal)?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    let follow = state
        .follow_repository
        .follow(user.id, target_id)
        .await
        .map_err(internal)?
        .ok_or_else(|| {
            ApiError::BadRequest("You are already following this user".to_string())
        })?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "follow": follow
        })),
    ))
}

/// Unfollow a user
pub async fn unfollow_user(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(target_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let removed = state
        .follow_repository
        .unfollow(user.id, target_id)
        .await
        .map_err(internal)?;

    if !removed {
        return Err(ApiError::NotFound(
            "You are not following this user".to_string(),
        ));
    }

    Ok(Json(json!({
        "success": true,
        "message": "Unfollowed successfully"
    })))
}

/// Remove one of the current user's followers
pub async fn remove_follower(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(follower_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let removed = state
        .follow_repository
        .unfollow(follower_id, user.id)
        .await
        .map_err(internal)?;

    if !removed {
        return Err(ApiError::NotFound(
            "This user is not following you".to_string(),
        ));
    }

    Ok(Json(json!({
        "success": true,
        "message": "Follower removed"
    })))
}

/// The current user's followers and following lists
pub async fn my_follows(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    follow_lists(&state, user.id, query, None).await
}

/// Another user's followers and following lists with relationship flags
pub async fn user_follows(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(target_id): Path<Uuid>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .user_repository
        .find_active_by_id(target_id)
        .await
        .map_err(internal)?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    let relationship = relationship(&state, user.id, target_id).await?;
    follow_lists(&state, target_id, query, Some(relationship)).await
}

async fn follow_lists(
    state: &AppState,
    user_id: Uuid,
    query: PageQuery,
    relationship: Option<Relationship>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let (page, limit, offset) = page_bounds(query.page, query.limit, DEFAULT_PAGE_SIZE);

    let (followers, followers_total) = state
        .follow_repository
        .followers(user_id, limit as i64, offset)
        .await
        .map_err(internal)?;
    let (following, following_total) = state
        .follow_repository
        .following(user_id, limit as i64, offset)
        .await
        .map_err(internal)?;
    let stats = state
        .follow_repository
        .stats(user_id)
        .await
        .map_err(internal)?;

    let mut body = json!({
        "success": true,
        "stats": stats,
        "followers": {
            "items": followers,
            "pagination": Pagination::new(page, limit, followers_total),
        },
        "following": {
            "items": following,
            "pagination": Pagination::new(page, limit, following_total),
        },
    });
    if let Some(relationship) = relationship {
        body["relationship"] = serde_json::to_value(relationship).map_err(|e| {
            error!("Failed to serialize relationship: {}", e);
            ApiError::InternalServerError
        })?;
    }

    Ok(Json(body))
}

/// Relationship flags between the current user and another user
pub async fn follow_status(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(target_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let relationship = relationship(&state, user.id, target_id).await?;

    Ok(Json(json!({
        "success": true,
        "relationship": relationship
    })))
}

async fn relationship(
    state: &AppState,
    user_id: Uuid,
    target_id: Uuid,
) -> Result<Relationship, ApiError> {
    if user_id == target_id {
        return Ok(Relationship {
            is_following: false,
            is_followed_by: false,
            is_mutual: false,
            is_self: true,
        });
    }

    let is_following = state
        .follow_repository
        .is_following(user_id, target_id)
        .await
        .map_err(internal)?;
    let is_followed_by = state
        .follow_repository
        .is_following(target_id, user_id)
        .await
        .map_err(internal)?;

    Ok(Relationship {
        is_following,
        is_followed_by,
        is_mutual: is_following && is_followed_by,
        is_self: false,
    })
}

/// Users the current user follows who also follow back
pub async fn mutual_follows(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> Result<impl IntoResponse, ApiError> {
    let mutual = state
        .follow_repository
        .mutual(user.id)
        .await
        .map_err(internal)?;

    Ok(Json(json!({
        "success": true,
        "mutual": mutual
    })))
}

/// People the current user's followers follow
pub async fn suggested_follows(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> Result<impl IntoResponse, ApiError> {
    let suggestions = state
        .follow_repository
        .suggestions(user.id, SUGGESTION_LIMIT)
        .await
        .map_err(internal)?;

    Ok(Json(json!({
        "success": true,
        "suggestions": suggestions
    })))
}

/// Interest and location based recommendations
pub async fn interest_recommendations(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> Result<impl IntoResponse, ApiError> {
    let recommendations = compute_interest_recommendations(&state, &user).await?;

    Ok(Json(json!({
        "success": true,
        "recommendations": recommendations
    })))
}

/// Score active users against the caller's interests and location.
/// Candidates already followed are excluded before scoring.
pub async fn compute_interest_recommendations(
    state: &AppState,
    user: &User,
) -> Result<Vec<InterestRecommendation>, ApiError> {
    let following = state
        .follow_repository
        .following_ids(user.id)
        .await
        .map_err(internal)?;

    let candidates = state
        .user_repository
        .recommendation_candidates(user.id, &following, CANDIDATE_POOL)
        .await
        .map_err(internal)?;

    let city = user.profile.address.as_ref().and_then(|a| a.city.as_deref());
    let state_code = user
        .profile
        .address
        .as_ref()
        .and_then(|a| a.state.as_deref());

    let mut recommendations: Vec<InterestRecommendation> = candidates
        .into_iter()
        .filter_map(|candidate| {
            let (score, matches, location_match) =
                similarity(&candidate.profile, &user.profile.interests, city, state_code);
            if score == 0 {
                return None;
            }
            Some(InterestRecommendation {
                user: candidate.summary(),
                similarity_score: score,
                interest_matches: matches,
                location_match,
            })
        })
        .collect();

    recommendations.sort_by(|a, b| b.similarity_score.cmp(&a.similarity_score));
    recommendations.truncate(RECOMMENDATION_LIMIT);
    Ok(recommendations)
}

fn internal(e: anyhow::Error) -> ApiError {
    error!("Follow operation failed: {}", e);
    ApiError::InternalServerError
}
