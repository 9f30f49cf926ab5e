//! Content feed: posts, likes, and comments

use axum::{
    Extension, Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde_json::json;
use tracing::error;
use uuid::Uuid;

use crate::{
    error::ApiError,
    models::post::{
        CommentRequest, CreatePostRequest, MAX_COMMENT_LENGTH, MAX_POST_LENGTH, PostView,
    },
    models::user::User,
    models::{Pagination, page_bounds},
    routes::follow::PageQuery,
    state::AppState,
    validation,
};

const DEFAULT_PAGE_SIZE: u32 = 10;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_post).get(public_feed))
        .route("/my-posts", get(my_posts))
        .route("/:id/like", post(toggle_like))
        .route("/:id/comment", post(add_comment))
        .route("/:id", axum::routing::delete(delete_post))
}

/// Create a new post
pub async fn create_post(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Json(payload): Json<CreatePostRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let content = payload.content.trim();
    if let Err(e) = validation::validate_content(content, "Post content", MAX_POST_LENGTH) {
        return Err(ApiError::Validation(vec![e]));
    }

    let post = state
        .post_repository
        .create(
            user.id,
            content,
            payload.image_url.as_deref(),
            payload.visibility.unwrap_or_default(),
        )
        .await
        .map_err(internal)?;

    let view = PostView::new(post, user.summary());
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "post": view
        })),
    ))
}

/// Public posts, newest first
pub async fn public_feed(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let (page, limit, offset) = page_bounds(query.page, query.limit, DEFAULT_PAGE_SIZE);

    let (posts, total) = state
        .post_repository
        .public_feed(limit as i64, offset)
        .await
        .map_err(internal)?;

    Ok(Json(json!({
        "success": true,
        "posts": posts,
        "pagination": Pagination::new(page, limit, total)
    })))
}

/// The current user's own posts
pub async fn my_posts(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let (page, limit, offset) = page_bounds(query.page, query.limit, DEFAULT_PAGE_SIZE);

    let (posts, total) = state
        .post_repository
        .by_author(user.id, limit as i64, offset)
        .await
        .map_err(internal)?;

    Ok(Json(json!({
        "success": true,
        "posts": posts,
        "pagination": Pagination::new(page, limit, total)
    })))
}

/// Toggle the current user's like on a post
pub async fn toggle_like(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(post_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let (post, liked) = state
        .post_repository
        .toggle_like(post_id, user.id)
        .await
        .map_err(internal)?
        .ok_or_else(|| ApiError::NotFound("Post not found".to_string()))?;

    Ok(Json(json!({
        "success": true,
        "liked": liked,
        "like_count": post.like_count()
    })))
}

/// Comment on a post
pub async fn add_comment(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(post_id): Path<Uuid>,
    Json(payload): Json<CommentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let text = payload.text.trim();
    if let Err(e) = validation::validate_content(text, "Comment", MAX_COMMENT_LENGTH) {
        return Err(ApiError::Validation(vec![e]));
    }

    let post = state
        .post_repository
        .add_comment(post_id, user.id, text)
        .await
        .map_err(internal)?
        .ok_or_else(|| ApiError::NotFound("Post not found".to_string()))?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "comment_count": post.comment_count(),
            "comments": post.comments
        })),
    ))
}

/// Soft-delete one of the current user's posts
pub async fn delete_post(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(post_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let post = state
        .post_repository
        .find_by_id(post_id)
        .await
        .map_err(internal)?
        .ok_or_else(|| ApiError::NotFound("Post not found".to_string()))?;

    if post.author_id != user.id {
        return Err(ApiError::Forbidden(
            "You can only delete your own posts".to_string(),
        ));
    }

    state
        .post_repository
        .soft_delete(post_id, user.id)
        .await
        .map_err(internal)?;

    Ok(Json(json!({
        "success": true,
        "message": "Post deleted"
    })))
}

fn internal(e: anyhow::Error) -> ApiError {
    error!("Feed operation failed: {}", e);
    ApiError::InternalServerError
}
