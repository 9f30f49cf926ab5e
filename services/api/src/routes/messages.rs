//! Direct messaging routes

use axum::{
    Extension, Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
};
use serde_json::json;
use tracing::error;
use uuid::Uuid;

use crate::{
    error::ApiError,
    models::message::{
        ConversationSummary, MAX_MESSAGE_LENGTH, NewMessage, SendMessageRequest,
    },
    models::user::User,
    models::{Pagination, page_bounds},
    realtime::events::ServerEvent,
    routes::follow::PageQuery,
    state::AppState,
    validation,
};

const DEFAULT_PAGE_SIZE: u32 = 50;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(send_message).get(conversations))
        .route("/online-users", get(online_users))
        .route("/user-status/:id", get(user_status))
        .route("/:id", get(conversation).delete(delete_message))
        .route("/:id/read", put(mark_read))
        .route("/:id/read-all", put(mark_conversation_read))
}

/// Send a direct message. If the recipient is connected to the realtime
/// channel, push a targeted notification as well.
pub async fn send_message(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Json(payload): Json<SendMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let content = payload.content.trim().to_string();
    if let Err(e) = validation::validate_content(&content, "Message content", MAX_MESSAGE_LENGTH) {
        return Err(ApiError::Validation(vec![e]));
    }
    if payload.recipient == user.id {
        return Err(ApiError::BadRequest(
            "You cannot send a message to yourself".to_string(),
        ));
    }

    state
        .user_repository
        .find_active_by_id(payload.recipient)
        .await
        .map_err(internal)?
        .ok_or_else(|| ApiError::NotFound("Recipient not found".to_string()))?;

    let message = state
        .message_repository
        .create(&NewMessage {
            sender_id: user.id,
            recipient_id: payload.recipient,
            content,
            message_type: payload.message_type,
            attachment_url: payload.attachment_url,
        })
        .await
        .map_err(internal)?;

    state.registry.send_to(
        payload.recipient,
        ServerEvent::Notification {
            message: message.clone(),
        },
    );

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": message
        })),
    ))
}

/// Conversation summaries: latest message and unread count per contact,
/// plus the total unread count across all conversations
pub async fn conversations(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> Result<impl IntoResponse, ApiError> {
    let rows = state
        .message_repository
        .conversations(user.id)
        .await
        .map_err(internal)?;

    let total_unread = state
        .message_repository
        .unread_count(user.id)
        .await
        .map_err(internal)?;

    let other_ids: Vec<Uuid> = rows.iter().map(|(id, _, _)| *id).collect();
    let summaries = state
        .user_repository
        .summaries_by_ids(&other_ids)
        .await
        .map_err(internal)?;

    let conversations: Vec<ConversationSummary> = rows
        .into_iter()
        .filter_map(|(other_id, last_message, unread_count)| {
            let other_user = summaries.iter().find(|s| s.id == other_id)?.clone();
            Some(ConversationSummary {
                other_user,
                last_message,
                unread_count,
            })
        })
        .collect();

    Ok(Json(json!({
        "success": true,
        "conversations": conversations,
        "total_unread": total_unread
    })))
}

/// Fetch a conversation with another user, chronological order.
/// Fetching marks the other party's unread messages as read.
pub async fn conversation(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(other_id): Path<Uuid>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .user_repository
        .find_by_id(other_id)
        .await
        .map_err(internal)?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    state
        .message_repository
        .mark_conversation_read(other_id, user.id)
        .await
        .map_err(internal)?;

    let (page, limit, offset) = page_bounds(query.page, query.limit, DEFAULT_PAGE_SIZE);
    let (messages, total) = state
        .message_repository
        .conversation(user.id, other_id, limit as i64, offset)
        .await
        .map_err(internal)?;

    Ok(Json(json!({
        "success": true,
        "messages": messages,
        "pagination": Pagination::new(page, limit, total)
    })))
}

/// Mark one received message as read
pub async fn mark_read(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(message_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let message = state
        .message_repository
        .find_by_id(message_id)
        .await
        .map_err(internal)?
        .ok_or_else(|| ApiError::NotFound("Message not found".to_string()))?;

    if message.recipient_id != user.id {
        return Err(ApiError::Forbidden(
            "You can only mark your own messages as read".to_string(),
        ));
    }

    state
        .message_repository
        .mark_read(message_id, user.id)
        .await
        .map_err(internal)?;

    Ok(Json(json!({
        "success": true,
        "message": "Message marked as read"
    })))
}

/// Mark every unread message from another user as read
pub async fn mark_conversation_read(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(other_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let updated = state
        .message_repository
        .mark_conversation_read(other_id, user.id)
        .await
        .map_err(internal)?;

    Ok(Json(json!({
        "success": true,
        "updated": updated
    })))
}

/// Soft-delete a sent message
pub async fn delete_message(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(message_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let message = state
        .message_repository
        .find_by_id(message_id)
        .await
        .map_err(internal)?
        .ok_or_else(|| ApiError::NotFound("Message not found".to_string()))?;

    if message.sender_id != user.id {
        return Err(ApiError::Forbidden(
            "You can only delete messages you sent".to_string(),
        ));
    }

    state
        .message_repository
        .soft_delete(message_id, user.id)
        .await
        .map_err(internal)?;

    Ok(Json(json!({
        "success": true,
        "message": "Message deleted"
    })))
}

/// IDs of users currently connected to the realtime channel
pub async fn online_users(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "success": true,
        "online_users": state.registry.online_users()
    }))
}

/// Whether a specific user is currently online
pub async fn user_status(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> impl IntoResponse {
    Json(json!({
        "success": true,
        "user_id": user_id,
        "online": state.registry.is_online(user_id)
    }))
}

fn internal(e: anyhow::Error) -> ApiError {
    error!("Message operation failed: {}", e);
    ApiError::InternalServerError
}
