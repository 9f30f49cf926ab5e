//! Real-time messaging and presence over WebSocket
//!
//! A single `/ws` endpoint carries tagged JSON events in both directions.
//! Connections start unauthenticated; an `authenticate` event carrying a
//! valid access token binds the socket to a user in the shared registry.
//! Messages to offline users are persisted only; there is no offline
//! delivery queue.

use axum::{
    extract::{
        State, WebSocketUpgrade,
        ws::{Message as WsMessage, WebSocket},
    },
    response::IntoResponse,
};
use chrono::Utc;
use tokio::sync::mpsc;
use tracing::{error, info};
use uuid::Uuid;

use crate::{
    models::message::{MAX_MESSAGE_LENGTH, NewMessage},
    realtime::events::{ClientEvent, PresenceStatus, ServerEvent},
    realtime::presence::EventSender,
    state::AppState,
};

pub mod events;
pub mod presence;

/// Upgrade handler for `GET /ws`
pub async fn ws_handler(
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Per-connection loop. Runs until the client closes the socket or the
/// transport fails, then tears down any presence registration.
async fn handle_socket(mut socket: WebSocket, state: AppState) {
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerEvent>();
    let mut authenticated: Option<Uuid> = None;

    loop {
        tokio::select! {
            incoming = socket.recv() => {
                let Some(Ok(frame)) = incoming else {
                    break;
                };
                match frame {
                    WsMessage::Text(text) => {
                        let reply = match serde_json::from_str::<ClientEvent>(&text) {
                            Ok(event) => {
                                handle_event(event, &state, &tx, &mut authenticated).await
                            }
                            Err(_) => Some(ServerEvent::Error {
                                message: "Unrecognized event".to_string(),
                            }),
                        };
                        if let Some(reply) = reply
                            && send_frame(&mut socket, &reply).await.is_err()
                        {
                            break;
                        }
                    }
                    WsMessage::Close(_) => break,
                    // Pings are answered by axum; binary frames are ignored
                    _ => {}
                }
            }
            outgoing = rx.recv() => {
                // The sender half lives in this task, so the channel
                // cannot close while we are still looping
                let Some(event) = outgoing else {
                    break;
                };
                if send_frame(&mut socket, &event).await.is_err() {
                    break;
                }
            }
        }
    }

    if let Some(user_id) = authenticated {
        state.registry.unregister(user_id, &tx);
        state.registry.broadcast(ServerEvent::UserStatusChange {
            user_id,
            status: PresenceStatus::Offline,
            timestamp: Utc::now(),
        });
        info!("User {} disconnected from realtime channel", user_id);
    }
}

async fn send_frame(socket: &mut WebSocket, event: &ServerEvent) -> Result<(), axum::Error> {
    match serde_json::to_string(event) {
        Ok(json) => socket.send(WsMessage::Text(json)).await,
        Err(e) => {
            error!("Failed to serialize realtime event: {}", e);
            Ok(())
        }
    }
}

/// Dispatch one client event. Returns the direct reply for this socket,
/// if any; events for other users go through the registry.
async fn handle_event(
    event: ClientEvent,
    state: &AppState,
    tx: &EventSender,
    authenticated: &mut Option<Uuid>,
) -> Option<ServerEvent> {
    match event {
        ClientEvent::Authenticate { token } => {
            Some(authenticate(state, tx, authenticated, &token).await)
        }
        ClientEvent::SendMessage {
            recipient_id,
            content,
            message_type,
            attachment_url,
        } => {
            let Some(sender_id) = *authenticated else {
                return Some(not_authenticated());
            };
            Some(
                relay_message(
                    state,
                    sender_id,
                    recipient_id,
                    content,
                    message_type.unwrap_or_default(),
                    attachment_url,
                )
                .await,
            )
        }
        ClientEvent::MarkRead {
            message_id,
            conversation_user_id,
        } => {
            let Some(reader_id) = *authenticated else {
                return Some(not_authenticated());
            };
            Some(mark_read(state, reader_id, message_id, conversation_user_id).await)
        }
        ClientEvent::TypingStart { recipient_id } => {
            let Some(user_id) = *authenticated else {
                return Some(not_authenticated());
            };
            let user = state
                .user_repository
                .find_active_by_id(user_id)
                .await
                .ok()
                .flatten()?;
            state.registry.send_to(
                recipient_id,
                ServerEvent::UserTyping {
                    user_id,
                    user: user.summary(),
                },
            );
            None
        }
        ClientEvent::TypingStop { recipient_id } => {
            let Some(user_id) = *authenticated else {
                return Some(not_authenticated());
            };
            state
                .registry
                .send_to(recipient_id, ServerEvent::UserStoppedTyping { user_id });
            None
        }
        ClientEvent::JoinConversation { .. } | ClientEvent::LeaveConversation { .. } => {
            if authenticated.is_none() {
                return Some(not_authenticated());
            }
            None
        }
    }
}

fn not_authenticated() -> ServerEvent {
    ServerEvent::Error {
        message: "Not authenticated".to_string(),
    }
}

async fn authenticate(
    state: &AppState,
    tx: &EventSender,
    authenticated: &mut Option<Uuid>,
    token: &str,
) -> ServerEvent {
    let claims = match state.jwt_service.validate_access_token(token) {
        Ok(claims) => claims,
        Err(_) => {
            return ServerEvent::AuthenticationError {
                message: "Invalid token or user not found".to_string(),
            };
        }
    };

    let user = match state.user_repository.find_active_by_id(claims.sub).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            return ServerEvent::AuthenticationError {
                message: "Invalid token or user not found".to_string(),
            };
        }
        Err(e) => {
            error!("Failed to load user during socket auth: {}", e);
            return ServerEvent::AuthenticationError {
                message: "Authentication failed".to_string(),
            };
        }
    };

    *authenticated = Some(user.id);
    state.registry.register(user.id, tx.clone());
    state.registry.broadcast(ServerEvent::UserStatusChange {
        user_id: user.id,
        status: PresenceStatus::Online,
        timestamp: Utc::now(),
    });
    info!("User {} authenticated on realtime channel", user.id);

    ServerEvent::Authenticated {
        user_id: user.id,
        message: "Successfully authenticated".to_string(),
    }
}

async fn relay_message(
    state: &AppState,
    sender_id: Uuid,
    recipient_id: Uuid,
    content: String,
    message_type: crate::models::message::MessageType,
    attachment_url: Option<String>,
) -> ServerEvent {
    let content = content.trim().to_string();
    if content.is_empty() || content.chars().count() > MAX_MESSAGE_LENGTH {
        return ServerEvent::Error {
            message: "Recipient and content are required".to_string(),
        };
    }
    if recipient_id == sender_id {
        return ServerEvent::Error {
            message: "Cannot send a message to yourself".to_string(),
        };
    }

    match state.user_repository.find_active_by_id(recipient_id).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            return ServerEvent::Error {
                message: "Recipient not found".to_string(),
            };
        }
        Err(e) => {
            error!("Failed to look up recipient: {}", e);
            return ServerEvent::Error {
                message: "Failed to send message".to_string(),
            };
        }
    }

    let new_message = NewMessage {
        sender_id,
        recipient_id,
        content,
        message_type,
        attachment_url,
    };

    let message = match state.message_repository.create(&new_message).await {
        Ok(message) => message,
        Err(e) => {
            error!("Failed to persist realtime message: {}", e);
            return ServerEvent::Error {
                message: "Failed to send message".to_string(),
            };
        }
    };

    state.registry.send_to(
        recipient_id,
        ServerEvent::NewMessage {
            message: message.clone(),
        },
    );

    ServerEvent::MessageSent { message }
}

async fn mark_read(
    state: &AppState,
    reader_id: Uuid,
    message_id: Option<Uuid>,
    conversation_user_id: Option<Uuid>,
) -> ServerEvent {
    let result = if let Some(message_id) = message_id {
        state
            .message_repository
            .mark_read(message_id, reader_id)
            .await
            .map(|_| ())
    } else if let Some(other_id) = conversation_user_id {
        state
            .message_repository
            .mark_conversation_read(other_id, reader_id)
            .await
            .map(|_| ())
    } else {
        Ok(())
    };

    match result {
        Ok(()) => ServerEvent::MessagesMarkedRead {
            message_id,
            conversation_user_id,
        },
        Err(e) => {
            error!("Failed to mark messages read: {}", e);
            ServerEvent::Error {
                message: "Failed to mark messages as read".to_string(),
            }
        }
    }
}
