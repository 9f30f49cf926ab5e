//! Wire format for the realtime messaging channel
//!
//! Every frame is a JSON object with an `event` discriminator and a
//! `data` payload, in both directions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::message::{Message, MessageType};
use crate::models::user::UserSummary;

/// Events sent by clients
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientEvent {
    /// Present a bearer token; required before any other event
    Authenticate { token: String },
    /// Send a direct message to another user
    SendMessage {
        recipient_id: Uuid,
        content: String,
        #[serde(default)]
        message_type: Option<MessageType>,
        #[serde(default)]
        attachment_url: Option<String>,
    },
    /// Mark a single message, or a whole conversation, as read
    MarkRead {
        #[serde(default)]
        message_id: Option<Uuid>,
        #[serde(default)]
        conversation_user_id: Option<Uuid>,
    },
    TypingStart { recipient_id: Uuid },
    TypingStop { recipient_id: Uuid },
    /// Conversation rooms are a client-side grouping; the relay targets
    /// users directly, so these are acknowledged without side effects.
    JoinConversation { conversation_id: String },
    LeaveConversation { conversation_id: String },
}

/// Events sent by the server
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    Authenticated {
        user_id: Uuid,
        message: String,
    },
    AuthenticationError {
        message: String,
    },
    /// Delivered to the recipient of a new message
    NewMessage {
        message: Message,
    },
    /// Delivery confirmation to the sender
    MessageSent {
        message: Message,
    },
    MessagesMarkedRead {
        message_id: Option<Uuid>,
        conversation_user_id: Option<Uuid>,
    },
    UserTyping {
        user_id: Uuid,
        user: UserSummary,
    },
    UserStoppedTyping {
        user_id: Uuid,
    },
    /// Targeted push for a message delivered through the REST API
    Notification {
        message: Message,
    },
    /// Broadcast to every connected client on presence changes
    UserStatusChange {
        user_id: Uuid,
        status: PresenceStatus,
        timestamp: DateTime<Utc>,
    },
    Error {
        message: String,
    },
}

/// Online/offline presence marker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresenceStatus {
    Online,
    Offline,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_event_deserializes_tagged_frames() {
        let frame = r#"{"event":"authenticate","data":{"token":"abc"}}"#;
        let event: ClientEvent = serde_json::from_str(frame).unwrap();
        assert!(matches!(event, ClientEvent::Authenticate { token } if token == "abc"));

        let recipient = Uuid::new_v4();
        let frame = format!(
            r#"{{"event":"send_message","data":{{"recipient_id":"{}","content":"hi"}}}}"#,
            recipient
        );
        let event: ClientEvent = serde_json::from_str(&frame).unwrap();
        match event {
            ClientEvent::SendMessage {
                recipient_id,
                content,
                message_type,
                attachment_url,
            } => {
                assert_eq!(recipient_id, recipient);
                assert_eq!(content, "hi");
                assert!(message_type.is_none());
                assert!(attachment_url.is_none());
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_server_event_serializes_tagged_frames() {
        let user_id = Uuid::new_v4();
        let event = ServerEvent::UserStatusChange {
            user_id,
            status: PresenceStatus::Online,
            timestamp: Utc::now(),
        };

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["event"], "user_status_change");
        assert_eq!(value["data"]["status"], "online");
        assert_eq!(value["data"]["user_id"], user_id.to_string());
    }

    #[test]
    fn test_unknown_event_is_rejected() {
        let frame = r#"{"event":"self_destruct","data":{}}"#;
        assert!(serde_json::from_str::<ClientEvent>(frame).is_err());
    }
}
