//! Direct message model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::user::UserSummary;

pub const MAX_MESSAGE_LENGTH: usize = 1000;

/// Direct message between two users
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub recipient_id: Uuid,
    pub content: String,
    pub read: bool,
    pub read_at: Option<DateTime<Utc>>,
    pub message_type: MessageType,
    pub attachment_url: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Message payload type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    #[default]
    Text,
    Image,
    File,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::Text => "text",
            MessageType::Image => "image",
            MessageType::File => "file",
        }
    }
}

impl std::str::FromStr for MessageType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(MessageType::Text),
            "image" => Ok(MessageType::Image),
            "file" => Ok(MessageType::File),
            other => Err(format!("unknown message type: {}", other)),
        }
    }
}

/// New message to persist
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub sender_id: Uuid,
    pub recipient_id: Uuid,
    pub content: String,
    pub message_type: MessageType,
    pub attachment_url: Option<String>,
}

/// Request to send a message over the REST surface
#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub recipient: Uuid,
    pub content: String,
    #[serde(default)]
    pub message_type: MessageType,
    #[serde(default)]
    pub attachment_url: Option<String>,
}

/// Latest message exchanged with a contact, plus the unread count
#[derive(Debug, Clone, Serialize)]
pub struct ConversationSummary {
    pub other_user: UserSummary,
    pub last_message: Message,
    pub unread_count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_type_round_trips_through_text() {
        for t in [MessageType::Text, MessageType::Image, MessageType::File] {
            assert_eq!(t.as_str().parse::<MessageType>().unwrap(), t);
        }
        assert!("video".parse::<MessageType>().is_err());
    }

    #[test]
    fn test_send_request_defaults_to_text() {
        let req: SendMessageRequest = serde_json::from_str(&format!(
            r#"{{"recipient":"{}","content":"hi"}}"#,
            Uuid::new_v4()
        ))
        .unwrap();
        assert_eq!(req.message_type, MessageType::Text);
        assert!(req.attachment_url.is_none());
    }
}
