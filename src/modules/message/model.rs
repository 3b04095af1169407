use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::modules::message::schema::MessageType;

/// Body of `POST /chat/conversations/{id}/messages`.
#[derive(Debug, Clone, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_not_empty"))]
pub struct SendMessage {
    #[validate(length(max = 4000, message = "Message cannot exceed 4000 characters"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(rename = "type")]
    pub _type: MessageType,
    #[validate(length(max = 10, message = "At most 10 attachments per message"))]
    pub attachments: Vec<String>,
}

impl SendMessage {
    pub fn text(content: impl Into<String>) -> Self {
        Self { content: Some(content.into()), _type: MessageType::Text, attachments: Vec::new() }
    }

    pub fn with_attachments(mut self, attachments: Vec<String>) -> Self {
        self.attachments = attachments;
        self
    }
}

fn validate_not_empty(message: &SendMessage) -> Result<(), ValidationError> {
    let has_text = message.content.as_deref().is_some_and(|c| !c.trim().is_empty());
    if message._type == MessageType::Text && !has_text && message.attachments.is_empty() {
        return Err(ValidationError::new("empty_message")
            .with_message("A text message needs content or attachments".into()));
    }
    Ok(())
}

/// Body of `POST /chat/conversations/{id}/read`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkRead {
    pub message_id: String,
}

/// Payload of the `message-read` push event.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadReceipt {
    pub message_id: String,
    pub conversation_id: String,
    pub read_at: DateTime<Utc>,
}
