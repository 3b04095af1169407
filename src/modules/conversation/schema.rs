use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::modules::message::schema::{MessageEntity, SenderRole};

/// Denormalized preview of the newest message in a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LastMessagePreview {
    pub id: String,
    #[serde(default)]
    pub content: Option<String>,
    pub sender_role: SenderRole,
    pub created_at: DateTime<Utc>,
}

impl From<&MessageEntity> for LastMessagePreview {
    fn from(message: &MessageEntity) -> Self {
        Self {
            id: message.id.clone(),
            content: message.content.clone(),
            sender_role: message.sender_role,
            created_at: message.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationEntity {
    pub id: String,
    /// Buyer participant.
    #[serde(default)]
    pub user_id: String,
    /// Store participant.
    #[serde(default)]
    pub merchant_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub last_message: Option<LastMessagePreview>,
    /// Built locally from a pushed message; replaced on the next full fetch.
    #[serde(skip)]
    pub is_stub: bool,
}

impl ConversationEntity {
    /// Minimal record for a conversation only known through a pushed message.
    pub fn stub_from(message: &MessageEntity) -> Self {
        Self {
            id: message.conversation_id.clone(),
            user_id: message.sender_user_id.clone().unwrap_or_default(),
            merchant_id: message.sender_merchant_id.clone().unwrap_or_default(),
            created_at: message.created_at,
            updated_at: message.created_at,
            last_message: Some(LastMessagePreview::from(message)),
            is_stub: true,
        }
    }
}
