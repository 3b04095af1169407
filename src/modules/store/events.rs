/// Store Actor Events
///
/// Messages accepted by the `ChatStore` actor. Mutations go through the
/// actor mailbox, so they are applied one at a time in arrival order.
use actix::prelude::*;
use chrono::{DateTime, Utc};

use super::state::IngestOutcome;
use crate::modules::conversation::schema::ConversationEntity;
use crate::modules::message::schema::{MessageEntity, SenderRole};

/// Replace the conversation list with a fresh fetch
#[derive(Message)]
#[rtype(result = "()")]
pub struct UpsertConversations {
    pub conversations: Vec<ConversationEntity>,
}

/// Replace one conversation's message history with a fresh fetch
#[derive(Message)]
#[rtype(result = "()")]
pub struct UpsertMessages {
    pub conversation_id: String,
    pub messages: Vec<MessageEntity>,
}

/// Insert or update a single message (push delivery or send confirmation)
#[derive(Message)]
#[rtype(result = "IngestOutcome")]
pub struct IngestPushedMessage {
    pub message: MessageEntity,
}

/// Cumulative read receipt; result is the number of messages newly marked
#[derive(Message)]
#[rtype(result = "usize")]
pub struct ApplyReadReceipt {
    pub conversation_id: String,
    pub message_id: String,
    pub read_at: DateTime<Utc>,
}

#[derive(Message)]
#[rtype(result = "()")]
pub struct SelectActiveConversation {
    pub conversation_id: Option<String>,
}

#[derive(Message)]
#[rtype(result = "Option<String>")]
pub struct GetActiveConversation;

#[derive(Message)]
#[rtype(result = "Vec<ConversationEntity>")]
pub struct GetConversations;

#[derive(Message)]
#[rtype(result = "Vec<MessageEntity>")]
pub struct GetMessages {
    pub conversation_id: String,
}

/// Unread count for a viewer role, optionally limited to one conversation
#[derive(Message)]
#[rtype(result = "usize")]
pub struct GetUnreadCount {
    pub viewer: SenderRole,
    pub conversation_id: Option<String>,
}
