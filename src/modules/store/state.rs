/// Normalized chat state.
///
/// Pure data plus the mutations that keep its invariants:
/// - each conversation's messages are sorted ascending by `created_at`
///   (ties broken by id) and hold every message id at most once
/// - the conversation list is sorted descending by `updated_at`
/// - read receipts are cumulative and never overwrite an existing `read_at`
///
/// Wrapped by the `ChatStore` actor so every mutation goes through one writer.
use actix::MessageResponse;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

use crate::modules::conversation::schema::{ConversationEntity, LastMessagePreview};
use crate::modules::message::schema::{MessageEntity, SenderRole};

#[derive(Debug, Clone, Copy, PartialEq, Eq, MessageResponse)]
pub enum IngestOutcome {
    Inserted,
    Updated,
}

#[derive(Debug, Clone, Default)]
pub struct ChatState {
    conversations: Vec<ConversationEntity>,
    messages: HashMap<String, Vec<MessageEntity>>,
    active_conversation_id: Option<String>,
}

fn sort_messages(messages: &mut [MessageEntity]) {
    messages.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
}

fn sort_conversations(conversations: &mut [ConversationEntity]) {
    conversations.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
}

impl ChatState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn conversations(&self) -> &[ConversationEntity] {
        &self.conversations
    }

    pub fn conversation(&self, conversation_id: &str) -> Option<&ConversationEntity> {
        self.conversations.iter().find(|c| c.id == conversation_id)
    }

    /// Messages of a conversation in display order; empty when unknown.
    pub fn messages(&self, conversation_id: &str) -> &[MessageEntity] {
        self.messages.get(conversation_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn active_conversation_id(&self) -> Option<&str> {
        self.active_conversation_id.as_deref()
    }

    /// Full replace with a freshly fetched list.
    pub fn upsert_conversations(&mut self, conversations: Vec<ConversationEntity>) {
        self.conversations = conversations;
        sort_conversations(&mut self.conversations);
    }

    /// Full replace of one conversation's history. Duplicate ids keep the last copy.
    pub fn upsert_messages_for_conversation(
        &mut self,
        conversation_id: &str,
        messages: Vec<MessageEntity>,
    ) {
        let mut unique: Vec<MessageEntity> = Vec::with_capacity(messages.len());
        for message in messages {
            match unique.iter_mut().find(|m| m.id == message.id) {
                Some(existing) => *existing = message,
                None => unique.push(message),
            }
        }
        sort_messages(&mut unique);
        self.messages.insert(conversation_id.to_string(), unique);
    }

    /// Idempotent insert of a message that arrived outside a history fetch.
    pub fn ingest_pushed_message(&mut self, message: MessageEntity) -> IngestOutcome {
        self.touch_conversation(&message);

        let list = self.messages.entry(message.conversation_id.clone()).or_default();
        let outcome = match list.iter_mut().find(|m| m.id == message.id) {
            Some(existing) => {
                // A receipt already applied locally must survive a stale copy.
                let read_at = existing.read_at.or(message.read_at);
                *existing = MessageEntity { read_at, ..message };
                IngestOutcome::Updated
            }
            None => {
                list.push(message);
                IngestOutcome::Inserted
            }
        };
        sort_messages(list);
        outcome
    }

    fn touch_conversation(&mut self, message: &MessageEntity) {
        match self.conversations.iter_mut().find(|c| c.id == message.conversation_id) {
            Some(conversation) => {
                if message.created_at > conversation.updated_at {
                    conversation.updated_at = message.created_at;
                }
                let newer = conversation
                    .last_message
                    .as_ref()
                    .map_or(true, |last| message.created_at >= last.created_at);
                if newer {
                    conversation.last_message = Some(LastMessagePreview::from(message));
                }
            }
            None => {
                tracing::debug!(
                    "Conversation {} not loaded yet, creating stub from message {}",
                    message.conversation_id,
                    message.id
                );
                self.conversations.insert(0, ConversationEntity::stub_from(message));
            }
        }
        sort_conversations(&mut self.conversations);
    }

    /// Marks `message_id` and every earlier message of the conversation as read.
    /// Returns how many messages changed; 0 when the message is unknown.
    pub fn apply_read_receipt(
        &mut self,
        conversation_id: &str,
        message_id: &str,
        read_at: DateTime<Utc>,
    ) -> usize {
        let Some(list) = self.messages.get_mut(conversation_id) else {
            return 0;
        };
        let Some(index) = list.iter().position(|m| m.id == message_id) else {
            return 0;
        };

        let mut changed = 0;
        for message in list.iter_mut().take(index + 1) {
            if message.read_at.is_none() {
                message.read_at = Some(read_at);
                changed += 1;
            }
        }
        changed
    }

    pub fn select_active_conversation(&mut self, conversation_id: Option<String>) {
        self.active_conversation_id = conversation_id;
    }

    /// Unread messages sent by the other side, summed over every conversation.
    pub fn unread_count_for(&self, viewer: SenderRole) -> usize {
        self.messages.keys().map(|id| self.unread_count_in(id, viewer)).sum()
    }

    pub fn unread_count_in(&self, conversation_id: &str, viewer: SenderRole) -> usize {
        let incoming = viewer.opposite();
        self.messages(conversation_id)
            .iter()
            .filter(|m| m.sender_role == incoming && m.read_at.is_none())
            .count()
    }
}
