/// Chat Store Actor
///
/// Single writer over `ChatState`. Both the façade (REST results) and the
/// transport bridge (push events) mutate state by sending messages here, so
/// concurrent deliveries for the same conversation can never interleave.
///
/// After every mutation the viewer's unread count is recomputed and
/// published on a watch channel.
use actix::prelude::*;
use tokio::sync::watch;

use super::events::*;
use super::state::{ChatState, IngestOutcome};
use crate::modules::conversation::schema::ConversationEntity;
use crate::modules::message::schema::{MessageEntity, SenderRole};

pub struct ChatStore {
    state: ChatState,
    viewer: SenderRole,
    unread_tx: watch::Sender<usize>,
}

impl ChatStore {
    pub fn new(viewer: SenderRole) -> Self {
        let (unread_tx, _) = watch::channel(0);
        Self { state: ChatState::new(), viewer, unread_tx }
    }

    /// Receiver for the viewer's total unread count.
    pub fn unread_receiver(&self) -> watch::Receiver<usize> {
        self.unread_tx.subscribe()
    }

    fn publish_unread(&self) {
        let count = self.state.unread_count_for(self.viewer);
        self.unread_tx.send_if_modified(|current| {
            if *current == count {
                return false;
            }
            tracing::debug!("Unread count changed {} -> {}", current, count);
            *current = count;
            true
        });
    }
}

impl Actor for ChatStore {
    type Context = Context<Self>;

    fn started(&mut self, _ctx: &mut Self::Context) {
        tracing::debug!("Chat store started for {:?} viewer", self.viewer);
    }
}

impl Handler<UpsertConversations> for ChatStore {
    type Result = ();

    fn handle(&mut self, msg: UpsertConversations, _: &mut Context<Self>) {
        tracing::debug!("Replacing conversation list ({} conversations)", msg.conversations.len());
        self.state.upsert_conversations(msg.conversations);
    }
}

impl Handler<UpsertMessages> for ChatStore {
    type Result = ();

    fn handle(&mut self, msg: UpsertMessages, _: &mut Context<Self>) {
        tracing::debug!(
            "Replacing history of conversation {} ({} messages)",
            msg.conversation_id,
            msg.messages.len()
        );
        self.state.upsert_messages_for_conversation(&msg.conversation_id, msg.messages);
        self.publish_unread();
    }
}

impl Handler<IngestPushedMessage> for ChatStore {
    type Result = IngestOutcome;

    fn handle(&mut self, msg: IngestPushedMessage, _: &mut Context<Self>) -> Self::Result {
        let message_id = msg.message.id.clone();
        let conversation_id = msg.message.conversation_id.clone();

        let outcome = self.state.ingest_pushed_message(msg.message);
        tracing::debug!("Message {} in conversation {}: {:?}", message_id, conversation_id, outcome);

        self.publish_unread();
        outcome
    }
}

impl Handler<ApplyReadReceipt> for ChatStore {
    type Result = usize;

    fn handle(&mut self, msg: ApplyReadReceipt, _: &mut Context<Self>) -> Self::Result {
        let changed =
            self.state.apply_read_receipt(&msg.conversation_id, &msg.message_id, msg.read_at);

        if changed > 0 {
            tracing::debug!(
                "Read receipt up to {} marked {} message(s) in conversation {}",
                msg.message_id,
                changed,
                msg.conversation_id
            );
            self.publish_unread();
        }
        changed
    }
}

impl Handler<SelectActiveConversation> for ChatStore {
    type Result = ();

    fn handle(&mut self, msg: SelectActiveConversation, _: &mut Context<Self>) {
        self.state.select_active_conversation(msg.conversation_id);
    }
}

impl Handler<GetActiveConversation> for ChatStore {
    type Result = Option<String>;

    fn handle(&mut self, _: GetActiveConversation, _: &mut Context<Self>) -> Self::Result {
        self.state.active_conversation_id().map(str::to_string)
    }
}

impl Handler<GetConversations> for ChatStore {
    type Result = Vec<ConversationEntity>;

    fn handle(&mut self, _: GetConversations, _: &mut Context<Self>) -> Self::Result {
        self.state.conversations().to_vec()
    }
}

impl Handler<GetMessages> for ChatStore {
    type Result = Vec<MessageEntity>;

    fn handle(&mut self, msg: GetMessages, _: &mut Context<Self>) -> Self::Result {
        self.state.messages(&msg.conversation_id).to_vec()
    }
}

impl Handler<GetUnreadCount> for ChatStore {
    type Result = usize;

    fn handle(&mut self, msg: GetUnreadCount, _: &mut Context<Self>) -> Self::Result {
        match msg.conversation_id {
            Some(id) => self.state.unread_count_in(&id, msg.viewer),
            None => self.state.unread_count_for(msg.viewer),
        }
    }
}
