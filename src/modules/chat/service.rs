/// Chat Service
///
/// Façade used by the UI layer. REST calls go through the repositories,
/// their results are merged into the `ChatStore` actor, and realtime
/// subscriptions are delegated to the `TransportBridge` actor.
///
/// Sends are not optimistic: a message shows up once the backend confirms
/// it, and the confirmation goes through the same idempotent ingest as the
/// push copy so both converge on one entry.
use actix::prelude::*;
use chrono::Utc;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

use crate::api::error::{self, Error};
use crate::modules::conversation::{
    model::NewConversation, repository::ConversationRepository,
    repository_http::ConversationRepositoryHttp, schema::ConversationEntity,
};
use crate::modules::file_upload::{
    repository::AttachmentRepository, repository_http::AttachmentRepositoryHttp,
    service::AttachmentService,
};
use crate::modules::message::{
    model::{MarkRead, SendMessage},
    repository::MessageRepository,
    repository_http::MessageRepositoryHttp,
    schema::{MessageEntity, SenderRole},
};
use crate::modules::realtime::{bridge::TransportBridge, events as realtime};
use crate::modules::store::{actor::ChatStore, events as store};
use crate::utils::{validated, Credentials};

/// Façade wired to the HTTP backend
pub type HttpChatService =
    ChatService<ConversationRepositoryHttp, MessageRepositoryHttp, AttachmentRepositoryHttp>;

pub struct ChatService<C, M, A>
where
    C: ConversationRepository + Send + Sync,
    M: MessageRepository + Send + Sync,
    A: AttachmentRepository + Send + Sync,
{
    conversation_repo: Arc<C>,
    message_repo: Arc<M>,
    attachments: AttachmentService<A>,
    store: Addr<ChatStore>,
    bridge: Addr<TransportBridge>,
    viewer: SenderRole,
    unread_rx: watch::Receiver<usize>,
    connected_rx: watch::Receiver<bool>,
}

impl<C, M, A> Clone for ChatService<C, M, A>
where
    C: ConversationRepository + Send + Sync,
    M: MessageRepository + Send + Sync,
    A: AttachmentRepository + Send + Sync,
{
    fn clone(&self) -> Self {
        Self {
            conversation_repo: self.conversation_repo.clone(),
            message_repo: self.message_repo.clone(),
            attachments: self.attachments.clone(),
            store: self.store.clone(),
            bridge: self.bridge.clone(),
            viewer: self.viewer,
            unread_rx: self.unread_rx.clone(),
            connected_rx: self.connected_rx.clone(),
        }
    }
}

impl<C, M, A> ChatService<C, M, A>
where
    C: ConversationRepository + Send + Sync + 'static,
    M: MessageRepository + Send + Sync + 'static,
    A: AttachmentRepository + Send + Sync + 'static,
{
    /// Start the store and bridge actors on the current arbiter.
    /// `bridge` receives the store address so push events land there.
    pub fn start(
        viewer: SenderRole,
        conversation_repo: Arc<C>,
        message_repo: Arc<M>,
        attachments: AttachmentService<A>,
        bridge: impl FnOnce(Addr<ChatStore>) -> TransportBridge,
    ) -> Self {
        let chat_store = ChatStore::new(viewer);
        let unread_rx = chat_store.unread_receiver();
        let store = chat_store.start();

        let transport = bridge(store.clone());
        let connected_rx = transport.connected_receiver();
        let bridge = transport.start();

        Self {
            conversation_repo,
            message_repo,
            attachments,
            store,
            bridge,
            viewer,
            unread_rx,
            connected_rx,
        }
    }

    pub fn viewer(&self) -> SenderRole {
        self.viewer
    }

    pub fn bridge(&self) -> &Addr<TransportBridge> {
        &self.bridge
    }

    pub async fn connect(&self, credentials: Credentials) {
        if let Err(e) = self.bridge.send(realtime::Connect { credentials }).await {
            tracing::error!("Transport bridge unreachable: {}", e);
        }
    }

    pub async fn disconnect(&self) {
        if let Err(e) = self.bridge.send(realtime::Disconnect).await {
            tracing::error!("Transport bridge unreachable: {}", e);
        }
    }

    pub fn connection_status(&self) -> watch::Receiver<bool> {
        self.connected_rx.clone()
    }

    pub fn is_connected(&self) -> bool {
        *self.connected_rx.borrow()
    }

    /// Fetch all conversations and replace the local list
    pub async fn load_conversations(&self) -> Result<Vec<ConversationEntity>, Error> {
        let conversations = self
            .conversation_repo
            .find_all()
            .await
            .map_err(|e| Error::from_system(e, "Failed to fetch conversations"))?;

        tracing::debug!("Fetched {} conversations", conversations.len());
        self.store
            .send(store::UpsertConversations { conversations })
            .await
            .map_err(error::SystemError::from)?;

        self.conversations().await
    }

    /// Open a conversation with a participant, then refresh the list
    pub async fn start_conversation(&self, participant_id: &str) -> Result<ConversationEntity, Error> {
        let payload = validated(NewConversation { participant_id: participant_id.to_string() })?;

        let conversation = self
            .conversation_repo
            .create(&payload)
            .await
            .map_err(|e| Error::from_system(e, "Failed to start conversation"))?;

        tracing::info!("Conversation {} started with {}", conversation.id, participant_id);
        self.load_conversations().await?;
        Ok(conversation)
    }

    /// Point the UI at a conversation. `Some` also subscribes its channel and
    /// loads history; `None` only clears the pointer, the channel stays until
    /// `unsubscribe_conversation` is called.
    pub async fn select_conversation(&self, conversation_id: Option<String>) -> Result<(), Error> {
        self.store
            .send(store::SelectActiveConversation { conversation_id: conversation_id.clone() })
            .await
            .map_err(error::SystemError::from)?;

        let Some(conversation_id) = conversation_id else {
            return Ok(());
        };

        self.bridge.do_send(realtime::SubscribeConversation {
            conversation_id: conversation_id.clone(),
        });
        self.load_messages(&conversation_id).await?;
        Ok(())
    }

    pub fn unsubscribe_conversation(&self, conversation_id: &str) {
        self.bridge.do_send(realtime::UnsubscribeConversation {
            conversation_id: conversation_id.to_string(),
        });
    }

    pub async fn subscription_state(
        &self,
        conversation_id: &str,
    ) -> Result<realtime::SubscriptionState, Error> {
        let state = self
            .bridge
            .send(realtime::GetSubscriptionState { conversation_id: conversation_id.to_string() })
            .await
            .map_err(error::SystemError::from)?;
        Ok(state)
    }

    /// Fetch the history of one conversation and replace it locally
    pub async fn load_messages(&self, conversation_id: &str) -> Result<Vec<MessageEntity>, Error> {
        let messages = self
            .message_repo
            .find_by_conversation(conversation_id)
            .await
            .map_err(|e| Error::from_system(e, "Failed to fetch messages"))?;

        self.store
            .send(store::UpsertMessages { conversation_id: conversation_id.to_string(), messages })
            .await
            .map_err(error::SystemError::from)?;

        self.get_messages(conversation_id).await
    }

    pub async fn send_message(
        &self,
        conversation_id: &str,
        message: SendMessage,
    ) -> Result<MessageEntity, Error> {
        let message = validated(message)?;

        let created = self
            .message_repo
            .create(conversation_id, &message)
            .await
            .map_err(|e| Error::from_system(e, "Failed to send message"))?;

        let outcome = self
            .store
            .send(store::IngestPushedMessage { message: created.clone() })
            .await
            .map_err(error::SystemError::from)?;

        tracing::debug!("Sent message {} ({:?})", created.id, outcome);
        Ok(created)
    }

    /// Mark everything up to `message_id` as read. The local receipt is
    /// applied right after the backend accepts it; the pushed receipt that
    /// follows finds nothing left to change.
    pub async fn mark_read(&self, conversation_id: &str, message_id: &str) -> Result<usize, Error> {
        self.message_repo
            .mark_read(conversation_id, &MarkRead { message_id: message_id.to_string() })
            .await
            .map_err(|e| Error::from_system(e, "Failed to mark messages as read"))?;

        let changed = self
            .store
            .send(store::ApplyReadReceipt {
                conversation_id: conversation_id.to_string(),
                message_id: message_id.to_string(),
                read_at: Utc::now(),
            })
            .await
            .map_err(error::SystemError::from)?;
        Ok(changed)
    }

    pub async fn get_messages(&self, conversation_id: &str) -> Result<Vec<MessageEntity>, Error> {
        let messages = self
            .store
            .send(store::GetMessages { conversation_id: conversation_id.to_string() })
            .await
            .map_err(error::SystemError::from)?;
        Ok(messages)
    }

    pub async fn conversations(&self) -> Result<Vec<ConversationEntity>, Error> {
        let conversations =
            self.store.send(store::GetConversations).await.map_err(error::SystemError::from)?;
        Ok(conversations)
    }

    pub async fn active_conversation(&self) -> Result<Option<String>, Error> {
        let active =
            self.store.send(store::GetActiveConversation).await.map_err(error::SystemError::from)?;
        Ok(active)
    }

    pub fn unread_count(&self) -> usize {
        *self.unread_rx.borrow()
    }

    pub fn unread_receiver(&self) -> watch::Receiver<usize> {
        self.unread_rx.clone()
    }

    pub async fn unread_count_in(&self, conversation_id: &str) -> Result<usize, Error> {
        let count = self
            .store
            .send(store::GetUnreadCount {
                viewer: self.viewer,
                conversation_id: Some(conversation_id.to_string()),
            })
            .await
            .map_err(error::SystemError::from)?;
        Ok(count)
    }

    /// Upload a local file and return the URL to put in `attachments`
    pub async fn upload_attachment(&self, path: &Path) -> Result<String, Error> {
        let uploaded = self
            .attachments
            .upload_file(path)
            .await
            .map_err(|e| Error::from_system(e, "Failed to upload attachment"))?;
        Ok(uploaded.url)
    }

    /// Reload the conversation list whenever the user channel announces a
    /// new conversation. Runs until the bridge stops.
    pub fn spawn_conversation_refresh(&self) -> actix_rt::task::JoinHandle<()> {
        let (tx, mut rx) = mpsc::unbounded_channel();
        self.bridge.do_send(realtime::RegisterConversationObserver { observer: tx });

        let service = self.clone();
        actix_rt::spawn(async move {
            while let Some(signal) = rx.recv().await {
                tracing::debug!("Conversation signal: {:?}", signal);
                if let Err(e) = service.load_conversations().await {
                    tracing::warn!("Conversation refresh failed: {}", e);
                }
            }
            tracing::debug!("Conversation refresh stopped");
        })
    }
}
