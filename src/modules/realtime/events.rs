/// Transport Bridge Events
///
/// Messages accepted by the `TransportBridge` actor, from the façade
/// (connect, subscribe) and from the socket task (frames, close).
use actix::prelude::*;
use tokio::sync::mpsc;

use super::message::PusherFrame;
use crate::api::error::SubscriptionError;
use crate::utils::Credentials;

/// Open the realtime connection for a user
#[derive(Message)]
#[rtype(result = "()")]
pub struct Connect {
    pub credentials: Credentials,
}

/// Unsubscribe everything, close the socket and reset session state
#[derive(Message)]
#[rtype(result = "()")]
pub struct Disconnect;

#[derive(Message)]
#[rtype(result = "()")]
pub struct SubscribeConversation {
    pub conversation_id: String,
}

#[derive(Message)]
#[rtype(result = "()")]
pub struct UnsubscribeConversation {
    pub conversation_id: String,
}

#[derive(Debug)]
pub enum SocketEventKind {
    Frame(PusherFrame),
    Closed { reason: Option<String> },
}

/// Delivered by the socket task. `connection_id` lets the bridge drop
/// events from a connection it already tore down.
#[derive(Message, Debug)]
#[rtype(result = "()")]
pub struct SocketEvent {
    pub connection_id: u64,
    pub kind: SocketEventKind,
}

/// Per-conversation channel state as seen by callers
#[derive(Debug, Clone, PartialEq, MessageResponse)]
pub enum SubscriptionState {
    Unsubscribed,
    Pending,
    Subscribed,
    Failed(SubscriptionError),
}

#[derive(Message)]
#[rtype(result = "SubscriptionState")]
pub struct GetSubscriptionState {
    pub conversation_id: String,
}

/// Side channel for events that need a refetch instead of a store mutation
#[derive(Debug, Clone, PartialEq)]
pub enum ConversationSignal {
    Created { payload: serde_json::Value },
}

#[derive(Message)]
#[rtype(result = "()")]
pub struct RegisterConversationObserver {
    pub observer: mpsc::UnboundedSender<ConversationSignal>,
}
