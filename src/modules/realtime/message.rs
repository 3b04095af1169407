/// Pusher Wire Protocol
///
/// Frames exchanged with the pub/sub service over the websocket, plus the
/// translation of raw frames into chat events.
///
/// Every frame is `{"event": ..., "channel": ..., "data": ...}`. The server
/// encodes `data` as a JSON string; the client sends it as an object.
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fmt;

use crate::modules::message::{model::ReadReceipt, schema::MessageEntity};

const USER_CHANNEL_PREFIX: &str = "private-user-";
const CONVERSATION_CHANNEL_PREFIX: &str = "private-conversation-";

/// Private channel names used by the chat backend
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ChannelName {
    User(String),
    Conversation(String),
}

impl ChannelName {
    pub fn parse(raw: &str) -> Option<Self> {
        if let Some(id) = raw.strip_prefix(USER_CHANNEL_PREFIX) {
            return (!id.is_empty()).then(|| ChannelName::User(id.to_string()));
        }
        if let Some(id) = raw.strip_prefix(CONVERSATION_CHANNEL_PREFIX) {
            return (!id.is_empty()).then(|| ChannelName::Conversation(id.to_string()));
        }
        None
    }
}

impl fmt::Display for ChannelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelName::User(id) => write!(f, "{USER_CHANNEL_PREFIX}{id}"),
            ChannelName::Conversation(id) => write!(f, "{CONVERSATION_CHANNEL_PREFIX}{id}"),
        }
    }
}

/// Raw frame as it travels on the socket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PusherFrame {
    pub event: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    #[serde(default)]
    pub data: serde_json::Value,
}

impl PusherFrame {
    /// Decode `data`, accepting both the string-encoded and inline forms.
    pub fn data_as<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        match &self.data {
            serde_json::Value::String(raw) => serde_json::from_str(raw),
            other => T::deserialize(other),
        }
    }
}

/// Frames sent from client to server
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "data")]
pub enum OutboundFrame {
    #[serde(rename = "pusher:subscribe")]
    Subscribe { channel: String, auth: String },

    #[serde(rename = "pusher:unsubscribe")]
    Unsubscribe { channel: String },

    #[serde(rename = "pusher:ping")]
    Ping {},

    #[serde(rename = "pusher:pong")]
    Pong {},
}

#[derive(Debug, Clone, Deserialize)]
struct ConnectionEstablishedData {
    socket_id: String,
    #[serde(default)]
    activity_timeout: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ErrorData {
    #[serde(default)]
    code: Option<u16>,
    #[serde(default)]
    status: Option<u16>,
    #[serde(default, alias = "error")]
    message: Option<String>,
}

/// Events delivered on `private-user-{id}`
#[derive(Debug, Clone, PartialEq)]
pub enum UserChannelEvent {
    NewMessage(MessageEntity),
    /// Shape of the conversation is not guaranteed; callers refetch.
    NewConversation(serde_json::Value),
}

/// Events delivered on `private-conversation-{id}`
#[derive(Debug, Clone, PartialEq)]
pub enum ConversationChannelEvent {
    Message(MessageEntity),
    MessageRead(ReadReceipt),
}

/// A frame translated into something the bridge can act on
#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    ConnectionEstablished { socket_id: String, activity_timeout: Option<u64> },
    SubscriptionSucceeded { channel: String },
    SubscriptionError { channel: String, status: Option<u16>, message: String },
    Error { code: Option<u16>, message: String },
    Ping,
    Pong,
    User { user_id: String, event: UserChannelEvent },
    Conversation { conversation_id: String, event: ConversationChannelEvent },
    Ignored { event: String, channel: Option<String> },
}

impl InboundEvent {
    pub fn parse(frame: &PusherFrame) -> Result<Self, serde_json::Error> {
        let channel = frame.channel.clone();

        match frame.event.as_str() {
            "pusher:connection_established" => {
                let data: ConnectionEstablishedData = frame.data_as()?;
                Ok(InboundEvent::ConnectionEstablished {
                    socket_id: data.socket_id,
                    activity_timeout: data.activity_timeout,
                })
            }
            "pusher_internal:subscription_succeeded" | "pusher:subscription_succeeded" => {
                Ok(InboundEvent::SubscriptionSucceeded { channel: channel.unwrap_or_default() })
            }
            "pusher:subscription_error" => {
                let data: ErrorData = frame.data_as().unwrap_or_default();
                Ok(InboundEvent::SubscriptionError {
                    channel: channel.unwrap_or_default(),
                    status: data.status.or(data.code),
                    message: data.message.unwrap_or_else(|| "subscription rejected".to_string()),
                })
            }
            "pusher:error" => {
                let data: ErrorData = frame.data_as().unwrap_or_default();
                Ok(InboundEvent::Error {
                    code: data.code,
                    message: data.message.unwrap_or_default(),
                })
            }
            "pusher:ping" => Ok(InboundEvent::Ping),
            "pusher:pong" => Ok(InboundEvent::Pong),
            event => Self::parse_channel_event(frame, event, channel),
        }
    }

    fn parse_channel_event(
        frame: &PusherFrame,
        event: &str,
        channel: Option<String>,
    ) -> Result<Self, serde_json::Error> {
        let parsed = channel.as_deref().and_then(ChannelName::parse);

        let inbound = match (parsed, event) {
            (Some(ChannelName::User(user_id)), "new-message") => InboundEvent::User {
                user_id,
                event: UserChannelEvent::NewMessage(frame.data_as()?),
            },
            (Some(ChannelName::User(user_id)), "new-conversation") => InboundEvent::User {
                user_id,
                event: UserChannelEvent::NewConversation(frame.data_as()?),
            },
            (Some(ChannelName::Conversation(conversation_id)), "message") => {
                InboundEvent::Conversation {
                    conversation_id,
                    event: ConversationChannelEvent::Message(frame.data_as()?),
                }
            }
            (Some(ChannelName::Conversation(conversation_id)), "message-read") => {
                InboundEvent::Conversation {
                    conversation_id,
                    event: ConversationChannelEvent::MessageRead(frame.data_as()?),
                }
            }
            _ => InboundEvent::Ignored { event: event.to_string(), channel },
        };
        Ok(inbound)
    }
}
