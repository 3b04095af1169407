/// Transport Bridge Actor
///
/// Owns the pub/sub connection and the channel subscriptions of one user:
/// - Authorizes and subscribes `private-user-{id}` once the socket is ready
/// - Tracks `private-conversation-{id}` channels (pending / subscribed)
/// - Routes push events into the `ChatStore` actor
/// - Publishes `isConnected` on a watch channel
///
/// Failures never reach callers. They are logged and reflected in the
/// connection flag or the channel state.
use actix::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use validator::Validate;

use super::authorizer::{ChannelAuthorizer, HttpChannelAuthorizer};
use super::events::*;
use super::message::{
    ChannelName, ConversationChannelEvent, InboundEvent, OutboundFrame, PusherFrame,
    UserChannelEvent,
};
use super::socket::{Connector, WebSocketConnector};
use crate::api::error::SubscriptionError;
use crate::configs::PusherConfig;
use crate::constants::DEFAULT_ACTIVITY_TIMEOUT_SECS;
use crate::modules::message::schema::MessageEntity;
use crate::modules::store::{
    actor::ChatStore,
    events::{ApplyReadReceipt, IngestPushedMessage},
};
use crate::utils::Credentials;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChannelState {
    /// Waiting on authorization. Each subscribe gets a fresh attempt id, so
    /// a result started before an unsubscribe cannot complete a later one.
    Pending(u64),
    /// `pusher:subscribe` sent, no answer yet
    Requested,
    Subscribed,
}

impl ChannelState {
    /// Whether the server knows about the channel
    fn is_requested(&self) -> bool {
        matches!(self, ChannelState::Requested | ChannelState::Subscribed)
    }
}

struct Connection {
    outbound: mpsc::UnboundedSender<String>,
    socket_id: Option<String>,
    credentials: Credentials,
    heartbeat: Option<SpawnHandle>,
}

pub struct TransportBridge {
    config: PusherConfig,
    store: Addr<ChatStore>,
    connector: Box<dyn Connector>,
    authorizer: Arc<dyn ChannelAuthorizer>,

    /// Bumped on every connect and disconnect. Socket events and
    /// authorization results carry the value they were started under.
    generation: u64,
    connection: Option<Connection>,
    attempts: u64,

    /// Map: channel name -> state. Absent means unsubscribed.
    channels: HashMap<String, ChannelState>,

    /// 403 results, kept until `Disconnect`
    blocked: HashMap<String, SubscriptionError>,

    observers: Vec<mpsc::UnboundedSender<ConversationSignal>>,
    connected_tx: watch::Sender<bool>,
}

impl TransportBridge {
    pub fn new(
        config: PusherConfig,
        store: Addr<ChatStore>,
        connector: Box<dyn Connector>,
        authorizer: Arc<dyn ChannelAuthorizer>,
    ) -> Self {
        let (connected_tx, _) = watch::channel(false);
        Self {
            config,
            store,
            connector,
            authorizer,
            generation: 0,
            connection: None,
            attempts: 0,
            channels: HashMap::new(),
            blocked: HashMap::new(),
            observers: Vec::new(),
            connected_tx,
        }
    }

    /// Bridge backed by a real websocket and the HTTP authorization endpoint
    pub fn with_websocket(
        config: PusherConfig,
        store: Addr<ChatStore>,
        http: reqwest::Client,
    ) -> Self {
        let authorizer = Arc::new(HttpChannelAuthorizer::new(http, config.auth_endpoint.clone()));
        Self::new(config, store, Box::new(WebSocketConnector), authorizer)
    }

    pub fn connected_receiver(&self) -> watch::Receiver<bool> {
        self.connected_tx.subscribe()
    }

    fn set_connected(&self, connected: bool) {
        self.connected_tx.send_if_modified(|current| {
            let changed = *current != connected;
            *current = connected;
            changed
        });
    }

    fn send_frame(&self, frame: &OutboundFrame) {
        let Some(connection) = &self.connection else {
            return;
        };

        match serde_json::to_string(frame) {
            Ok(json) => {
                if let Err(e) = connection.outbound.send(json) {
                    tracing::error!("Failed to queue frame for the socket: {}", e);
                }
            }
            Err(e) => tracing::error!("Failed to serialize outbound frame: {}", e),
        }
    }

    fn socket_ready(&self) -> bool {
        self.connection.as_ref().is_some_and(|c| c.socket_id.is_some())
    }

    fn next_attempt(&mut self) -> u64 {
        self.attempts += 1;
        self.attempts
    }

    /// Ask the authorization endpoint to sign `channel`. The result re-enters
    /// the actor and is dropped if the connection changed meanwhile.
    fn authorize(&self, channel: String, attempt: u64, ctx: &mut Context<Self>) {
        let Some(connection) = &self.connection else {
            return;
        };
        let Some(socket_id) = connection.socket_id.clone() else {
            return;
        };

        let authorizer = self.authorizer.clone();
        let access_token = connection.credentials.access_token.clone();
        let generation = self.generation;
        let channel_name = channel.clone();

        tracing::debug!("Authorizing channel {}", channel);

        ctx.spawn(
            async move { authorizer.authorize(&socket_id, &channel_name, &access_token).await }
                .into_actor(self)
                .map(move |result, act, _ctx| {
                    act.on_authorized(generation, channel, attempt, result)
                }),
        );
    }

    fn on_authorized(
        &mut self,
        generation: u64,
        channel: String,
        attempt: u64,
        result: Result<String, SubscriptionError>,
    ) {
        if generation != self.generation || self.connection.is_none() {
            tracing::debug!("Dropping stale authorization for {}", channel);
            return;
        }
        if self.channels.get(&channel) != Some(&ChannelState::Pending(attempt)) {
            tracing::debug!("Channel {} changed before authorization {} finished", channel, attempt);
            return;
        }

        match result {
            Ok(auth) => {
                self.channels.insert(channel.clone(), ChannelState::Requested);
                self.send_frame(&OutboundFrame::Subscribe { channel, auth });
            }
            Err(e) => self.fail_channel(channel, e),
        }
    }

    fn fail_channel(&mut self, channel: String, error: SubscriptionError) {
        self.channels.remove(&channel);
        tracing::warn!("Subscription to {} failed: {} ({})", channel, error, error.guidance());

        if error.is_permanent() {
            self.blocked.insert(channel, error);
        }
    }

    fn start_heartbeat(&mut self, activity_timeout: Option<u64>, ctx: &mut Context<Self>) {
        let interval = Duration::from_secs(activity_timeout.unwrap_or(DEFAULT_ACTIVITY_TIMEOUT_SECS));
        let handle = ctx.run_interval(interval, |act, _ctx| {
            tracing::debug!("Sending keepalive ping");
            act.send_frame(&OutboundFrame::Ping {});
        });

        if let Some(connection) = self.connection.as_mut() {
            if let Some(old) = connection.heartbeat.replace(handle) {
                ctx.cancel_future(old);
            }
        }
    }

    /// Socket is gone. Server side subscriptions died with it; the store
    /// keeps everything it already has.
    fn drop_connection(&mut self, ctx: &mut Context<Self>) {
        if let Some(connection) = self.connection.take() {
            if let Some(handle) = connection.heartbeat {
                ctx.cancel_future(handle);
            }
        }
        self.channels.clear();
        self.set_connected(false);
    }

    fn handle_frame(&mut self, frame: PusherFrame, ctx: &mut Context<Self>) {
        let event = match InboundEvent::parse(&frame) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(
                    "Malformed payload for {} on {:?}: {}",
                    frame.event,
                    frame.channel,
                    e
                );
                return;
            }
        };

        match event {
            InboundEvent::ConnectionEstablished { socket_id, activity_timeout } => {
                self.on_connection_established(socket_id, activity_timeout, ctx);
            }

            InboundEvent::SubscriptionSucceeded { channel } => {
                if let Some(state) = self.channels.get_mut(&channel) {
                    *state = ChannelState::Subscribed;
                    tracing::info!("Subscribed to {}", channel);
                }
            }

            InboundEvent::SubscriptionError { channel, status, message } => {
                let error = status
                    .map(SubscriptionError::from_status)
                    .unwrap_or(SubscriptionError::Transport(message));
                self.fail_channel(channel, error);
            }

            InboundEvent::Error { code, message } => {
                tracing::warn!("Pub/sub error {:?}: {}", code, message);
            }

            InboundEvent::Ping => self.send_frame(&OutboundFrame::Pong {}),

            InboundEvent::Pong => tracing::debug!("Keepalive pong received"),

            InboundEvent::User { event: UserChannelEvent::NewMessage(message), .. } => {
                self.on_user_channel_message(message);
            }

            InboundEvent::User { event: UserChannelEvent::NewConversation(payload), .. } => {
                self.notify_observers(ConversationSignal::Created { payload });
            }

            InboundEvent::Conversation {
                conversation_id,
                event: ConversationChannelEvent::Message(message),
            } => {
                if routed_to(&conversation_id, &message.conversation_id, "message") {
                    self.store.do_send(IngestPushedMessage { message });
                }
            }

            InboundEvent::Conversation {
                conversation_id,
                event: ConversationChannelEvent::MessageRead(receipt),
            } => {
                if !routed_to(&conversation_id, &receipt.conversation_id, "message-read") {
                    return;
                }
                self.store.do_send(ApplyReadReceipt {
                    conversation_id: receipt.conversation_id,
                    message_id: receipt.message_id,
                    read_at: receipt.read_at,
                });
            }

            InboundEvent::Ignored { event, channel } => {
                tracing::debug!("Ignoring {} on {:?}", event, channel);
            }
        }
    }

    fn on_connection_established(
        &mut self,
        socket_id: String,
        activity_timeout: Option<u64>,
        ctx: &mut Context<Self>,
    ) {
        let Some(connection) = self.connection.as_mut() else {
            return;
        };
        tracing::info!("Realtime connection established (socket {})", socket_id);

        connection.socket_id = Some(socket_id);
        let user_channel = ChannelName::User(connection.credentials.user_id.clone()).to_string();

        self.set_connected(true);
        self.start_heartbeat(activity_timeout, ctx);

        if !self.channels.contains_key(&user_channel) {
            let attempt = self.next_attempt();
            self.channels.insert(user_channel, ChannelState::Pending(attempt));
        }

        let pending: Vec<(String, u64)> = self
            .channels
            .iter()
            .filter_map(|(name, state)| match state {
                ChannelState::Pending(attempt) => Some((name.clone(), *attempt)),
                _ => None,
            })
            .collect();

        for (channel, attempt) in pending {
            self.authorize(channel, attempt, ctx);
        }
    }

    /// The user channel duplicates conversation channel traffic, so a copy
    /// is only kept when nobody is listening on the conversation itself.
    fn on_user_channel_message(&self, message: MessageEntity) {
        let channel = ChannelName::Conversation(message.conversation_id.clone()).to_string();

        if self.channels.get(&channel) == Some(&ChannelState::Subscribed) {
            tracing::debug!("Skipping {} from user channel, {} is live", message.id, channel);
            return;
        }
        self.store.do_send(IngestPushedMessage { message });
    }

    fn notify_observers(&mut self, signal: ConversationSignal) {
        tracing::debug!("Notifying {} conversation observer(s)", self.observers.len());
        self.observers.retain(|observer| observer.send(signal.clone()).is_ok());
    }
}

/// Conversation channel payloads must name the channel's own conversation.
fn routed_to(channel_id: &str, payload_id: &str, event: &str) -> bool {
    if channel_id == payload_id {
        return true;
    }
    tracing::warn!(
        "Dropping {} for conversation {} received on the channel of {}",
        event,
        payload_id,
        channel_id
    );
    false
}

impl Actor for TransportBridge {
    type Context = Context<Self>;

    fn started(&mut self, _ctx: &mut Self::Context) {
        tracing::debug!("Transport bridge started");
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        tracing::debug!("Transport bridge stopped");
    }
}

impl Handler<Connect> for TransportBridge {
    type Result = ();

    fn handle(&mut self, msg: Connect, ctx: &mut Context<Self>) {
        if self.connection.is_some() {
            tracing::debug!("Realtime already connected, ignoring connect");
            return;
        }

        if let Err(e) = msg.credentials.validate() {
            tracing::warn!("Realtime disabled, incomplete credentials: {}", e);
            return;
        }

        let Some(url) = self.config.socket_url() else {
            tracing::warn!("Realtime disabled, PUSHER_KEY is not configured");
            return;
        };

        self.generation += 1;
        tracing::info!("Opening realtime connection {}", self.generation);

        let outbound = self.connector.open(url, self.generation, ctx.address().recipient());
        self.connection = Some(Connection {
            outbound,
            socket_id: None,
            credentials: msg.credentials,
            heartbeat: None,
        });
    }
}

impl Handler<Disconnect> for TransportBridge {
    type Result = ();

    fn handle(&mut self, _: Disconnect, ctx: &mut Context<Self>) {
        if self.socket_ready() {
            let subscribed: Vec<String> = self
                .channels
                .iter()
                .filter(|(_, state)| state.is_requested())
                .map(|(name, _)| name.clone())
                .collect();
            for channel in subscribed {
                self.send_frame(&OutboundFrame::Unsubscribe { channel });
            }
        }

        if self.connection.is_some() {
            tracing::info!("Closing realtime connection {}", self.generation);
        }

        // Dropping the outbound sender ends the socket task
        self.drop_connection(ctx);
        self.blocked.clear();
        self.generation += 1;
    }
}

impl Handler<SubscribeConversation> for TransportBridge {
    type Result = ();

    fn handle(&mut self, msg: SubscribeConversation, ctx: &mut Context<Self>) {
        let channel = ChannelName::Conversation(msg.conversation_id).to_string();

        if let Some(error) = self.blocked.get(&channel) {
            tracing::warn!("Not subscribing to {}: {}", channel, error.guidance());
            return;
        }
        if self.channels.contains_key(&channel) {
            tracing::debug!("Channel {} already pending or subscribed", channel);
            return;
        }

        let attempt = self.next_attempt();
        self.channels.insert(channel.clone(), ChannelState::Pending(attempt));
        if self.socket_ready() {
            self.authorize(channel, attempt, ctx);
        } else {
            tracing::debug!("Socket not ready, {} queued", channel);
        }
    }
}

impl Handler<UnsubscribeConversation> for TransportBridge {
    type Result = ();

    fn handle(&mut self, msg: UnsubscribeConversation, _: &mut Context<Self>) {
        let channel = ChannelName::Conversation(msg.conversation_id).to_string();

        let Some(state) = self.channels.remove(&channel) else {
            return;
        };
        if state.is_requested() && self.socket_ready() {
            tracing::debug!("Unsubscribing from {}", channel);
            self.send_frame(&OutboundFrame::Unsubscribe { channel });
        }
    }
}

impl Handler<SocketEvent> for TransportBridge {
    type Result = ();

    fn handle(&mut self, msg: SocketEvent, ctx: &mut Context<Self>) {
        if msg.connection_id != self.generation || self.connection.is_none() {
            tracing::debug!("Ignoring event from stale connection {}", msg.connection_id);
            return;
        }

        match msg.kind {
            SocketEventKind::Frame(frame) => self.handle_frame(frame, ctx),
            SocketEventKind::Closed { reason } => {
                tracing::warn!("Realtime connection lost: {}", reason.as_deref().unwrap_or("closed"));
                self.drop_connection(ctx);
            }
        }
    }
}

impl Handler<GetSubscriptionState> for TransportBridge {
    type Result = SubscriptionState;

    fn handle(&mut self, msg: GetSubscriptionState, _: &mut Context<Self>) -> Self::Result {
        let channel = ChannelName::Conversation(msg.conversation_id).to_string();

        if let Some(error) = self.blocked.get(&channel) {
            return SubscriptionState::Failed(error.clone());
        }
        match self.channels.get(&channel) {
            Some(ChannelState::Pending(_) | ChannelState::Requested) => SubscriptionState::Pending,
            Some(ChannelState::Subscribed) => SubscriptionState::Subscribed,
            None => SubscriptionState::Unsubscribed,
        }
    }
}

impl Handler<RegisterConversationObserver> for TransportBridge {
    type Result = ();

    fn handle(&mut self, msg: RegisterConversationObserver, _: &mut Context<Self>) {
        self.observers.push(msg.observer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::message::schema::SenderRole;
    use crate::modules::store::events::{GetMessages, GetUnreadCount};
    use crate::test::fixtures::{
        bridge_config, conversation_frame, established_frame, message, user_frame,
        FakeAuthorizer, FakeConnector,
    };

    struct Harness {
        bridge: Addr<TransportBridge>,
        store: Addr<ChatStore>,
        connector: FakeConnector,
        connected: watch::Receiver<bool>,
    }

    fn harness(authorizer: FakeAuthorizer) -> Harness {
        let store = ChatStore::new(SenderRole::Buyer).start();
        let connector = FakeConnector::default();
        let bridge = TransportBridge::new(
            bridge_config(Some("key")),
            store.clone(),
            Box::new(connector.clone()),
            Arc::new(authorizer),
        );
        let connected = bridge.connected_receiver();
        Harness { bridge: bridge.start(), store, connector, connected }
    }

    impl Harness {
        async fn connect(&self) {
            self.bridge.send(Connect { credentials: Credentials::new("u1", "token") }).await.unwrap();
        }

        async fn frame(&self, connection_id: u64, frame: PusherFrame) {
            self.bridge
                .send(SocketEvent { connection_id, kind: SocketEventKind::Frame(frame) })
                .await
                .unwrap();
        }

        async fn establish(&self) {
            self.connect().await;
            self.frame(1, established_frame("1.1")).await;
            self.settle().await;
        }

        /// Round trip through the bridge so spawned authorizations finish
        async fn settle(&self) {
            for _ in 0..3 {
                self.bridge
                    .send(GetSubscriptionState { conversation_id: String::new() })
                    .await
                    .unwrap();
            }
        }

        async fn state(&self, conversation_id: &str) -> SubscriptionState {
            self.bridge
                .send(GetSubscriptionState { conversation_id: conversation_id.into() })
                .await
                .unwrap()
        }

        async fn subscribe(&self, conversation_id: &str) {
            self.bridge
                .send(SubscribeConversation { conversation_id: conversation_id.into() })
                .await
                .unwrap();
            self.settle().await;
        }

        async fn succeed(&self, channel: &str) {
            let frame: PusherFrame = serde_json::from_value(serde_json::json!({
                "event": "pusher_internal:subscription_succeeded",
                "channel": channel,
                "data": "{}"
            }))
            .unwrap();
            self.frame(1, frame).await;
        }

        async fn message_ids(&self, conversation_id: &str) -> Vec<String> {
            self.store
                .send(GetMessages { conversation_id: conversation_id.into() })
                .await
                .unwrap()
                .into_iter()
                .map(|m| m.id)
                .collect()
        }
    }

    #[actix_rt::test]
    async fn test_connect_subscribes_user_channel() {
        let h = harness(FakeAuthorizer::default());
        h.establish().await;

        assert!(*h.connected.borrow());
        assert_eq!(h.connector.urls().len(), 1);
        assert!(h.connector.urls()[0].contains("/app/key?protocol=7"));

        let frames = h.connector.sent();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0]["event"], "pusher:subscribe");
        assert_eq!(frames[0]["data"]["channel"], "private-user-u1");
        assert_eq!(frames[0]["data"]["auth"], "1.1:private-user-u1");
    }

    #[actix_rt::test]
    async fn test_connect_is_idempotent() {
        let h = harness(FakeAuthorizer::default());
        h.connect().await;
        h.connect().await;
        assert_eq!(h.connector.urls().len(), 1);
    }

    #[actix_rt::test]
    async fn test_missing_key_or_credentials_is_noop() {
        let store = ChatStore::new(SenderRole::Buyer).start();
        let connector = FakeConnector::default();
        let bridge = TransportBridge::new(
            bridge_config(None),
            store,
            Box::new(connector.clone()),
            Arc::new(FakeAuthorizer::default()),
        )
        .start();

        bridge.send(Connect { credentials: Credentials::new("u1", "token") }).await.unwrap();
        assert!(connector.urls().is_empty());

        let h = harness(FakeAuthorizer::default());
        h.bridge.send(Connect { credentials: Credentials::new("u1", "") }).await.unwrap();
        assert!(h.connector.urls().is_empty());
    }

    #[actix_rt::test]
    async fn test_subscribe_before_socket_ready_is_queued() {
        let h = harness(FakeAuthorizer::default());
        h.connect().await;
        h.subscribe("c1").await;

        assert_eq!(h.state("c1").await, SubscriptionState::Pending);
        assert!(h.connector.sent().is_empty());

        h.frame(1, established_frame("1.1")).await;
        h.settle().await;

        let channels: Vec<String> = h
            .connector
            .sent()
            .iter()
            .map(|f| f["data"]["channel"].as_str().unwrap_or_default().to_string())
            .collect();
        assert!(channels.contains(&"private-user-u1".to_string()));
        assert!(channels.contains(&"private-conversation-c1".to_string()));
    }

    #[actix_rt::test]
    async fn test_subscribe_twice_sends_one_subscribe() {
        let h = harness(FakeAuthorizer::default());
        h.establish().await;

        h.subscribe("c1").await;
        h.subscribe("c1").await;
        h.succeed("private-conversation-c1").await;
        h.subscribe("c1").await;

        let subscribes = h
            .connector
            .sent()
            .iter()
            .filter(|f| f["data"]["channel"] == "private-conversation-c1")
            .count();
        assert_eq!(subscribes, 1);
        assert_eq!(h.state("c1").await, SubscriptionState::Subscribed);
    }

    #[actix_rt::test]
    async fn test_user_channel_copy_dropped_while_conversation_subscribed() {
        let h = harness(FakeAuthorizer::default());
        h.establish().await;
        h.subscribe("c1").await;
        h.succeed("private-conversation-c1").await;

        let m5 = message("m5", "c1", SenderRole::Merchant, 5);
        h.frame(1, user_frame("u1", "new-message", &m5)).await;
        assert!(h.message_ids("c1").await.is_empty());

        h.frame(1, conversation_frame("c1", "message", &m5)).await;
        h.frame(1, conversation_frame("c1", "message", &m5)).await;
        assert_eq!(h.message_ids("c1").await, vec!["m5"]);
    }

    #[actix_rt::test]
    async fn test_user_channel_copy_kept_without_conversation_channel() {
        let h = harness(FakeAuthorizer::default());
        h.establish().await;

        let m1 = message("m1", "c2", SenderRole::Merchant, 1);
        h.frame(1, user_frame("u1", "new-message", &m1)).await;

        assert_eq!(h.message_ids("c2").await, vec!["m1"]);
        let unread = h
            .store
            .send(GetUnreadCount { viewer: SenderRole::Buyer, conversation_id: None })
            .await
            .unwrap();
        assert_eq!(unread, 1);
    }

    #[actix_rt::test]
    async fn test_forbidden_blocks_channel_for_session() {
        let h = harness(FakeAuthorizer::default().reject("private-conversation-c9", 403));
        h.establish().await;
        h.subscribe("c9").await;

        assert_eq!(h.state("c9").await, SubscriptionState::Failed(SubscriptionError::Forbidden));

        h.subscribe("c9").await;
        assert_eq!(h.connector.sent().len(), 1, "only the user channel subscribe");

        h.bridge.send(Disconnect).await.unwrap();
        assert_eq!(h.state("c9").await, SubscriptionState::Unsubscribed);
    }

    #[actix_rt::test]
    async fn test_backend_failure_allows_retry() {
        let h = harness(FakeAuthorizer::default().reject("private-conversation-c1", 500));
        h.establish().await;
        h.subscribe("c1").await;

        assert_eq!(h.state("c1").await, SubscriptionState::Unsubscribed);

        h.subscribe("c1").await;
        assert_eq!(h.state("c1").await, SubscriptionState::Unsubscribed);
        assert_eq!(h.connector.sent().len(), 1);
    }

    #[actix_rt::test]
    async fn test_subscription_error_frame_resets_channel() {
        let h = harness(FakeAuthorizer::default());
        h.establish().await;
        h.subscribe("c1").await;

        let frame: PusherFrame = serde_json::from_value(serde_json::json!({
            "event": "pusher:subscription_error",
            "channel": "private-conversation-c1",
            "data": {"status": 401, "error": "expired"}
        }))
        .unwrap();
        h.frame(1, frame).await;

        assert_eq!(h.state("c1").await, SubscriptionState::Unsubscribed);
    }

    #[actix_rt::test]
    async fn test_unsubscribe_sends_frame_and_forgets_channel() {
        let h = harness(FakeAuthorizer::default());
        h.establish().await;
        h.subscribe("c1").await;
        h.succeed("private-conversation-c1").await;

        h.bridge.send(UnsubscribeConversation { conversation_id: "c1".into() }).await.unwrap();
        h.bridge.send(UnsubscribeConversation { conversation_id: "zz".into() }).await.unwrap();

        let sent = h.connector.sent();
        let last = sent.last().unwrap();
        assert_eq!(last["event"], "pusher:unsubscribe");
        assert_eq!(last["data"]["channel"], "private-conversation-c1");
        assert_eq!(sent.iter().filter(|f| f["event"] == "pusher:unsubscribe").count(), 1);
        assert_eq!(h.state("c1").await, SubscriptionState::Unsubscribed);
    }

    #[actix_rt::test]
    async fn test_socket_close_clears_channels_keeps_store() {
        let h = harness(FakeAuthorizer::default());
        h.establish().await;
        h.subscribe("c1").await;
        h.succeed("private-conversation-c1").await;
        h.frame(1, conversation_frame("c1", "message", &message("m1", "c1", SenderRole::Merchant, 1)))
            .await;

        h.bridge
            .send(SocketEvent {
                connection_id: 1,
                kind: SocketEventKind::Closed { reason: None },
            })
            .await
            .unwrap();

        assert!(!*h.connected.borrow());
        assert_eq!(h.state("c1").await, SubscriptionState::Unsubscribed);
        assert_eq!(h.message_ids("c1").await, vec!["m1"]);

        // reconnect opens a fresh connection
        h.connect().await;
        assert_eq!(h.connector.urls().len(), 2);
    }

    #[actix_rt::test]
    async fn test_stale_connection_events_ignored() {
        let h = harness(FakeAuthorizer::default());
        h.establish().await;
        h.bridge.send(Disconnect).await.unwrap();
        h.connect().await;

        h.frame(1, established_frame("old")).await;
        h.settle().await;

        assert!(!*h.connected.borrow());
    }

    fn subscribe_frames(sent: &[serde_json::Value]) -> Vec<&serde_json::Value> {
        sent.iter().filter(|f| f["event"] == "pusher:subscribe").collect()
    }

    #[actix_rt::test]
    async fn test_resubscribe_during_authorization_sends_one_subscribe() {
        let h = harness(FakeAuthorizer::default().with_delay(Duration::from_millis(50)));
        h.establish().await;

        h.subscribe("c1").await;
        h.bridge.send(UnsubscribeConversation { conversation_id: "c1".into() }).await.unwrap();
        h.subscribe("c1").await;
        assert_eq!(h.state("c1").await, SubscriptionState::Pending);

        tokio::time::sleep(Duration::from_millis(150)).await;
        h.settle().await;

        let sent = h.connector.sent();
        let c1 = subscribe_frames(&sent)
            .into_iter()
            .filter(|f| f["data"]["channel"] == "private-conversation-c1")
            .count();
        assert_eq!(c1, 1);
        assert!(sent.iter().all(|f| f["event"] != "pusher:unsubscribe"));

        h.succeed("private-conversation-c1").await;
        assert_eq!(h.state("c1").await, SubscriptionState::Subscribed);
    }

    #[actix_rt::test]
    async fn test_authorization_from_closed_connection_is_dropped() {
        let h = harness(FakeAuthorizer::default().with_delay(Duration::from_millis(50)));
        h.establish().await;
        h.subscribe("c1").await;

        h.bridge.send(Disconnect).await.unwrap();
        h.connect().await;
        h.frame(3, established_frame("2.2")).await;

        tokio::time::sleep(Duration::from_millis(150)).await;
        h.settle().await;

        let sent = h.connector.sent();
        let subscribes = subscribe_frames(&sent);
        assert_eq!(subscribes.len(), 1, "only the new connection's user channel");
        assert_eq!(subscribes[0]["data"]["auth"], "2.2:private-user-u1");
        assert_eq!(h.state("c1").await, SubscriptionState::Unsubscribed);
    }

    #[actix_rt::test]
    async fn test_payload_for_another_conversation_is_dropped() {
        let h = harness(FakeAuthorizer::default());
        h.establish().await;
        h.subscribe("c1").await;
        h.succeed("private-conversation-c1").await;

        let foreign = message("m1", "c2", SenderRole::Merchant, 1);
        h.frame(1, conversation_frame("c1", "message", &foreign)).await;
        assert!(h.message_ids("c1").await.is_empty());
        assert!(h.message_ids("c2").await.is_empty());

        // c2 is only reachable through the user channel
        h.frame(1, user_frame("u1", "new-message", &foreign)).await;
        let receipt = serde_json::json!({
            "messageId": "m1",
            "conversationId": "c2",
            "readAt": "2026-03-01T10:30:00Z"
        });
        h.frame(1, conversation_frame("c1", "message-read", &receipt)).await;

        let unread = h
            .store
            .send(GetUnreadCount { viewer: SenderRole::Buyer, conversation_id: Some("c2".into()) })
            .await
            .unwrap();
        assert_eq!(unread, 1);
    }

    #[actix_rt::test]
    async fn test_disconnect_unsubscribes_and_resets() {
        let h = harness(FakeAuthorizer::default());
        h.establish().await;
        h.subscribe("c1").await;
        h.succeed("private-conversation-c1").await;

        h.bridge.send(Disconnect).await.unwrap();

        let unsubscribed: Vec<String> = h
            .connector
            .sent()
            .iter()
            .filter(|f| f["event"] == "pusher:unsubscribe")
            .map(|f| f["data"]["channel"].as_str().unwrap_or_default().to_string())
            .collect();
        assert!(unsubscribed.contains(&"private-user-u1".to_string()));
        assert!(unsubscribed.contains(&"private-conversation-c1".to_string()));
        assert!(!*h.connected.borrow());
        assert!(h.connector.is_closed(0));
        assert_eq!(h.state("c1").await, SubscriptionState::Unsubscribed);
    }

    #[actix_rt::test]
    async fn test_new_conversation_notifies_observers() {
        let h = harness(FakeAuthorizer::default());
        let (tx, mut rx) = mpsc::unbounded_channel();
        h.bridge.send(RegisterConversationObserver { observer: tx }).await.unwrap();
        h.establish().await;

        let payload = serde_json::json!({"id": "c7"});
        h.frame(1, user_frame("u1", "new-conversation", &payload)).await;

        assert_eq!(rx.try_recv().unwrap(), ConversationSignal::Created { payload });
    }

    #[actix_rt::test]
    async fn test_ping_answered_with_pong() {
        let h = harness(FakeAuthorizer::default());
        h.establish().await;

        let ping: PusherFrame =
            serde_json::from_value(serde_json::json!({"event": "pusher:ping", "data": {}})).unwrap();
        h.frame(1, ping).await;

        assert_eq!(h.connector.sent().last().unwrap()["event"], "pusher:pong");
    }

    #[actix_rt::test]
    async fn test_read_receipt_applied_through_store() {
        let h = harness(FakeAuthorizer::default());
        h.establish().await;
        h.subscribe("c1").await;
        h.succeed("private-conversation-c1").await;

        for (id, minute) in [("m1", 1), ("m2", 2)] {
            let m = message(id, "c1", SenderRole::Merchant, minute);
            h.frame(1, conversation_frame("c1", "message", &m)).await;
        }
        let receipt = serde_json::json!({
            "messageId": "m2",
            "conversationId": "c1",
            "readAt": "2026-03-01T10:30:00Z"
        });
        h.frame(1, conversation_frame("c1", "message-read", &receipt)).await;

        let unread = h
            .store
            .send(GetUnreadCount { viewer: SenderRole::Buyer, conversation_id: Some("c1".into()) })
            .await
            .unwrap();
        assert_eq!(unread, 0);
    }
}
