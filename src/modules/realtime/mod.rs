/// Realtime Module
///
/// Keeps the local chat state in sync with the pub/sub service:
///
/// - Wire protocol (PusherFrame, InboundEvent, OutboundFrame)
/// - Transport Bridge actor (connection, channel subscriptions, routing)
/// - Socket task (websocket ↔ bridge)
/// - Channel authorizer (signs private channel subscriptions)
pub mod authorizer;
pub mod bridge;
pub mod events;
pub mod message;
pub mod socket;
