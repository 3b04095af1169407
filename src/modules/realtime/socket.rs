/// Realtime Socket Task
///
/// Owns the websocket to the pub/sub service and bridges it with the
/// `TransportBridge` actor:
/// - Inbound:  socket → parse `PusherFrame` → `SocketEvent` → bridge
/// - Outbound: bridge → mpsc channel → socket
///
/// Dropping the outbound sender closes the socket.
use actix::Recipient;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};

use super::events::{SocketEvent, SocketEventKind};
use super::message::PusherFrame;

/// Opens connections for the bridge. Swapped for an in-memory fake in tests.
pub trait Connector: 'static {
    fn open(
        &self,
        url: String,
        connection_id: u64,
        sink: Recipient<SocketEvent>,
    ) -> mpsc::UnboundedSender<String>;
}

pub struct WebSocketConnector;

impl Connector for WebSocketConnector {
    fn open(
        &self,
        url: String,
        connection_id: u64,
        sink: Recipient<SocketEvent>,
    ) -> mpsc::UnboundedSender<String> {
        let (tx, rx) = mpsc::unbounded_channel::<String>();
        actix_rt::spawn(run_socket(url, connection_id, sink, rx));
        tx
    }
}

async fn run_socket(
    url: String,
    connection_id: u64,
    sink: Recipient<SocketEvent>,
    mut rx: mpsc::UnboundedReceiver<String>,
) {
    let closed = |reason: Option<String>| SocketEvent {
        connection_id,
        kind: SocketEventKind::Closed { reason },
    };

    let stream = match connect_async(url.as_str()).await {
        Ok((stream, _response)) => stream,
        Err(e) => {
            tracing::warn!("Realtime connection failed: {}", e);
            sink.do_send(closed(Some(e.to_string())));
            return;
        }
    };
    tracing::info!("Realtime socket {} opened", connection_id);

    let (mut write, mut read) = stream.split();
    let mut reason = None;

    loop {
        tokio::select! {
            msg = read.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<PusherFrame>(text.as_str()) {
                            Ok(frame) => {
                                sink.do_send(SocketEvent {
                                    connection_id,
                                    kind: SocketEventKind::Frame(frame),
                                });
                            }
                            Err(e) => {
                                let raw: String = text.as_str().chars().take(100).collect();
                                tracing::warn!("Unparseable frame: {} - raw: {}", e, raw);
                            }
                        }
                    }

                    Some(Ok(Message::Ping(data))) => {
                        if let Err(e) = write.send(Message::Pong(data)).await {
                            tracing::error!("Failed to send pong: {}", e);
                            reason = Some(e.to_string());
                            break;
                        }
                    }

                    Some(Ok(Message::Close(frame))) => {
                        tracing::info!("Realtime socket close frame: {:?}", frame);
                        reason = frame.map(|f| f.reason.as_str().to_string());
                        break;
                    }

                    Some(Ok(Message::Binary(_))) => {
                        tracing::warn!("Binary frames are not part of the protocol");
                    }

                    Some(Ok(Message::Pong(_) | Message::Frame(_))) => {}

                    Some(Err(e)) => {
                        tracing::error!("Realtime socket error: {}", e);
                        reason = Some(e.to_string());
                        break;
                    }

                    None => break,
                }
            }

            outbound = rx.recv() => {
                match outbound {
                    Some(json) => {
                        if let Err(e) = write.send(Message::text(json)).await {
                            tracing::error!("Failed to write frame: {}", e);
                            reason = Some(e.to_string());
                            break;
                        }
                    }
                    // Bridge dropped the sender: local disconnect
                    None => {
                        let _ = write.send(Message::Close(None)).await;
                        break;
                    }
                }
            }
        }
    }

    let _ = write.close().await;
    tracing::debug!("Realtime socket {} loop finished", connection_id);
    sink.do_send(closed(reason));
}
