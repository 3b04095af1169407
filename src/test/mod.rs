#![allow(dead_code)]


use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use crate::modules::message::{model::SendMessage, schema::SenderRole};
use crate::modules::realtime::events::{
    GetSubscriptionState, SocketEvent, SocketEventKind, SubscriptionState,
};
use crate::modules::realtime::message::PusherFrame;
use crate::utils::Credentials;
use fixtures::*;

async fn push(service: &FakeChatService, frame: PusherFrame) {
    service
        .bridge()
        .send(SocketEvent { connection_id: 1, kind: SocketEventKind::Frame(frame) })
        .await
        .unwrap();
}

async fn settle(service: &FakeChatService) {
    for _ in 0..3 {
        service
            .bridge()
            .send(GetSubscriptionState { conversation_id: String::new() })
            .await
            .unwrap();
    }
}

async fn connected_service(backend: Arc<FakeBackend>) -> (FakeChatService, FakeConnector) {
    let (service, connector) = chat_service(backend, FakeAuthorizer::default());
    service.connect(Credentials::new("buyer-1", "token")).await;
    push(&service, established_frame("42.7")).await;
    settle(&service).await;
    (service, connector)
}

async fn subscribed(service: &FakeChatService, conversation_id: &str) {
    service.select_conversation(Some(conversation_id.to_string())).await.unwrap();
    settle(service).await;
    let frame: PusherFrame = serde_json::from_value(serde_json::json!({
        "event": "pusher_internal:subscription_succeeded",
        "channel": format!("private-conversation-{conversation_id}"),
        "data": "{}"
    }))
    .unwrap();
    push(service, frame).await;
}

fn ids(messages: &[crate::modules::message::schema::MessageEntity]) -> Vec<&str> {
    messages.iter().map(|m| m.id.as_str()).collect()
}

#[actix_rt::test]
async fn test_load_select_and_receive_push() {
    let backend = Arc::new(FakeBackend::default());
    *backend.conversations.lock().unwrap() = vec![conversation("A", 2), conversation("B", 1)];
    backend.messages.lock().unwrap().insert(
        "A".into(),
        vec![
            message("a2", "A", SenderRole::Merchant, 2),
            message("a0", "A", SenderRole::Merchant, 0),
            message("a1", "A", SenderRole::Buyer, 1),
        ],
    );
    let (service, _) = connected_service(backend).await;

    assert_eq!(service.load_conversations().await.unwrap().len(), 2);

    subscribed(&service, "A").await;
    assert_eq!(ids(&service.get_messages("A").await.unwrap()), vec!["a0", "a1", "a2"]);
    assert_eq!(service.subscription_state("A").await.unwrap(), SubscriptionState::Subscribed);

    let pushed = message("a3", "A", SenderRole::Merchant, 3);
    push(&service, conversation_frame("A", "message", &pushed)).await;

    let messages = service.get_messages("A").await.unwrap();
    assert_eq!(ids(&messages), vec!["a0", "a1", "a2", "a3"]);

    let conversations = service.conversations().await.unwrap();
    assert_eq!(conversations[0].id, "A");
    assert_eq!(conversations[0].updated_at, at(3));
}

#[actix_rt::test]
async fn test_conversation_channel_first_then_user_copy() {
    let backend = Arc::new(FakeBackend::default());
    let (service, _) = connected_service(backend).await;
    subscribed(&service, "A").await;

    let m = message("m9", "A", SenderRole::Merchant, 9);
    push(&service, conversation_frame("A", "message", &m)).await;
    push(&service, user_frame("buyer-1", "new-message", &m)).await;

    assert_eq!(ids(&service.get_messages("A").await.unwrap()), vec!["m9"]);
}

#[actix_rt::test]
async fn test_sent_message_and_push_copy_converge() {
    let backend = Arc::new(FakeBackend::default());
    let (service, _) = connected_service(backend).await;
    subscribed(&service, "A").await;

    let sent = service.send_message("A", SendMessage::text("Is this still available?")).await.unwrap();
    push(&service, conversation_frame("A", "message", &sent)).await;

    let messages = service.get_messages("A").await.unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].content.as_deref(), Some("Is this still available?"));
    // own messages never count as unread
    assert_eq!(service.unread_count(), 0);
}

#[actix_rt::test]
async fn test_mark_read_then_pushed_receipt_is_noop() {
    let backend = Arc::new(FakeBackend::default());
    backend.messages.lock().unwrap().insert(
        "A".into(),
        vec![
            message("m1", "A", SenderRole::Merchant, 1),
            message("m2", "A", SenderRole::Merchant, 2),
            message("m3", "A", SenderRole::Merchant, 3),
        ],
    );
    let (service, _) = connected_service(backend.clone()).await;
    subscribed(&service, "A").await;
    assert_eq!(service.unread_count(), 3);

    assert_eq!(service.mark_read("A", "m2").await.unwrap(), 2);
    assert_eq!(service.unread_count(), 1);
    assert_eq!(service.unread_count_in("A").await.unwrap(), 1);
    assert_eq!(
        *backend.read_requests.lock().unwrap(),
        vec![("A".to_string(), "m2".to_string())]
    );

    let local_read_at = service.get_messages("A").await.unwrap()[1].read_at;
    let receipt = serde_json::json!({
        "messageId": "m2",
        "conversationId": "A",
        "readAt": "2026-03-01T10:45:00Z"
    });
    push(&service, conversation_frame("A", "message-read", &receipt)).await;

    let messages = service.get_messages("A").await.unwrap();
    assert_eq!(messages[1].read_at, local_read_at);
    assert!(messages[2].read_at.is_none());
}

#[actix_rt::test]
async fn test_deselect_keeps_subscription() {
    let backend = Arc::new(FakeBackend::default());
    let (service, connector) = connected_service(backend).await;
    subscribed(&service, "A").await;

    service.select_conversation(None).await.unwrap();

    assert_eq!(service.active_conversation().await.unwrap(), None);
    assert_eq!(service.subscription_state("A").await.unwrap(), SubscriptionState::Subscribed);
    assert!(connector.sent().iter().all(|f| f["event"] != "pusher:unsubscribe"));

    service.unsubscribe_conversation("A");
    assert_eq!(service.subscription_state("A").await.unwrap(), SubscriptionState::Unsubscribed);
}

#[actix_rt::test]
async fn test_new_conversation_event_reloads_list() {
    let backend = Arc::new(FakeBackend::default());
    let (service, _) = connected_service(backend.clone()).await;
    let _refresh = service.spawn_conversation_refresh();
    assert!(service.load_conversations().await.unwrap().is_empty());

    backend.conversations.lock().unwrap().push(conversation("N", 5));
    push(&service, user_frame("buyer-1", "new-conversation", &serde_json::json!({"id": "N"})))
        .await;

    let mut refreshed = Vec::new();
    for _ in 0..50 {
        refreshed = service.conversations().await.unwrap();
        if !refreshed.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(refreshed.len(), 1);
    assert_eq!(refreshed[0].id, "N");
}

#[actix_rt::test]
async fn test_upload_then_send_with_attachment() {
    let backend = Arc::new(FakeBackend::default());
    let (service, _) = chat_service(backend.clone(), FakeAuthorizer::default());

    let mut file = tempfile::Builder::new().suffix(".jpg").tempfile().unwrap();
    file.write_all(b"\xFF\xD8\xFF fake jpeg").unwrap();

    let url = service.upload_attachment(file.path()).await.unwrap();
    let sent = service
        .send_message("A", SendMessage::text("").with_attachments(vec![url.clone()]))
        .await
        .unwrap();

    assert_eq!(sent.attachments, vec![url]);
    assert_eq!(backend.uploads.lock().unwrap().len(), 1);
}

#[actix_rt::test]
async fn test_disconnect_keeps_loaded_messages() {
    let backend = Arc::new(FakeBackend::default());
    backend
        .messages
        .lock()
        .unwrap()
        .insert("A".into(), vec![message("m1", "A", SenderRole::Merchant, 1)]);
    let (service, _) = connected_service(backend).await;
    subscribed(&service, "A").await;
    assert!(service.is_connected());

    service.disconnect().await;

    assert!(!service.is_connected());
    assert!(!*service.connection_status().borrow());
    assert_eq!(ids(&service.get_messages("A").await.unwrap()), vec!["m1"]);
}
