use std::sync::{Arc, LazyLock};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use marketplace_chat::{
    configs::{ApiClient, PusherConfig},
    constants,
    modules::{
        chat::service::{ChatService, HttpChatService},
        conversation::repository_http::ConversationRepositoryHttp,
        file_upload::{AttachmentRepositoryHttp, AttachmentService, UploadConfig},
        message::repository_http::MessageRepositoryHttp,
        realtime::bridge::TransportBridge,
    },
    utils::Credentials,
};

static ENV: LazyLock<constants::Env> = LazyLock::new(|| {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    tracing::info!("Environment variables loaded from .env file");
    constants::Env::default()
});

#[actix_rt::main]
async fn main() -> std::io::Result<()> {
    let api = ApiClient::new(ENV.api_base_url.as_str(), Duration::from_secs(ENV.http_timeout_secs))
        .map_err(|e| std::io::Error::other(format!("HTTP client error: {e}")))?;
    api.set_access_token(ENV.access_token.clone()).await;

    let pusher = PusherConfig {
        key: ENV.pusher_key.clone(),
        cluster: ENV.pusher_cluster.clone(),
        host: ENV.pusher_host.clone(),
        auth_endpoint: ENV.pusher_auth_endpoint.clone(),
    };
    let upload_config =
        UploadConfig { max_file_size: ENV.max_attachment_size, ..UploadConfig::default() };
    let http = api.http().clone();

    let service: HttpChatService = ChatService::start(
        ENV.viewer_role,
        Arc::new(ConversationRepositoryHttp::new(api.clone())),
        Arc::new(MessageRepositoryHttp::new(api.clone())),
        AttachmentService::new(Arc::new(AttachmentRepositoryHttp::new(api.clone())), upload_config),
        move |store| TransportBridge::with_websocket(pusher, store, http),
    );
    let _refresh = service.spawn_conversation_refresh();
    tracing::info!("Chat client started as {:?}", service.viewer());

    match Credentials::from_parts(ENV.user_id.clone(), ENV.access_token.clone()) {
        Some(credentials) => service.connect(credentials).await,
        None => tracing::warn!("CHAT_USER_ID or ACCESS_TOKEN missing, realtime disabled"),
    }

    match service.load_conversations().await {
        Ok(conversations) => tracing::info!("Loaded {} conversations", conversations.len()),
        Err(e) => tracing::error!("{}", e),
    }

    if let Some(conversation_id) = ENV.conversation_id.clone() {
        match service.select_conversation(Some(conversation_id.clone())).await {
            Ok(()) => {
                let messages = service.get_messages(&conversation_id).await.unwrap_or_default();
                tracing::info!("Opened conversation {} ({} messages)", conversation_id, messages.len());
            }
            Err(e) => tracing::error!("Could not open conversation {}: {}", conversation_id, e),
        }
    }

    let mut unread = service.unread_receiver();
    let mut connected = service.connection_status();
    tracing::info!("Unread messages: {}", *unread.borrow_and_update());

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,

            changed = unread.changed() => {
                if changed.is_err() {
                    break;
                }
                tracing::info!("Unread messages: {}", *unread.borrow_and_update());
            }

            changed = connected.changed() => {
                if changed.is_err() {
                    break;
                }
                tracing::info!("Realtime connected: {}", *connected.borrow_and_update());
            }
        }
    }

    tracing::info!("Shutting down");
    if let Some(conversation_id) = ENV.conversation_id.as_deref() {
        service.unsubscribe_conversation(conversation_id);
    }
    service.disconnect().await;
    Ok(())
}
