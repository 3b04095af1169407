use reqwest::{multipart, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Serialize};
use std::{sync::Arc, time::Duration};
use tokio::sync::RwLock;

use crate::api::{
    error::{self, ErrorBody},
    success::{ItemResponse, ListResponse},
};
use crate::constants::{CLIENT_NAME, CLIENT_VERSION, PUSHER_PROTOCOL_VERSION};

/// Pub/sub connection settings. Without a key realtime is disabled.
#[derive(Debug, Clone)]
pub struct PusherConfig {
    pub key: Option<String>,
    pub cluster: String,
    pub host: Option<String>,
    pub auth_endpoint: String,
}

impl PusherConfig {
    pub fn socket_url(&self) -> Option<String> {
        let key = self.key.as_deref()?;
        let host = self.host.clone().unwrap_or_else(|| format!("ws-{}.pusher.com", self.cluster));
        let base = if host.starts_with("ws://") || host.starts_with("wss://") {
            host.trim_end_matches('/').to_string()
        } else {
            format!("wss://{}", host.trim_end_matches('/'))
        };

        Some(format!(
            "{base}/app/{key}?protocol={PUSHER_PROTOCOL_VERSION}&client={CLIENT_NAME}&version={CLIENT_VERSION}"
        ))
    }
}

pub fn build_http_client(timeout: Duration) -> Result<reqwest::Client, error::SystemError> {
    let client = reqwest::Client::builder()
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()?;
    Ok(client)
}

/// Authenticated client for the chat REST backend. Cheap to clone; clones
/// share the access token.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    access_token: Arc<RwLock<Option<String>>>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, error::SystemError> {
        Ok(Self::with_client(build_http_client(timeout)?, base_url))
    }

    pub fn with_client(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { http, base_url, access_token: Arc::new(RwLock::new(None)) }
    }

    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub async fn set_access_token(&self, token: Option<String>) {
        *self.access_token.write().await = token;
    }

    async fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        match self.access_token.read().await.as_deref() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    pub async fn get_list<T>(&self, path: &str) -> Result<Vec<T>, error::SystemError>
    where
        T: DeserializeOwned,
    {
        let request = self.authorized(self.http.get(self.url(path))).await;
        let body: ListResponse<T> = Self::decode(request.send().await?).await?;
        Ok(body.into_items())
    }

    pub async fn post_item<B, T>(&self, path: &str, body: &B) -> Result<T, error::SystemError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self.authorized(self.http.post(self.url(path)).json(body)).await;
        let body: ItemResponse<T> = Self::decode(request.send().await?).await?;
        Ok(body.into_inner())
    }

    pub async fn post_no_content<B>(&self, path: &str, body: &B) -> Result<(), error::SystemError>
    where
        B: Serialize + ?Sized,
    {
        let request = self.authorized(self.http.post(self.url(path)).json(body)).await;
        let response = request.send().await?;
        Self::ensure_success(response).await?;
        Ok(())
    }

    pub async fn post_multipart<T>(
        &self,
        path: &str,
        form: multipart::Form,
    ) -> Result<T, error::SystemError>
    where
        T: DeserializeOwned,
    {
        let request = self.authorized(self.http.post(self.url(path)).multipart(form)).await;
        let body: ItemResponse<T> = Self::decode(request.send().await?).await?;
        Ok(body.into_inner())
    }

    async fn decode<T>(response: Response) -> Result<T, error::SystemError>
    where
        T: DeserializeOwned,
    {
        let response = Self::ensure_success(response).await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn ensure_success(response: Response) -> Result<Response, error::SystemError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let raw = response.text().await.unwrap_or_default();
        let message = match serde_json::from_str::<ErrorBody>(&raw) {
            Ok(body) => body.message,
            Err(_) => status.canonical_reason().unwrap_or("Request failed").into(),
        };
        Err(error::SystemError::status(status, message))
    }
}
