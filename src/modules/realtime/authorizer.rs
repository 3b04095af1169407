use serde::Deserialize;

use crate::api::error::SubscriptionError;

#[derive(Debug, Deserialize)]
struct AuthResponse {
    auth: String,
}

/// Signs private channel subscriptions for the current socket.
#[async_trait::async_trait]
pub trait ChannelAuthorizer: Send + Sync + 'static {
    async fn authorize(
        &self,
        socket_id: &str,
        channel_name: &str,
        access_token: &str,
    ) -> Result<String, SubscriptionError>;
}

/// `GET {endpoint}?socket_id=..&channel_name=..` with the bearer token.
pub struct HttpChannelAuthorizer {
    http: reqwest::Client,
    endpoint: String,
}

impl HttpChannelAuthorizer {
    pub fn new(http: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self { http, endpoint: endpoint.into() }
    }
}

#[async_trait::async_trait]
impl ChannelAuthorizer for HttpChannelAuthorizer {
    async fn authorize(
        &self,
        socket_id: &str,
        channel_name: &str,
        access_token: &str,
    ) -> Result<String, SubscriptionError> {
        let response = self
            .http
            .get(&self.endpoint)
            .query(&[("socket_id", socket_id), ("channel_name", channel_name)])
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| SubscriptionError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SubscriptionError::from_status(status.as_u16()));
        }

        let body: AuthResponse =
            response.json().await.map_err(|e| SubscriptionError::Transport(e.to_string()))?;
        Ok(body.auth)
    }
}
