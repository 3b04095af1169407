use crate::modules::message::schema::SenderRole;

pub const DEFAULT_PUSHER_CLUSTER: &str = "mt1";
pub const DEFAULT_ACTIVITY_TIMEOUT_SECS: u64 = 120;
pub const PUSHER_PROTOCOL_VERSION: u8 = 7;
pub const CLIENT_NAME: &str = env!("CARGO_PKG_NAME");
pub const CLIENT_VERSION: &str = env!("CARGO_PKG_VERSION");

pub struct Env {
    pub api_base_url: String,
    pub pusher_key: Option<String>,
    pub pusher_cluster: String,
    pub pusher_host: Option<String>,
    pub pusher_auth_endpoint: String,
    pub access_token: Option<String>,
    pub user_id: Option<String>,
    pub viewer_role: SenderRole,
    pub conversation_id: Option<String>,
    pub http_timeout_secs: u64,
    pub max_attachment_size: usize,
}

fn optional(key: &str) -> Option<String> {
    std::env::var(key).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl Env {
    fn new() -> Self {
        let api_base_url = optional("API_BASE_URL")
            .unwrap_or_else(|| "http://localhost:5000/api".to_string())
            .trim_end_matches('/')
            .to_string();

        let pusher_key = optional("PUSHER_KEY");
        let pusher_cluster =
            optional("PUSHER_CLUSTER").unwrap_or_else(|| DEFAULT_PUSHER_CLUSTER.to_string());
        let pusher_host = optional("PUSHER_HOST");
        let pusher_auth_endpoint = optional("PUSHER_AUTH_ENDPOINT")
            .unwrap_or_else(|| format!("{api_base_url}/chat/pusher-auth"));

        let access_token = optional("ACCESS_TOKEN");
        let user_id = optional("CHAT_USER_ID");
        let viewer_role = optional("CHAT_ROLE")
            .map(|r| r.parse::<SenderRole>().expect("CHAT_ROLE must be BUYER or MERCHANT"))
            .unwrap_or(SenderRole::Buyer);
        let conversation_id = optional("CHAT_CONVERSATION_ID");

        let http_timeout_secs = std::env::var("HTTP_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".to_string())
            .parse::<u64>()
            .expect("HTTP_TIMEOUT_SECS must be a valid u64 integer");
        let max_attachment_size = std::env::var("MAX_ATTACHMENT_SIZE")
            .unwrap_or_else(|_| (10 * 1024 * 1024).to_string())
            .parse::<usize>()
            .expect("MAX_ATTACHMENT_SIZE must be a valid usize integer");

        Env {
            api_base_url,
            pusher_key,
            pusher_cluster,
            pusher_host,
            pusher_auth_endpoint,
            access_token,
            user_id,
            viewer_role,
            conversation_id,
            http_timeout_secs,
            max_attachment_size,
        }
    }
}

impl Default for Env {
    fn default() -> Self {
        Self::new()
    }
}
