use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SenderRole {
    Buyer,
    Merchant,
}

impl SenderRole {
    /// The role whose messages count as incoming for a viewer of this role.
    pub fn opposite(self) -> Self {
        match self {
            SenderRole::Buyer => SenderRole::Merchant,
            SenderRole::Merchant => SenderRole::Buyer,
        }
    }
}

impl std::str::FromStr for SenderRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "BUYER" => Ok(SenderRole::Buyer),
            "MERCHANT" => Ok(SenderRole::Merchant),
            other => Err(format!("unknown sender role '{other}'")),
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MessageType {
    #[default]
    Text,
    Signal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageEntity {
    pub id: String,
    pub conversation_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_merchant_id: Option<String>,
    pub sender_role: SenderRole,
    #[serde(rename = "type", default)]
    pub _type: MessageType,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub attachments: Vec<String>,
    #[serde(default)]
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl MessageEntity {
    pub fn is_read(&self) -> bool {
        self.read_at.is_some()
    }

    /// Participant id of whoever sent the message.
    pub fn sender_id(&self) -> Option<&str> {
        match self.sender_role {
            SenderRole::Buyer => self.sender_user_id.as_deref(),
            SenderRole::Merchant => self.sender_merchant_id.as_deref(),
        }
    }
}
