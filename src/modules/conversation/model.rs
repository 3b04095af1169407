use serde::Serialize;
use validator::Validate;

/// Body of `POST /chat/conversations`.
#[derive(Debug, Clone, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewConversation {
    #[validate(length(min = 1, message = "Participant ID cannot be empty"))]
    pub participant_id: String,
}
