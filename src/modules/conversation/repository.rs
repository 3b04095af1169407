use crate::{
    api::error,
    modules::conversation::{model::NewConversation, schema::ConversationEntity},
};

#[async_trait::async_trait]
pub trait ConversationRepository {
    async fn find_all(&self) -> Result<Vec<ConversationEntity>, error::SystemError>;

    async fn create(
        &self,
        conversation: &NewConversation,
    ) -> Result<ConversationEntity, error::SystemError>;
}
