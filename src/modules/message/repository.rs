use crate::{
    api::error,
    modules::message::{
        model::{MarkRead, SendMessage},
        schema::MessageEntity,
    },
};

#[async_trait::async_trait]
pub trait MessageRepository {
    async fn find_by_conversation(
        &self,
        conversation_id: &str,
    ) -> Result<Vec<MessageEntity>, error::SystemError>;

    async fn create(
        &self,
        conversation_id: &str,
        message: &SendMessage,
    ) -> Result<MessageEntity, error::SystemError>;

    async fn mark_read(
        &self,
        conversation_id: &str,
        receipt: &MarkRead,
    ) -> Result<(), error::SystemError>;
}
