use crate::{
    api::error,
    configs::ApiClient,
    modules::message::{
        model::{MarkRead, SendMessage},
        repository::MessageRepository,
        schema::MessageEntity,
    },
};

#[derive(Clone)]
pub struct MessageRepositoryHttp {
    client: ApiClient,
}

impl MessageRepositoryHttp {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl MessageRepository for MessageRepositoryHttp {
    async fn find_by_conversation(
        &self,
        conversation_id: &str,
    ) -> Result<Vec<MessageEntity>, error::SystemError> {
        self.client.get_list(&format!("/chat/conversations/{conversation_id}/messages")).await
    }

    async fn create(
        &self,
        conversation_id: &str,
        message: &SendMessage,
    ) -> Result<MessageEntity, error::SystemError> {
        self.client.post_item(&format!("/chat/conversations/{conversation_id}/messages"), message).await
    }

    async fn mark_read(
        &self,
        conversation_id: &str,
        receipt: &MarkRead,
    ) -> Result<(), error::SystemError> {
        self.client.post_no_content(&format!("/chat/conversations/{conversation_id}/read"), receipt).await
    }
}
