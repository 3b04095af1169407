use crate::{
    api::error,
    configs::ApiClient,
    modules::conversation::{
        model::NewConversation, repository::ConversationRepository, schema::ConversationEntity,
    },
};

#[derive(Clone)]
pub struct ConversationRepositoryHttp {
    client: ApiClient,
}

impl ConversationRepositoryHttp {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl ConversationRepository for ConversationRepositoryHttp {
    async fn find_all(&self) -> Result<Vec<ConversationEntity>, error::SystemError> {
        self.client.get_list("/chat/conversations").await
    }

    async fn create(
        &self,
        conversation: &NewConversation,
    ) -> Result<ConversationEntity, error::SystemError> {
        self.client.post_item("/chat/conversations", conversation).await
    }
}
