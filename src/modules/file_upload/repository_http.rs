use reqwest::multipart::{Form, Part};

use crate::{
    api::error,
    configs::ApiClient,
    modules::file_upload::{
        model::NewAttachment, repository::AttachmentRepository, schema::UploadedAttachment,
    },
};

#[derive(Clone)]
pub struct AttachmentRepositoryHttp {
    client: ApiClient,
}

impl AttachmentRepositoryHttp {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl AttachmentRepository for AttachmentRepositoryHttp {
    async fn upload(
        &self,
        attachment: NewAttachment,
    ) -> Result<UploadedAttachment, error::SystemError> {
        let part = Part::bytes(attachment.bytes)
            .file_name(attachment.filename)
            .mime_str(&attachment.mime_type)?;
        let form = Form::new().part("file", part);

        self.client.post_multipart("/chat/attachments", form).await
    }
}
