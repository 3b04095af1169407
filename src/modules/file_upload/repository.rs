use crate::{
    api::error,
    modules::file_upload::{model::NewAttachment, schema::UploadedAttachment},
};

#[async_trait::async_trait]
pub trait AttachmentRepository {
    async fn upload(
        &self,
        attachment: NewAttachment,
    ) -> Result<UploadedAttachment, error::SystemError>;
}
