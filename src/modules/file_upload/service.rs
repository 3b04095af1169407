use std::path::Path;
use std::sync::Arc;

use crate::api::error;
use crate::modules::file_upload::{
    model::{NewAttachment, UploadConfig},
    repository::AttachmentRepository,
    schema::UploadedAttachment,
};

pub struct AttachmentService<R>
where
    R: AttachmentRepository + Send + Sync,
{
    attachment_repo: Arc<R>,
    config: UploadConfig,
}

impl<R> Clone for AttachmentService<R>
where
    R: AttachmentRepository + Send + Sync,
{
    fn clone(&self) -> Self {
        Self { attachment_repo: self.attachment_repo.clone(), config: self.config.clone() }
    }
}

impl<R> AttachmentService<R>
where
    R: AttachmentRepository + Send + Sync,
{
    pub fn new(attachment_repo: Arc<R>, config: UploadConfig) -> Self {
        Self { attachment_repo, config }
    }

    pub fn with_defaults(attachment_repo: Arc<R>) -> Self {
        Self::new(attachment_repo, UploadConfig::default())
    }

    /// Validate file type and size
    fn validate_file(&self, file_size: usize, mime_type: &str) -> Result<(), error::SystemError> {
        if file_size == 0 {
            return Err(error::SystemError::bad_request("File is empty"));
        }

        if file_size > self.config.max_file_size {
            return Err(error::SystemError::bad_request(format!(
                "File size exceeds maximum allowed size of {} bytes",
                self.config.max_file_size
            )));
        }

        if !self.config.allowed_mime_types.iter().any(|m| m == mime_type) {
            return Err(error::SystemError::bad_request(format!(
                "File type '{}' is not allowed",
                mime_type
            )));
        }

        Ok(())
    }

    /// Upload in-memory bytes, returning the hosted URL
    pub async fn upload_bytes(
        &self,
        filename: String,
        bytes: Vec<u8>,
        mime_type: String,
    ) -> Result<UploadedAttachment, error::SystemError> {
        self.validate_file(bytes.len(), &mime_type)?;

        let uploaded =
            self.attachment_repo.upload(NewAttachment { filename, mime_type, bytes }).await?;

        tracing::debug!("Attachment uploaded to {}", uploaded.url);
        Ok(uploaded)
    }

    /// Read a local file, guess its MIME type from the extension and upload it
    pub async fn upload_file(&self, path: &Path) -> Result<UploadedAttachment, error::SystemError> {
        let filename = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| error::SystemError::bad_request("Invalid file name"))?
            .to_string();

        let mime_type = mime_guess::from_path(path).first_or_octet_stream().to_string();

        let metadata = tokio::fs::metadata(path).await?;
        self.validate_file(metadata.len() as usize, &mime_type)?;

        let bytes = tokio::fs::read(path).await?;
        self.upload_bytes(filename, bytes, mime_type).await
    }
}
