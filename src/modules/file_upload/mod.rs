pub mod model;
pub mod repository;
pub mod repository_http;
pub mod schema;
pub mod service;

pub use model::{NewAttachment, UploadConfig};
pub use repository::AttachmentRepository;
pub use repository_http::AttachmentRepositoryHttp;
pub use schema::UploadedAttachment;
pub use service::AttachmentService;
