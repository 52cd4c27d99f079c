use async_trait::async_trait;

/// Failure talking to the asset host. Separate from storage errors so an
/// upload problem is reported as exactly that.
#[derive(Debug, Clone, thiserror::Error)]
#[error("Image upload failed: {0}")]
pub struct UploadError(pub String);

/// External asset host: takes raw image bytes, returns the public URL that
/// gets stored on the event.
#[async_trait]
pub trait ImageUploader: Send + Sync {
    async fn upload(&self, bytes: Vec<u8>) -> Result<String, UploadError>;
}
