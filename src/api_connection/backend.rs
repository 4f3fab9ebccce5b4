use async_trait::async_trait;

use super::connection::ApiConnectionError;
use crate::streaming::BackendResponse;

/// A text-in, text-out generative model.
#[async_trait]
pub trait GenerativeBackend: Send + Sync {
    /// Returns the complete generated text for `prompt`.
    async fn complete(&self, prompt: &str) -> Result<String, ApiConnectionError>;

    /// Starts an incremental generation.
    ///
    /// Backends without streaming support get the buffered capability.
    async fn open_stream(&self, prompt: &str) -> Result<BackendResponse, ApiConnectionError> {
        Ok(BackendResponse::Buffered(self.complete(prompt).await?))
    }
}
