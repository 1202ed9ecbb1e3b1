use async_trait::async_trait;

use crate::error::ScanError;
use crate::types::ImageBuffer;

/// A remote service that labels a banknote image with free text.
///
/// Implementations make exactly one attempt per call; failures surface as
/// [`ScanError::ClassificationService`].
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Provider name (e.g., "gemini", "openai").
    fn name(&self) -> &str;

    /// Send the image with the fixed instruction and return the raw reply.
    async fn classify(&self, image: &ImageBuffer) -> Result<String, ScanError>;
}
