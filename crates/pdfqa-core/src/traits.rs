use std::path::Path;

use async_trait::async_trait;

use crate::error::CapabilityError;

/// Maps text to fixed-dimension vectors.
///
/// `id` must change whenever two instances would produce incomparable
/// vectors (different model, dimension or provider); indexes remember it.
#[async_trait]
pub trait Embedder: Send + Sync {
    fn id(&self) -> &str;
    fn dim(&self) -> usize;
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, CapabilityError>;

    async fn embed(&self, text: &str) -> Result<Vec<f32>, CapabilityError> {
        self.embed_batch(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| CapabilityError::InvalidResponse("empty embedding batch".to_string()))
    }
}

/// Produces a natural-language completion for a fully assembled prompt.
#[async_trait]
pub trait Generator: Send + Sync {
    fn id(&self) -> &str;
    async fn generate(&self, prompt: &str) -> Result<String, CapabilityError>;
}

/// Extracts the text of every page of one source file, in page order.
pub trait PageExtractor: Send + Sync {
    fn extract_pages(&self, path: &Path) -> anyhow::Result<Vec<String>>;
}
