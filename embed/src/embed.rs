use serde::{Deserialize, Serialize};

use crate::error::EmbedError;

/// A feature vector derived from one photograph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Embedding {
    /// Dense float32 vector. Expected to be unit-norm but not guaranteed.
    #[serde(rename = "embedding")]
    pub vector: Vec<f32>,

    /// Identifier of the model that produced the vector.
    #[serde(rename = "model_version")]
    pub model_version: String,
}

/// Embedder converts image bytes into dense float32 vectors.
///
/// Implementations must be safe for concurrent use (Send + Sync); callers
/// issue one call per photo and the calls may run in parallel.
#[async_trait::async_trait]
pub trait Embedder: Send + Sync {
    /// Return the embedding for a single image.
    async fn embed(&self, image: &[u8]) -> Result<Embedding, EmbedError>;

    /// Return the dimensionality of the output vectors.
    fn dimension(&self) -> usize;
}
