//! Embedding capability: text to fixed-dimension vectors
//!
//! The pipeline treats embedding as an external, opaque capability behind
//! the `Embedder` trait. Implementations are swapped by dependency
//! substitution (`Arc<dyn Embedder>`), never by conditional branches:
//! - `OllamaEmbedder`: production backend over a local Ollama server
//! - `MockEmbedder`: deterministic hash-seeded vectors for tests and demos

pub mod mock;
pub mod ollama;

use async_trait::async_trait;

use crate::errors::Result;

pub use mock::MockEmbedder;
pub use ollama::OllamaEmbedder;

/// Maps text to a fixed-dimension numeric vector
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed multiple texts; the default delegates to `embed` per text
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.embed(text).await?);
        }
        Ok(vectors)
    }

    /// Output dimensionality, fixed per instance
    fn dimension(&self) -> usize;
}
