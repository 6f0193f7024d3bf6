// Query embedding: HTTP client for the embedding server plus a
// process-lifetime memoization layer.

pub mod cache;
pub mod client;

pub use cache::CachedEmbedder;
pub use client::EmbeddingClient;

use crate::Result;

/// Black-box text embedding capability. Implementations must be
/// deterministic for a fixed model identifier: the same text always
/// yields the same vector, which is what makes caching sound.
pub trait TextEmbedder {
    /// Embed a batch of texts, preserving input order.
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    fn model_id(&self) -> &str;

    fn dimension(&self) -> usize;

    /// Embed a single text. Equivalent to a one-element batch.
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let texts = [text.to_string()];
        let mut vectors = self.embed_batch(&texts)?;
        vectors.pop().ok_or_else(|| {
            crate::AdvisorError::Embedding("Backend returned no vector for input".to_string())
        })
    }
}

/// Scale a vector to unit L2 norm in place. A zero vector is left
/// untouched rather than dividing by zero.
#[inline]
pub fn l2_normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in vector.iter_mut() {
            *x /= norm;
        }
    }
}
