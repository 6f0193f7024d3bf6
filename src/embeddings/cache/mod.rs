
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::debug;

use super::TextEmbedder;
use crate::Result;

/// Memoizing wrapper around an embedding backend. Vectors are cached by
/// input text for the lifetime of the process; the backend instance pins
/// the model identifier, so text alone is a sufficient key. The cache is
/// unbounded, which is acceptable for interactive query volumes.
pub struct CachedEmbedder<E: TextEmbedder> {
    backend: E,
    cache: Mutex<HashMap<String, Vec<f32>>>,
}

impl<E: TextEmbedder> CachedEmbedder<E> {
    #[inline]
    pub fn new(backend: E) -> Self {
        Self {
            backend,
            cache: Mutex::new(HashMap::new()),
        }
    }

    #[inline]
    pub fn cached_count(&self) -> usize {
        self.cache.lock().expect("embedding cache lock poisoned").len()
    }

    /// Drop all memoized vectors.
    #[inline]
    pub fn invalidate(&self) {
        self.cache
            .lock()
            .expect("embedding cache lock poisoned")
            .clear();
    }
}

impl<E: TextEmbedder> TextEmbedder for CachedEmbedder<E> {
    #[inline]
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut misses: Vec<String> = Vec::new();
        {
            let cache = self.cache.lock().expect("embedding cache lock poisoned");
            for text in texts {
                if !cache.contains_key(text) && !misses.contains(text) {
                    misses.push(text.clone());
                }
            }
        }

        if !misses.is_empty() {
            debug!(
                "Embedding cache: {} hits, {} misses",
                texts.len() - misses.len(),
                misses.len()
            );
            let fresh = self.backend.embed_batch(&misses)?;
            let mut cache = self.cache.lock().expect("embedding cache lock poisoned");
            for (text, vector) in misses.into_iter().zip(fresh) {
                cache.insert(text, vector);
            }
        }

        let cache = self.cache.lock().expect("embedding cache lock poisoned");
        texts
            .iter()
            .map(|text| {
                cache.get(text).cloned().ok_or_else(|| {
                    crate::AdvisorError::Embedding(format!(
                        "Backend returned no vector for input of length {}",
                        text.len()
                    ))
                })
            })
            .collect()
    }

    #[inline]
    fn model_id(&self) -> &str {
        self.backend.model_id()
    }

    #[inline]
    fn dimension(&self) -> usize {
        self.backend.dimension()
    }
}
