
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use super::{TextEmbedder, l2_normalize};
use crate::config::EmbeddingConfig;
use crate::{AdvisorError, Result};

const DEFAULT_TIMEOUT_SECONDS: u64 = 30;
const DEFAULT_RETRY_ATTEMPTS: u32 = 3;
const EXPONENTIAL_BACKOFF_BASE: u64 = 2;

/// HTTP client for an Ollama-style embedding server. Constructed once
/// per process per model and shared read-only afterwards; the server
/// holds the actual model weights.
#[derive(Debug, Clone)]
pub struct EmbeddingClient {
    base_url: Url,
    model: String,
    batch_size: usize,
    dimension: usize,
    agent: ureq::Agent,
    retry_attempts: u32,
}

#[derive(Debug, Serialize)]
struct EmbedRequest {
    model: String,
    input: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

impl EmbeddingClient {
    #[inline]
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let base_url = config
            .server_url()
            .map_err(|e| AdvisorError::Config(e.to_string()))?;

        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(DEFAULT_TIMEOUT_SECONDS)))
            .build()
            .into();

        Ok(Self {
            base_url,
            model: config.model.clone(),
            batch_size: config.batch_size as usize,
            dimension: config.dimension as usize,
            agent,
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
        })
    }

    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();
        self
    }

    #[inline]
    pub fn with_retry_attempts(mut self, attempts: u32) -> Self {
        self.retry_attempts = attempts;
        self
    }

    fn embed_server_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let request = EmbedRequest {
            model: self.model.clone(),
            input: texts.to_vec(),
        };

        let url = self
            .base_url
            .join("/api/embed")
            .map_err(|e| AdvisorError::Embedding(format!("Failed to build embed URL: {}", e)))?;

        let request_json = serde_json::to_string(&request).map_err(|e| {
            AdvisorError::Embedding(format!("Failed to serialize embed request: {}", e))
        })?;

        let response_text = self.make_request_with_retry(|| {
            self.agent
                .post(url.as_str())
                .header("Content-Type", "application/json")
                .send(&request_json)
                .and_then(|mut resp| resp.body_mut().read_to_string())
        })?;

        let response: EmbedResponse = serde_json::from_str(&response_text).map_err(|e| {
            AdvisorError::Embedding(format!("Failed to parse embed response: {}", e))
        })?;

        if response.embeddings.len() != texts.len() {
            return Err(AdvisorError::Embedding(format!(
                "Mismatch between request and response counts: {} vs {}",
                texts.len(),
                response.embeddings.len()
            )));
        }

        let mut vectors = response.embeddings;
        for vector in &mut vectors {
            if vector.len() != self.dimension {
                return Err(AdvisorError::Embedding(format!(
                    "Server returned a {}-dimensional vector, expected {}",
                    vector.len(),
                    self.dimension
                )));
            }
            // Unit norm makes cosine similarity a plain dot product,
            // matching the index's distance metric.
            l2_normalize(vector);
        }

        Ok(vectors)
    }

    fn make_request_with_retry<F>(&self, mut request_fn: F) -> Result<String>
    where
        F: FnMut() -> std::result::Result<String, ureq::Error>,
    {
        let mut last_error = None;

        for attempt in 1..=self.retry_attempts {
            debug!("HTTP request attempt {}/{}", attempt, self.retry_attempts);

            match request_fn() {
                Ok(response_text) => return Ok(response_text),
                Err(error) => {
                    let should_retry = match &error {
                        ureq::Error::StatusCode(status) => {
                            if *status >= 500 {
                                warn!(
                                    "Server error (status {}), attempt {}/{}",
                                    status, attempt, self.retry_attempts
                                );
                                true
                            } else {
                                return Err(AdvisorError::Network(format!(
                                    "Client error: HTTP {}",
                                    status
                                )));
                            }
                        }
                        ureq::Error::ConnectionFailed
                        | ureq::Error::HostNotFound
                        | ureq::Error::Timeout(_)
                        | ureq::Error::Io(_) => {
                            warn!(
                                "Transport error: {}, attempt {}/{}",
                                error, attempt, self.retry_attempts
                            );
                            true
                        }
                        _ => {
                            return Err(AdvisorError::Network(format!(
                                "Non-retryable error: {}",
                                error
                            )));
                        }
                    };

                    if should_retry {
                        last_error = Some(AdvisorError::Network(format!(
                            "Request error: {}",
                            error
                        )));
                    }

                    if attempt < self.retry_attempts {
                        let delay_ms = EXPONENTIAL_BACKOFF_BASE.pow(attempt - 1) * 1000;
                        std::thread::sleep(Duration::from_millis(delay_ms));
                    }
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| AdvisorError::Network("Request failed after retries".to_string())))
    }
}

impl TextEmbedder for EmbeddingClient {
    /// Embed a batch of texts. Batching against the server is bounded by
    /// the configured batch size; this is purely a memory/throughput
    /// concern and never changes output values. Empty texts short-circuit
    /// to a zero vector without touching the server.
    #[inline]
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Generating embeddings for {} texts", texts.len());

        let mut vectors: Vec<Option<Vec<f32>>> = vec![None; texts.len()];
        let mut pending: Vec<(usize, String)> = Vec::new();

        for (position, text) in texts.iter().enumerate() {
            if text.trim().is_empty() {
                vectors[position] = Some(vec![0.0; self.dimension]);
            } else {
                pending.push((position, text.clone()));
            }
        }

        for chunk in pending.chunks(self.batch_size) {
            let chunk_texts: Vec<String> = chunk.iter().map(|(_, text)| text.clone()).collect();
            let chunk_vectors = self.embed_server_batch(&chunk_texts)?;
            for ((position, _), vector) in chunk.iter().zip(chunk_vectors) {
                vectors[*position] = Some(vector);
            }
        }

        Ok(vectors.into_iter().flatten().collect())
    }

    #[inline]
    fn model_id(&self) -> &str {
        &self.model
    }

    #[inline]
    fn dimension(&self) -> usize {
        self.dimension
    }
}
