
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use crate::config::LlmConfig;

const REQUEST_TIMEOUT_SECONDS: u64 = 30;

/// Sampling parameters for one generation call. Every field participates
/// in the answer cache key because every field changes the output.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationOptions {
    pub max_tokens: u32,
    pub model: String,
    pub temperature: f64,
    pub top_p: f64,
}

impl GenerationOptions {
    #[inline]
    pub fn from_config(config: &LlmConfig) -> Self {
        Self {
            max_tokens: config.max_tokens,
            model: config.model.clone(),
            temperature: config.temperature,
            top_p: config.top_p,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    query: String,
    context: String,
    max_tokens: u32,
    model: String,
    temperature_bits: u64,
    top_p_bits: u64,
}

impl CacheKey {
    fn new(query: &str, context: &str, options: &GenerationOptions) -> Self {
        Self {
            query: query.to_string(),
            context: context.to_string(),
            max_tokens: options.max_tokens,
            model: options.model.clone(),
            temperature_bits: options.temperature.to_bits(),
            top_p_bits: options.top_p.to_bits(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f64,
    top_p: f64,
}

/// Wrapper around the hosted chat-completion API. Never raises: every
/// degraded outcome (missing credential, empty context, transport
/// failure, malformed response) comes back as a readable message string
/// so the rest of the pipeline keeps working.
pub struct AnswerGenerator {
    endpoint: Url,
    api_key: Option<String>,
    api_key_var: String,
    agent: ureq::Agent,
    // Valid only because the default temperature is 0: identical
    // requests are then deterministic, so memoizing them is sound.
    cache: Mutex<HashMap<CacheKey, String>>,
}

impl AnswerGenerator {
    #[inline]
    pub fn new(config: &LlmConfig) -> Self {
        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(REQUEST_TIMEOUT_SECONDS)))
            .build()
            .into();

        Self {
            endpoint: config.endpoint.clone(),
            api_key: config.api_key(),
            api_key_var: config.api_key_var.clone(),
            agent,
            cache: Mutex::new(HashMap::new()),
        }
    }

    #[inline]
    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key;
        self
    }

    #[inline]
    pub fn with_endpoint(mut self, endpoint: Url) -> Self {
        self.endpoint = endpoint;
        self
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
    pub fn cached_count(&self) -> usize {
        self.cache.lock().expect("answer cache lock poisoned").len()
    }

    /// Answer a question from the supplied context.
    ///
    /// Preconditions are checked in order: a missing credential and a
    /// blank context both short-circuit before any network traffic. One
    /// bounded request is made per distinct (query, context, options)
    /// tuple; successful answers are cached for the process lifetime.
    #[inline]
    pub fn generate_answer(
        &self,
        query: &str,
        context: &str,
        options: &GenerationOptions,
    ) -> String {
        let Some(api_key) = self.api_key.as_deref() else {
            return format!(
                "❌ API key missing! Set {} in your environment.",
                self.api_key_var
            );
        };

        if context.trim().is_empty() {
            return "⚠️ No context available to answer the question.".to_string();
        }

        let key = CacheKey::new(query, context, options);
        {
            let cache = self.cache.lock().expect("answer cache lock poisoned");
            if let Some(answer) = cache.get(&key) {
                debug!("Answer cache hit");
                return answer.clone();
            }
        }

        let request = ChatRequest {
            model: options.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: "You are a helpful assistant. Answer ONLY using the provided context."
                        .to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: format!("Context:\n{}\n\nQuestion:\n{}\n\nAnswer:", context, query),
                },
            ],
            max_tokens: options.max_tokens,
            temperature: options.temperature,
            top_p: options.top_p,
        };

        let request_json = match serde_json::to_string(&request) {
            Ok(json) => json,
            Err(e) => return format!("❌ Request failed: {}", e),
        };

        debug!("Requesting answer from {}", self.endpoint);

        let response_text = match self
            .agent
            .post(self.endpoint.as_str())
            .header("Authorization", &format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .send(&request_json)
            .and_then(|mut resp| resp.body_mut().read_to_string())
        {
            Ok(text) => text,
            Err(ureq::Error::Timeout(_)) => {
                warn!("Answer request timed out");
                return "⏰ Request timed out. Try again!".to_string();
            }
            Err(ureq::Error::StatusCode(status)) => {
                warn!("Answer request failed with HTTP {}", status);
                return format!("❌ Request failed: HTTP {}", status);
            }
            Err(e) => {
                warn!("Answer request failed: {}", e);
                return format!("❌ Request failed: {}", e);
            }
        };

        let answer = serde_json::from_str::<serde_json::Value>(&response_text)
            .ok()
            .and_then(|data| {
                data.pointer("/choices/0/message/content")
                    .and_then(|content| content.as_str())
                    .map(|content| content.trim().to_string())
            });

        match answer {
            Some(answer) => {
                self.cache
                    .lock()
                    .expect("answer cache lock poisoned")
                    .insert(key, answer.clone());
                answer
            }
            None => format!("⚠️ Unexpected API response: {}", response_text),
        }
    }
}
