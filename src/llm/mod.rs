//! Chat-completion API client with a one-hour response cache.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::config::Config;
use crate::errors::AppError;

/// Default model for every generation flow.
pub const DEFAULT_MODEL: &str = "grok-3";

/// System message sent ahead of every prompt.
const SYSTEM_PROMPT: &str = "You are a helpful AI assistant created by xAI.";

/// Fixed request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Lifetime of a cached response.
pub const CACHE_TTL: Duration = Duration::from_secs(60 * 60);

/// Generation parameters sent with a prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionOptions {
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
}

impl CompletionOptions {
    /// Options for the default model.
    pub fn new(temperature: f64, max_tokens: u32) -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature,
            max_tokens,
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
    temperature: f64,
    max_tokens: u32,
}

/// A parsed chat-completion response.
#[derive(Debug, Clone)]
pub struct ChatResult {
    body: Value,
    content: String,
}

impl ChatResult {
    fn from_body(body: Value) -> Option<Self> {
        let content = body
            .pointer("/choices/0/message/content")?
            .as_str()?
            .to_string();
        Some(Self { body, content })
    }

    /// Text of the first choice.
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Full response body as returned by the API.
    pub fn body(&self) -> &Value {
        &self.body
    }
}

struct CacheEntry {
    body: Value,
    stored_at: Instant,
}

/// Client for the chat-completion endpoint.
pub struct LlmClient {
    http: reqwest::Client,
    api_url: String,
    api_key: String,
    ttl: Duration,
    cache: Mutex<HashMap<String, CacheEntry>>,
}

impl LlmClient {
    pub fn new(api_url: &str, api_key: &str) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            api_url: api_url.to_string(),
            api_key: api_key.to_string(),
            ttl: CACHE_TTL,
            cache: Mutex::new(HashMap::new()),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        Self::new(&config.api_url, &config.api_key)
    }

    /// Override the cache lifetime.
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Send `prompt` and return the first choice, from cache when an
    /// identical request succeeded within the TTL.
    pub async fn complete(
        &self,
        prompt: &str,
        options: &CompletionOptions,
    ) -> Result<ChatResult, AppError> {
        let key = cache_key(prompt, options);

        if let Some(body) = self.cached(&key) {
            tracing::debug!("Completion cache hit for {}", &key[..12]);
            if let Some(result) = ChatResult::from_body(body) {
                return Ok(result);
            }
        }

        let request = ChatRequest {
            model: &options.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            stream: false,
            temperature: options.temperature,
            max_tokens: options.max_tokens,
        };

        tracing::info!(
            "Requesting completion ({}, max_tokens={})",
            options.model,
            options.max_tokens
        );

        let response = self
            .http
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        let body: Value = serde_json::from_str(&text).map_err(|e| {
            tracing::error!("Completion response is not JSON ({}): {}", status, e);
            AppError::InvalidResponse(format!("Invalid API response (HTTP {})", status.as_u16()))
        })?;

        let Some(result) = ChatResult::from_body(body) else {
            tracing::error!("Completion response without content ({})", status);
            return Err(AppError::InvalidResponse(format!(
                "Invalid API response (HTTP {})",
                status.as_u16()
            )));
        };

        self.store(key, result.body().clone());
        Ok(result)
    }

    fn cached(&self, key: &str) -> Option<Value> {
        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        match cache.get(key) {
            Some(entry) if entry.stored_at.elapsed() < self.ttl => Some(entry.body.clone()),
            Some(_) => {
                cache.remove(key);
                None
            }
            None => None,
        }
    }

    fn store(&self, key: String, body: Value) {
        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        let ttl = self.ttl;
        cache.retain(|_, entry| entry.stored_at.elapsed() < ttl);
        cache.insert(
            key,
            CacheEntry {
                body,
                stored_at: Instant::now(),
            },
        );
    }
}

/// SHA-256 of the prompt and the options, with option keys serialized in
/// sorted order.
fn cache_key(prompt: &str, options: &CompletionOptions) -> String {
    let options = serde_json::to_value(options).unwrap_or(Value::Null);
    let material = serde_json::to_string(&(prompt, options)).unwrap_or_default();

    let mut hasher = Sha256::new();
    hasher.update(material.as_bytes());
    format!("{:x}", hasher.finalize())
}
