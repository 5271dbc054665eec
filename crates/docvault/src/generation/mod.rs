//! Text generation backends.
//!
//! The pipeline only knows the [`Generator`] trait. One backend is chosen at
//! startup by [`provider::build_generator`] and passed in explicitly.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::AiConfig;

pub mod anthropic;
pub mod openai;
pub mod provider;

pub use anthropic::AnthropicGenerator;
pub use openai::OpenAiGenerator;
pub use provider::build_generator;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    #[error("Generation request timed out: {0}")]
    Timeout(String),

    #[error("Rate limited by generation provider: {0}")]
    RateLimited(String),

    #[error("Invalid response from generation provider: {0}")]
    InvalidResponse(String),

    #[error("Generation provider configuration error: {0}")]
    ProviderConfig(String),

    #[error("Generation provider unavailable: {0}")]
    Unavailable(String),
}

/// Prompt-to-text capability.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Sends one prompt and returns the generated text. Implementations must
    /// enforce their own timeout and report it as [`GenerationError::Timeout`].
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;

    /// Backend name for logs.
    fn name(&self) -> &str;

    fn model(&self) -> &str;
}

/// Per-request parameters shared by the hosted backends.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestSettings {
    pub model: String,
    /// Scheme and host without a trailing slash, e.g. `https://api.openai.com`.
    pub base_url: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout: Duration,
}

impl RequestSettings {
    pub fn from_config(ai: &AiConfig) -> Self {
        Self {
            model: ai.resolved_model(),
            base_url: ai.resolved_base_url(),
            temperature: ai.temperature,
            max_tokens: ai.max_tokens,
            timeout: Duration::from_secs(ai.request_timeout_secs),
        }
    }
}

pub(crate) fn build_client(timeout: Duration) -> Result<reqwest::Client, GenerationError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| GenerationError::ProviderConfig(format!("failed to build HTTP client: {}", e)))
}

/// Maps a transport failure onto the error taxonomy.
pub(crate) fn classify_request_error(e: reqwest::Error) -> GenerationError {
    if e.is_timeout() {
        GenerationError::Timeout(e.to_string())
    } else if e.is_decode() || e.is_body() {
        GenerationError::InvalidResponse(e.to_string())
    } else if e.is_builder() {
        GenerationError::ProviderConfig(e.to_string())
    } else {
        GenerationError::Unavailable(e.to_string())
    }
}

/// Maps a non-success HTTP status onto the error taxonomy.
pub(crate) fn classify_status(status: reqwest::StatusCode, body: &str) -> GenerationError {
    let detail = format!("HTTP {}: {}", status.as_u16(), error_detail(body));
    match status.as_u16() {
        429 => GenerationError::RateLimited(detail),
        401 | 403 | 404 => GenerationError::ProviderConfig(detail),
        408 | 504 => GenerationError::Timeout(detail),
        s if s >= 500 => GenerationError::Unavailable(detail),
        _ => GenerationError::InvalidResponse(detail),
    }
}

/// Pulls `error.message` out of a provider error body, falling back to a
/// shortened copy of the raw body.
fn error_detail(body: &str) -> String {
    const MAX_DETAIL: usize = 300;

    let message = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.pointer("/error/message")
                .and_then(|m| m.as_str())
                .map(str::to_string)
        });

    match message {
        Some(message) => message,
        None => body.trim().chars().take(MAX_DETAIL).collect(),
    }
}
