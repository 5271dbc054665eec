//! Anthropic Messages API backend.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use super::{
    build_client, classify_request_error, classify_status, GenerationError, Generator,
    RequestSettings,
};

const API_VERSION: &str = "2023-06-01";

pub struct AnthropicGenerator {
    api_key: SecretString,
    settings: RequestSettings,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    messages: [MessageParam<'a>; 1],
}

#[derive(Debug, Serialize)]
struct MessageParam<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

impl AnthropicGenerator {
    pub fn new(api_key: SecretString, settings: RequestSettings) -> Result<Self, GenerationError> {
        let client = build_client(settings.timeout)?;
        Ok(Self {
            api_key,
            settings,
            client,
        })
    }

    fn messages_url(&self) -> String {
        format!("{}/v1/messages", self.settings.base_url)
    }
}

#[async_trait]
impl Generator for AnthropicGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let body = MessagesRequest {
            model: &self.settings.model,
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
            messages: [MessageParam {
                role: "user",
                content: prompt,
            }],
        };

        log::debug!(
            "Anthropic request: model={}, prompt_chars={}",
            self.settings.model,
            prompt.chars().count()
        );

        let response = self
            .client
            .post(self.messages_url())
            .header("x-api-key", self.api_key.expose_secret())
            .header("anthropic-version", API_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(classify_request_error)?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(classify_status(status, &error_text));
        }

        let parsed: MessagesResponse = response.json().await.map_err(classify_request_error)?;

        let text: String = parsed
            .content
            .into_iter()
            .filter(|block| block.kind == "text")
            .filter_map(|block| block.text)
            .collect();

        if text.trim().is_empty() {
            return Err(GenerationError::InvalidResponse(
                "response contained no text content".to_string(),
            ));
        }
        Ok(text)
    }

    fn name(&self) -> &str {
        "anthropic"
    }

    fn model(&self) -> &str {
        &self.settings.model
    }
}
