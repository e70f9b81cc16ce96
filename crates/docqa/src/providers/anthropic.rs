//! Anthropic messages API

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::LlmConfig;
use crate::error::{Error, Result};

use super::http::{build_client, ensure_success, retry_request};
use super::llm::LlmProvider;

const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

#[derive(Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<Message>,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

/// Claude models over the Anthropic messages API
pub struct AnthropicChat {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    max_retries: u32,
}

impl AnthropicChat {
    pub fn new(config: &LlmConfig, api_key: Option<&str>) -> Result<Self> {
        let api_key = api_key.filter(|k| !k.is_empty()).ok_or_else(|| {
            Error::Config("Anthropic API key required (ANTHROPIC_API_KEY)".into())
        })?;

        Ok(Self {
            client: build_client(config.timeout_secs)?,
            base_url: config.anthropic_base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            max_retries: config.max_retries,
        })
    }
}

#[async_trait]
impl LlmProvider for AnthropicChat {
    async fn complete(&self, prompt: &str) -> Result<String> {
        tracing::info!("Generating answer with model: {}", self.model);

        let url = format!("{}/messages", self.base_url);
        let body = MessagesRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            messages: vec![Message {
                role: "user",
                content: prompt.to_string(),
            }],
        };

        retry_request(self.max_retries, || {
            let request = self
                .client
                .post(&url)
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .json(&body);

            async move {
                let response = request
                    .send()
                    .await
                    .map_err(|e| Error::llm(format!("Messages request failed: {}", e)))?;
                let response = ensure_success(response, "Messages", Error::Llm).await?;
                let body: MessagesResponse = response
                    .json()
                    .await
                    .map_err(|e| Error::llm(format!("Failed to parse messages response: {}", e)))?;

                Ok(body
                    .content
                    .into_iter()
                    .filter(|b| b.kind == "text")
                    .map(|b| b.text)
                    .collect::<Vec<_>>()
                    .join(""))
            }
        })
        .await
    }

    async fn health_check(&self) -> Result<bool> {
        // Key presence only; the API has no unauthenticated ping
        Ok(!self.api_key.is_empty())
    }

    fn name(&self) -> &str {
        "anthropic"
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_key_is_config_error() {
        assert!(matches!(
            AnthropicChat::new(&LlmConfig::default(), None),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_text_blocks_joined() {
        let raw = r#"{"content":[{"type":"text","text":"Hello "},{"type":"tool_use"},{"type":"text","text":"world"}]}"#;
        let parsed: MessagesResponse = serde_json::from_str(raw).unwrap();
        let text: String = parsed
            .content
            .into_iter()
            .filter(|b| b.kind == "text")
            .map(|b| b.text)
            .collect();
        assert_eq!(text, "Hello world");
    }
}
