//! LLM provider trait for generating answers

use async_trait::async_trait;
use crate::error::Result;

/// Trait for prompt completion
///
/// Prompts are fully assembled by the agent; providers only transport them.
///
/// Implementations:
/// - `OpenAiChat`: OpenAI chat completions
/// - `AnthropicChat`: Anthropic messages API
/// - `OllamaLlm`: Local Ollama server
/// - `MockLlm`: Canned answers for tests
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Complete a single prompt
    async fn complete(&self, prompt: &str) -> Result<String>;

    /// Check if the provider is healthy and available
    async fn health_check(&self) -> Result<bool>;

    /// Get provider name for logging
    fn name(&self) -> &str;

    /// Get the model being used
    fn model(&self) -> &str;
}
