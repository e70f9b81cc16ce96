//! Offline providers for tests and local experiments

use async_trait::async_trait;
use parking_lot::Mutex;
use std::hash::{DefaultHasher, Hash, Hasher};

use crate::error::{Error, Result};

use super::embedding::EmbeddingProvider;
use super::llm::LlmProvider;

/// Scale a vector to unit length. Zero vectors are returned unchanged.
pub fn l2_normalize(mut v: Vec<f32>) -> Vec<f32> {
    let norm_sq: f32 = v.iter().map(|x| x * x).sum();
    if norm_sq > 0.0 {
        let inv = 1.0 / norm_sq.sqrt();
        for x in &mut v {
            *x *= inv;
        }
    }
    v
}

/// Deterministic bag-of-words embedder.
///
/// Each lowercase word is hashed into one of `dimensions` buckets, so texts
/// that share words have positive cosine similarity.
pub struct MockEmbedder {
    dimensions: usize,
}

impl MockEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }
}

impl Default for MockEmbedder {
    fn default() -> Self {
        Self::new(64)
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut v = vec![0.0f32; self.dimensions];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let mut hasher = DefaultHasher::new();
            word.to_lowercase().hash(&mut hasher);
            v[(hasher.finish() % self.dimensions as u64) as usize] += 1.0;
        }
        Ok(l2_normalize(v))
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// LLM that returns a canned answer and records every prompt it receives
pub struct MockLlm {
    answer: Option<String>,
    prompts: Mutex<Vec<String>>,
}

impl MockLlm {
    /// Always answer with `answer`
    pub fn new(answer: impl Into<String>) -> Self {
        Self {
            answer: Some(answer.into()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Fail every completion
    pub fn failing() -> Self {
        Self {
            answer: None,
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Prompts received so far, oldest first
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }
}

#[async_trait]
impl LlmProvider for MockLlm {
    async fn complete(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().push(prompt.to_string());
        self.answer
            .clone()
            .ok_or_else(|| Error::llm("mock LLM configured to fail"))
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(self.answer.is_some())
    }

    fn name(&self) -> &str {
        "mock"
    }

    fn model(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::cosine_similarity;

    #[tokio::test]
    async fn test_mock_embed_deterministic_and_normalized() {
        let embedder = MockEmbedder::new(32);
        let a = embedder.embed("Hello world").await.unwrap();
        let b = embedder.embed("hello, WORLD").await.unwrap();
        assert_eq!(a, b);

        let norm: f32 = a.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4);
    }

    #[tokio::test]
    async fn test_shared_words_score_higher() {
        let embedder = MockEmbedder::new(256);
        let query = embedder.embed("vacation policy days").await.unwrap();
        let related = embedder.embed("the vacation policy grants days off").await.unwrap();
        let unrelated = embedder.embed("quarterly revenue grew").await.unwrap();

        assert!(cosine_similarity(&query, &related) > cosine_similarity(&query, &unrelated));
    }

    #[tokio::test]
    async fn test_mock_llm_records_prompts() {
        let llm = MockLlm::new("42");
        assert_eq!(llm.complete("what?").await.unwrap(), "42");
        assert_eq!(llm.prompts(), vec!["what?".to_string()]);

        assert!(MockLlm::failing().complete("x").await.is_err());
    }
}
