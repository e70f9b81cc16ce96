//! HuggingFace Inference API embeddings (sentence-transformers models)

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use crate::config::{EmbeddingConfig, LlmConfig};
use crate::error::{Error, Result};

use super::embedding::EmbeddingProvider;
use super::http::{build_client, ensure_success, retry_request};
use super::mock::l2_normalize;

#[derive(Serialize)]
struct FeatureExtractionRequest {
    inputs: Vec<String>,
    options: RequestOptions,
}

#[derive(Serialize)]
struct RequestOptions {
    wait_for_model: bool,
}

/// Sentence embeddings from the hosted feature-extraction pipeline.
///
/// Vectors are L2-normalized so cosine and dot-product rankings agree.
pub struct HuggingFaceEmbedder {
    client: Client,
    url: String,
    token: String,
    dimensions: usize,
    batch_size: usize,
    max_retries: u32,
}

impl HuggingFaceEmbedder {
    pub fn new(
        embeddings: &EmbeddingConfig,
        llm: &LlmConfig,
        token: Option<&str>,
    ) -> Result<Self> {
        let token = token.filter(|t| !t.is_empty()).ok_or_else(|| {
            Error::Config("HuggingFace token required (HUGGINGFACEHUB_API_TOKEN)".into())
        })?;

        Ok(Self {
            client: build_client(llm.timeout_secs)?,
            url: format!(
                "{}/pipeline/feature-extraction/{}",
                llm.huggingface_base_url.trim_end_matches('/'),
                embeddings.model
            ),
            token: token.to_string(),
            dimensions: embeddings.dimensions,
            batch_size: embeddings.batch_size.max(1),
            max_retries: llm.max_retries,
        })
    }

    async fn request(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let body = FeatureExtractionRequest {
            inputs: texts.to_vec(),
            options: RequestOptions {
                wait_for_model: true,
            },
        };

        let vectors: Vec<Vec<f32>> = retry_request(self.max_retries, || {
            let request = self
                .client
                .post(&self.url)
                .bearer_auth(&self.token)
                .json(&body);

            async move {
                let response = request
                    .send()
                    .await
                    .map_err(|e| Error::embedding(format!("Embedding request failed: {}", e)))?;
                let response = ensure_success(response, "Embedding", Error::Embedding).await?;
                response.json().await.map_err(|e| {
                    Error::embedding(format!("Failed to parse embedding response: {}", e))
                })
            }
        })
        .await?;

        if vectors.len() != texts.len() {
            return Err(Error::embedding(format!(
                "Expected {} embeddings, got {}",
                texts.len(),
                vectors.len()
            )));
        }
        Ok(vectors.into_iter().map(l2_normalize).collect())
    }
}

#[async_trait]
impl EmbeddingProvider for HuggingFaceEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.request(&[text.to_string()])
            .await?
            .pop()
            .ok_or_else(|| Error::embedding("Empty embedding response"))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            embeddings.extend(self.request(batch).await?);
        }
        Ok(embeddings)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(self.embed("ping").await.is_ok())
    }

    fn name(&self) -> &str {
        "huggingface"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requires_token() {
        let result = HuggingFaceEmbedder::new(
            &EmbeddingConfig::default(),
            &LlmConfig::default(),
            None,
        );
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_model_in_url() {
        let embedder = HuggingFaceEmbedder::new(
            &EmbeddingConfig::default(),
            &LlmConfig::default(),
            Some("hf_test"),
        )
        .unwrap();
        assert!(embedder
            .url
            .ends_with("/pipeline/feature-extraction/sentence-transformers/all-mpnet-base-v2"));
    }
}
