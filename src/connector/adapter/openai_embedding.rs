use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::application::EmbeddingService;
use crate::domain::{Document, DomainError, EmbeddingConfig};

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MAX_RETRIES: u32 = 3;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

/// Embeddings from an OpenAI-compatible `/embeddings` endpoint.
///
/// Documents are sent in chunks of the configured batch size. Rate limits
/// (429), server errors and network failures are retried with exponential
/// backoff; any other 4xx fails immediately. A batch either yields one
/// vector per input or fails as a whole.
pub struct OpenAiEmbedding {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    config: EmbeddingConfig,
    max_retries: u32,
    retry_base_delay: Duration,
}

impl OpenAiEmbedding {
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        config: EmbeddingConfig,
    ) -> Result<Self, DomainError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| DomainError::internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            config,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_base_delay: Duration::from_secs(1),
        })
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Delay before the first retry; doubles on each further attempt.
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_base_delay = delay;
        self
    }

    async fn request_embeddings(&self, inputs: &[&str]) -> Result<Vec<Vec<f32>>, DomainError> {
        let url = format!("{}/embeddings", self.base_url);
        let body = EmbeddingRequest {
            model: self.config.model_name(),
            input: inputs,
        };

        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                // Exponential backoff: 1x, 2x, 4x, ... capped at 32x the base delay
                let delay = self.retry_base_delay * (1u32 << (attempt - 1).min(5));
                debug!("Retrying embeddings request in {:?} (attempt {})", delay, attempt + 1);
                tokio::time::sleep(delay).await;
            }

            let resp = self
                .client
                .post(&url)
                .bearer_auth(&self.api_key)
                .json(&body)
                .send()
                .await;

            let response = match resp {
                Ok(response) => response,
                Err(e) => {
                    warn!("Embeddings request failed: {}", e);
                    last_err = Some(DomainError::embedding(format!("Request failed: {}", e)));
                    continue;
                }
            };

            let status = response.status();
            if status.is_success() {
                let parsed: EmbeddingResponse = response.json().await.map_err(|e| {
                    DomainError::embedding(format!("Failed to parse embeddings response: {}", e))
                })?;
                return self.into_vectors(parsed, inputs.len());
            }

            let body_text = response.text().await.unwrap_or_default();
            if status.as_u16() == 429 || status.is_server_error() {
                warn!("Embeddings API returned {}, will retry", status);
                last_err = Some(DomainError::embedding(format!(
                    "API error {}: {}",
                    status, body_text
                )));
                continue;
            }

            return Err(DomainError::embedding(format!(
                "API error {}: {}",
                status, body_text
            )));
        }

        Err(last_err.unwrap_or_else(|| DomainError::embedding("Embedding failed after retries")))
    }

    fn into_vectors(
        &self,
        mut response: EmbeddingResponse,
        expected: usize,
    ) -> Result<Vec<Vec<f32>>, DomainError> {
        if response.data.len() != expected {
            return Err(DomainError::embedding(format!(
                "Expected {} embeddings, got {}",
                expected,
                response.data.len()
            )));
        }

        // The API may answer out of order
        response.data.sort_by_key(|d| d.index);

        let mut vectors = Vec::with_capacity(expected);
        for (position, data) in response.data.into_iter().enumerate() {
            if data.index != position {
                return Err(DomainError::embedding(format!(
                    "Missing embedding for input {}",
                    position
                )));
            }
            if data.embedding.len() != self.config.dimensions() {
                return Err(DomainError::dimension_mismatch(
                    self.config.dimensions(),
                    data.embedding.len(),
                ));
            }
            vectors.push(data.embedding);
        }
        Ok(vectors)
    }
}

#[async_trait]
impl EmbeddingService for OpenAiEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, DomainError> {
        self.request_embeddings(&[text])
            .await?
            .pop()
            .ok_or_else(|| DomainError::embedding("Empty embeddings response"))
    }

    async fn embed_batch(&self, documents: &[Document]) -> Result<Vec<Vec<f32>>, DomainError> {
        let mut vectors = Vec::with_capacity(documents.len());

        for (batch_idx, batch) in documents.chunks(self.config.batch_size()).enumerate() {
            let inputs: Vec<&str> = batch.iter().map(|d| d.content()).collect();
            debug!(
                "Embedding batch {} ({} documents) with {}",
                batch_idx + 1,
                inputs.len(),
                self.config.model_name()
            );
            vectors.extend(self.request_embeddings(&inputs).await?);
        }

        Ok(vectors)
    }

    fn config(&self) -> &EmbeddingConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(dimensions: usize) -> OpenAiEmbedding {
        OpenAiEmbedding::new("key", "http://localhost:1/", EmbeddingConfig::new("m", dimensions, 10))
            .unwrap()
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        assert_eq!(service(2).base_url, "http://localhost:1");
    }

    #[test]
    fn test_out_of_order_response_is_reordered() {
        let response: EmbeddingResponse = serde_json::from_str(
            r#"{"data": [
                {"index": 1, "embedding": [0.0, 1.0]},
                {"index": 0, "embedding": [1.0, 0.0]}
            ]}"#,
        )
        .unwrap();

        let vectors = service(2).into_vectors(response, 2).unwrap();
        assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[test]
    fn test_short_response_is_rejected() {
        let response: EmbeddingResponse =
            serde_json::from_str(r#"{"data": [{"index": 0, "embedding": [1.0, 0.0]}]}"#).unwrap();

        let err = service(2).into_vectors(response, 2).unwrap_err();
        assert!(matches!(err, DomainError::EmbeddingError(_)));
    }

    #[test]
    fn test_wrong_dimension_is_rejected() {
        let response: EmbeddingResponse =
            serde_json::from_str(r#"{"data": [{"index": 0, "embedding": [1.0]}]}"#).unwrap();

        let err = service(2).into_vectors(response, 1).unwrap_err();
        assert!(matches!(err, DomainError::DimensionMismatch { .. }));
    }

    #[tokio::test]
    async fn test_empty_batch_makes_no_request() {
        let vectors = service(2).embed_batch(&[]).await.unwrap();
        assert!(vectors.is_empty());
    }
}
