use async_trait::async_trait;

use crate::domain::{Document, DomainError, EmbeddingConfig};

/// Turns text into fixed-length vectors.
#[async_trait]
pub trait EmbeddingService: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, DomainError>;

    /// One vector per document, in input order. Either every document is
    /// embedded or the call fails; partial results are never returned.
    async fn embed_batch(&self, documents: &[Document]) -> Result<Vec<Vec<f32>>, DomainError>;

    /// Same transformation as [`embed`](EmbeddingService::embed) unless an
    /// implementation needs query-specific preprocessing.
    async fn embed_query(&self, query: &str) -> Result<Vec<f32>, DomainError> {
        self.embed(query).await
    }

    fn config(&self) -> &EmbeddingConfig;
}
