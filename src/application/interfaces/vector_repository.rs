use async_trait::async_trait;

use crate::domain::{Document, DomainError, SearchResult};

/// Vector storage and similarity search operations.
///
/// `id` alone is the primary key: storing a document whose id already exists
/// replaces its content, metadata, timestamp and vector.
#[async_trait]
pub trait VectorRepository: Send + Sync {
    /// Provisions the schema and similarity index. Safe to call repeatedly.
    async fn initialize(&self) -> Result<(), DomainError>;

    /// Persists `documents[i]` with `vectors[i]` as one all-or-nothing unit.
    async fn store(&self, documents: &[Document], vectors: &[Vec<f32>]) -> Result<(), DomainError>;

    /// Returns up to `limit` results ordered by descending similarity.
    async fn search(
        &self,
        query_vector: &[f32],
        limit: usize,
    ) -> Result<Vec<SearchResult>, DomainError>;

    async fn delete_by_source(&self, source: &str) -> Result<(), DomainError>;

    async fn delete_all(&self) -> Result<(), DomainError>;

    async fn count(&self) -> Result<u64, DomainError>;

    fn dimensions(&self) -> usize;
}
