use std::sync::Arc;
use std::time::Instant;

use tracing::info;

use crate::application::{EmbeddingService, VectorRepository};
use crate::domain::{DomainError, SearchResult};

/// Embeds a free-text query and returns the nearest stored documents.
pub struct SearchDocumentsUseCase {
    vector_repo: Arc<dyn VectorRepository>,
    embedding_service: Arc<dyn EmbeddingService>,
}

impl SearchDocumentsUseCase {
    pub fn new(
        vector_repo: Arc<dyn VectorRepository>,
        embedding_service: Arc<dyn EmbeddingService>,
    ) -> Self {
        Self {
            vector_repo,
            embedding_service,
        }
    }

    pub async fn execute(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>, DomainError> {
        if query.trim().is_empty() {
            return Err(DomainError::invalid_input("Query must not be empty"));
        }

        info!("Searching for: {} (limit={})", query, limit);
        let start_time = Instant::now();

        let query_embedding = self.embedding_service.embed_query(query).await?;
        let results = self.vector_repo.search(&query_embedding, limit).await?;

        info!(
            "Found {} results in {:.2}s",
            results.len(),
            start_time.elapsed().as_secs_f64()
        );

        Ok(results)
    }
}
