use std::sync::Arc;

use tracing::{info, warn};

use crate::application::VectorRepository;
use crate::domain::DomainError;

/// Removes stored documents, either for one source or for all of them.
pub struct PurgeSourceUseCase {
    vector_repo: Arc<dyn VectorRepository>,
}

impl PurgeSourceUseCase {
    pub fn new(vector_repo: Arc<dyn VectorRepository>) -> Self {
        Self { vector_repo }
    }

    pub async fn purge_source(&self, source: &str) -> Result<(), DomainError> {
        if source.trim().is_empty() {
            return Err(DomainError::invalid_input("Source must not be empty"));
        }

        info!("Deleting documents from source: {}", source);
        self.vector_repo.delete_by_source(source).await?;
        info!("Source {} purged", source);

        Ok(())
    }

    pub async fn purge_all(&self) -> Result<(), DomainError> {
        warn!("Deleting every stored document");
        self.vector_repo.delete_all().await
    }
}
