use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::application::VectorRepository;
use crate::domain::{cosine_similarity, is_zero_vector, Document, DomainError, SearchResult};

/// Non-persistent store for tests and `--memory-storage` runs.
///
/// Entries keep their insertion order, which breaks ties between equal scores.
pub struct InMemoryVectorRepository {
    entries: Arc<RwLock<Vec<(Document, Vec<f32>)>>>,
    dimensions: usize,
}

impl InMemoryVectorRepository {
    pub fn new(dimensions: usize) -> Self {
        Self {
            entries: Arc::new(RwLock::new(Vec::new())),
            dimensions,
        }
    }

    fn check_dimensions(&self, vector: &[f32]) -> Result<(), DomainError> {
        if vector.len() != self.dimensions {
            return Err(DomainError::dimension_mismatch(self.dimensions, vector.len()));
        }
        Ok(())
    }
}

#[async_trait]
impl VectorRepository for InMemoryVectorRepository {
    async fn initialize(&self) -> Result<(), DomainError> {
        Ok(())
    }

    async fn store(&self, documents: &[Document], vectors: &[Vec<f32>]) -> Result<(), DomainError> {
        if documents.len() != vectors.len() {
            return Err(DomainError::storage(format!(
                "Document and vector count mismatch: {} documents, {} vectors",
                documents.len(),
                vectors.len()
            )));
        }
        // Validate the whole batch before touching the store
        for vector in vectors {
            self.check_dimensions(vector)?;
        }

        let mut entries = self.entries.write().await;
        for (document, vector) in documents.iter().zip(vectors) {
            match entries.iter_mut().find(|(d, _)| d.id() == document.id()) {
                Some(entry) => *entry = (document.clone(), vector.clone()),
                None => entries.push((document.clone(), vector.clone())),
            }
        }

        debug!("Stored {} documents in memory", documents.len());
        Ok(())
    }

    async fn search(
        &self,
        query_vector: &[f32],
        limit: usize,
    ) -> Result<Vec<SearchResult>, DomainError> {
        self.check_dimensions(query_vector)?;
        if limit == 0 {
            return Err(DomainError::invalid_input("Search limit must be positive"));
        }
        if is_zero_vector(query_vector) {
            return Err(DomainError::invalid_input("Query vector has zero magnitude"));
        }

        let entries = self.entries.read().await;
        let mut scored: Vec<(usize, f32)> = entries
            .iter()
            .enumerate()
            .map(|(i, (_, vector))| (i, cosine_similarity(query_vector, vector)))
            .collect();

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        Ok(scored
            .into_iter()
            .take(limit)
            .map(|(i, score)| SearchResult::new(entries[i].0.clone(), score))
            .collect())
    }

    async fn delete_by_source(&self, source: &str) -> Result<(), DomainError> {
        let mut entries = self.entries.write().await;
        entries.retain(|(document, _)| document.source() != source);
        Ok(())
    }

    async fn delete_all(&self) -> Result<(), DomainError> {
        self.entries.write().await.clear();
        Ok(())
    }

    async fn count(&self) -> Result<u64, DomainError> {
        Ok(self.entries.read().await.len() as u64)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn doc(id: &str, source: &str) -> Document {
        Document::new(id, format!("content of {}", id), source, Utc::now())
    }

    #[tokio::test]
    async fn test_upsert_keeps_single_entry_with_latest_values() {
        let repo = InMemoryVectorRepository::new(2);
        repo.store(&[doc("a", "gmail")], &[vec![1.0, 0.0]]).await.unwrap();

        let updated = Document::new("a", "new content", "gmail", Utc::now());
        repo.store(&[updated], &[vec![0.0, 1.0]]).await.unwrap();

        assert_eq!(repo.count().await.unwrap(), 1);
        let results = repo.search(&[0.0, 1.0], 5).await.unwrap();
        assert_eq!(results[0].document().content(), "new content");
        assert!((results[0].score() - 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_bad_vector_rejects_whole_batch() {
        let repo = InMemoryVectorRepository::new(2);
        let err = repo
            .store(
                &[doc("a", "gmail"), doc("b", "gmail")],
                &[vec![1.0, 0.0], vec![1.0]],
            )
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::DimensionMismatch { .. }));
        assert_eq!(repo.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_zero_query_vector_is_rejected() {
        let repo = InMemoryVectorRepository::new(2);
        repo.store(&[doc("a", "gmail")], &[vec![1.0, 0.0]]).await.unwrap();

        let err = repo.search(&[0.0, 0.0], 5).await.unwrap_err();
        assert!(matches!(err, DomainError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_ties_keep_insertion_order() {
        let repo = InMemoryVectorRepository::new(2);
        repo.store(
            &[doc("z", "slack"), doc("a", "slack")],
            &[vec![1.0, 0.0], vec![2.0, 0.0]],
        )
        .await
        .unwrap();

        let results = repo.search(&[1.0, 0.0], 2).await.unwrap();
        assert_eq!(results[0].document().id(), "z");
        assert_eq!(results[1].document().id(), "a");
    }
}
