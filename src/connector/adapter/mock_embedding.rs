use async_trait::async_trait;
use rand::Rng;
use rand::SeedableRng;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::application::EmbeddingService;
use crate::domain::{Document, DomainError, EmbeddingConfig};

/// Offline embedding service: identical text always maps to the same unit vector.
pub struct MockEmbedding {
    config: EmbeddingConfig,
}

impl MockEmbedding {
    pub fn new() -> Self {
        Self::with_dimensions(EmbeddingConfig::default().dimensions())
    }

    pub fn with_dimensions(dimensions: usize) -> Self {
        Self {
            config: EmbeddingConfig::new("mock-embedding", dimensions, 100),
        }
    }

    fn generate_embedding(&self, text: &str) -> Vec<f32> {
        // SHA-256 rather than std's hasher so vectors are stable across builds
        let digest = Sha256::digest(text.as_bytes());
        let mut seed = [0u8; 32];
        seed.copy_from_slice(&digest);

        let mut rng = rand::rngs::StdRng::from_seed(seed);
        let mut vector: Vec<f32> = (0..self.config.dimensions())
            .map(|_| rng.gen_range(-1.0..1.0))
            .collect();

        let magnitude: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            for x in &mut vector {
                *x /= magnitude;
            }
        }

        vector
    }
}

impl Default for MockEmbedding {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmbeddingService for MockEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, DomainError> {
        Ok(self.generate_embedding(text))
    }

    async fn embed_batch(&self, documents: &[Document]) -> Result<Vec<Vec<f32>>, DomainError> {
        let vectors: Vec<Vec<f32>> = documents
            .iter()
            .map(|doc| self.generate_embedding(doc.content()))
            .collect();

        debug!("Generated {} mock embeddings", vectors.len());

        Ok(vectors)
    }

    fn config(&self) -> &EmbeddingConfig {
        &self.config
    }
}
