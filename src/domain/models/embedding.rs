use serde::{Deserialize, Serialize};

/// An embedding vector. Its length must equal the deployment's configured dimension.
pub type Vector = Vec<f32>;

/// Configuration for the embedding model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    model_name: String,
    dimensions: usize,
    batch_size: usize,
}

impl EmbeddingConfig {
    pub fn new(model_name: impl Into<String>, dimensions: usize, batch_size: usize) -> Self {
        Self {
            model_name: model_name.into(),
            dimensions,
            // A zero batch size would never make progress
            batch_size: batch_size.max(1),
        }
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model_name: "text-embedding-ada-002".to_string(),
            dimensions: 1536,
            batch_size: 100,
        }
    }
}

/// Cosine similarity in `[-1.0, 1.0]`; `0.0` for empty, mismatched or zero-norm inputs.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a < f32::EPSILON || norm_b < f32::EPSILON {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

/// True when every component is zero; such a vector has no direction to compare.
pub fn is_zero_vector(v: &[f32]) -> bool {
    v.iter().all(|x| *x == 0.0)
}
