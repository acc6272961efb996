use serde::{Deserialize, Serialize};

use super::Document;

/// A stored document paired with its similarity to a query (higher is closer).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    document: Document,
    score: f32,
}

impl SearchResult {
    pub fn new(document: Document, score: f32) -> Self {
        Self { document, score }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn into_document(self) -> Document {
        self.document
    }

    pub fn score(&self) -> f32 {
        self.score
    }

    pub fn display_line(&self) -> String {
        let label = self.document.title().unwrap_or(self.document.id());
        format!(
            "[{}] {} (score: {:.3})",
            self.document.source(),
            label,
            self.score
        )
    }
}
