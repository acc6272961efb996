use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Upper bound on stored content, in characters.
pub const MAX_CONTENT_CHARS: usize = 6000;

/// Appended to content that was cut at [`MAX_CONTENT_CHARS`].
pub const TRUNCATION_MARKER: &str = "... [truncated]";

/// A unit of retrievable content produced by a source connector.
///
/// `id` is the store's primary key on its own: connectors must mint ids that
/// are unique across all sources, otherwise a document from one source
/// overwrites a document from another.
///
/// Fields are only reachable through [`Document::new`] and the builder
/// setters outside this crate, so content is always truncated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub(crate) id: String,
    pub(crate) content: String,
    pub(crate) title: Option<String>,
    pub(crate) url: Option<String>,
    pub(crate) metadata: Map<String, Value>,
    pub(crate) source: String,
    pub(crate) timestamp: DateTime<Utc>,
}

impl Document {
    pub fn new(
        id: impl Into<String>,
        content: impl Into<String>,
        source: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            content: truncate_content(&content.into()),
            title: None,
            url: None,
            metadata: Map::new(),
            source: source.into(),
            timestamp,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn metadata(&self) -> &Map<String, Value> {
        &self.metadata
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn is_truncated(&self) -> bool {
        self.content.ends_with(TRUNCATION_MARKER)
    }
}

/// Cuts `content` to [`MAX_CONTENT_CHARS`] characters and appends the marker.
pub fn truncate_content(content: &str) -> String {
    match content.char_indices().nth(MAX_CONTENT_CHARS) {
        Some((byte_idx, _)) => {
            let mut truncated = String::with_capacity(byte_idx + TRUNCATION_MARKER.len());
            truncated.push_str(&content[..byte_idx]);
            truncated.push_str(TRUNCATION_MARKER);
            truncated
        }
        None => content.to_string(),
    }
}
