use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where a connector currently is in its fetch → embed → store cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncPhase {
    Idle,
    Fetching,
    Embedding,
    Storing,
}

impl SyncPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncPhase::Idle => "idle",
            SyncPhase::Fetching => "fetching",
            SyncPhase::Embedding => "embedding",
            SyncPhase::Storing => "storing",
        }
    }
}

impl std::fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result of one completed sync cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SyncOutcome {
    /// Fetch returned nothing; watermark left as is.
    Empty,
    /// Documents were embedded and stored; watermark advanced.
    Stored {
        documents: usize,
        watermark: DateTime<Utc>,
    },
    /// A previous cycle for the same connector was still in flight.
    AlreadyRunning,
}

impl SyncOutcome {
    pub fn stored_count(&self) -> usize {
        match self {
            SyncOutcome::Stored { documents, .. } => *documents,
            _ => 0,
        }
    }

    pub fn summary(&self) -> String {
        match self {
            SyncOutcome::Empty => "no new documents".to_string(),
            SyncOutcome::Stored {
                documents,
                watermark,
            } => format!(
                "stored {} documents, watermark {}",
                documents,
                watermark.to_rfc3339()
            ),
            SyncOutcome::AlreadyRunning => "skipped, previous run still in flight".to_string(),
        }
    }
}

/// Snapshot of a connector's scheduler state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectorStatus {
    pub source: String,
    pub enabled: bool,
    pub phase: SyncPhase,
    pub watermark: Option<DateTime<Utc>>,
    pub last_run: Option<DateTime<Utc>>,
    pub last_outcome: Option<SyncOutcome>,
    pub last_error: Option<String>,
}

impl ConnectorStatus {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            enabled: true,
            phase: SyncPhase::Idle,
            watermark: None,
            last_run: None,
            last_outcome: None,
            last_error: None,
        }
    }
}
