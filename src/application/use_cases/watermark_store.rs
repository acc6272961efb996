use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

/// Per-source last-successful-sync timestamps, held in process memory only.
///
/// A restart forgets every watermark, so the next cycle re-fetches from
/// [`WatermarkStore::initial`]. Each read and each write is atomic with
/// respect to other sources; one key is only ever written by its own
/// connector's cycle.
#[derive(Debug, Default)]
pub struct WatermarkStore {
    watermarks: RwLock<HashMap<String, DateTime<Utc>>>,
}

impl WatermarkStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lower bound used for a source that has never synced.
    pub fn initial() -> DateTime<Utc> {
        DateTime::UNIX_EPOCH
    }

    pub async fn get(&self, source: &str) -> Option<DateTime<Utc>> {
        self.watermarks.read().await.get(source).copied()
    }

    /// The fetch lower bound for `source`.
    pub async fn since(&self, source: &str) -> DateTime<Utc> {
        self.get(source).await.unwrap_or_else(Self::initial)
    }

    /// Moves the watermark forward to `to`. Never moves it backwards.
    pub async fn advance(&self, source: &str, to: DateTime<Utc>) -> DateTime<Utc> {
        let mut watermarks = self.watermarks.write().await;
        let entry = watermarks.entry(source.to_string()).or_insert(to);
        if to > *entry {
            *entry = to;
        }
        *entry
    }

    pub async fn snapshot(&self) -> HashMap<String, DateTime<Utc>> {
        self.watermarks.read().await.clone()
    }
}
