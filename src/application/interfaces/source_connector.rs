use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{Document, DomainError};

/// A pluggable content source (calendar, mail, docs, chat, tasks, ...).
///
/// The scheduler drives every connector through this interface and never
/// branches on which concrete source it is talking to.
#[async_trait]
pub trait SourceConnector: Send + Sync {
    /// Stable name, used as the watermark key and in logs.
    fn name(&self) -> &str;

    /// Establishes credentials. Fails with [`DomainError::AuthError`].
    async fn initialize(&self) -> Result<(), DomainError>;

    /// Returns documents new or changed since `since`. Fails with
    /// [`DomainError::FetchError`] on transient upstream problems.
    async fn fetch(&self, since: DateTime<Utc>) -> Result<Vec<Document>, DomainError>;
}
