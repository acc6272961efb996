use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use futures_util::future::join_all;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::application::{EmbeddingService, SourceConnector, VectorRepository};
use crate::domain::{ConnectorStatus, DomainError, SyncOutcome, SyncPhase};

use super::WatermarkStore;

pub const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    interval: Duration,
    reset_on_start: bool,
}

impl SchedulerConfig {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            reset_on_start: true,
        }
    }

    /// Whether [`SyncScheduler::start`] wipes the vector store before the first cycle.
    pub fn with_reset_on_start(mut self, reset: bool) -> Self {
        self.reset_on_start = reset;
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn reset_on_start(&self) -> bool {
        self.reset_on_start
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self::new(DEFAULT_SYNC_INTERVAL)
    }
}

struct ConnectorSlot {
    connector: Arc<dyn SourceConnector>,
    /// Held for the whole of a cycle; a second run for the same connector
    /// fails `try_lock` and is skipped.
    in_flight: Mutex<()>,
    status: Mutex<ConnectorStatus>,
}

impl ConnectorSlot {
    fn new(connector: Arc<dyn SourceConnector>) -> Self {
        let status = ConnectorStatus::new(connector.name());
        Self {
            connector,
            in_flight: Mutex::new(()),
            status: Mutex::new(status),
        }
    }

    fn name(&self) -> &str {
        self.connector.name()
    }

    async fn set_phase(&self, phase: SyncPhase) {
        self.status.lock().await.phase = phase;
    }
}

/// Drives a fetch → embed → store cycle per connector on a fixed interval.
///
/// Every connector runs on its own task; a failure in one never blocks or
/// retries another. Watermarks advance to the time the fetch started, and
/// only after a successful store.
pub struct SyncScheduler {
    slots: Vec<Arc<ConnectorSlot>>,
    vector_repo: Arc<dyn VectorRepository>,
    embedding_service: Arc<dyn EmbeddingService>,
    watermarks: Arc<WatermarkStore>,
    config: SchedulerConfig,
    shutdown: CancellationToken,
    started: AtomicBool,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl SyncScheduler {
    pub fn new(
        vector_repo: Arc<dyn VectorRepository>,
        embedding_service: Arc<dyn EmbeddingService>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            slots: Vec::new(),
            vector_repo,
            embedding_service,
            watermarks: Arc::new(WatermarkStore::new()),
            config,
            shutdown: CancellationToken::new(),
            started: AtomicBool::new(false),
            tasks: Mutex::new(Vec::new()),
        }
    }

    pub fn with_connector(mut self, connector: Arc<dyn SourceConnector>) -> Self {
        self.slots.push(Arc::new(ConnectorSlot::new(connector)));
        self
    }

    pub fn with_watermarks(mut self, watermarks: Arc<WatermarkStore>) -> Self {
        self.watermarks = watermarks;
        self
    }

    pub fn watermarks(&self) -> Arc<WatermarkStore> {
        Arc::clone(&self.watermarks)
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn sources(&self) -> Vec<String> {
        self.slots.iter().map(|s| s.name().to_string()).collect()
    }

    /// Resets the store (when configured), initializes every connector and
    /// spawns one periodic task per connector that initialized successfully.
    ///
    /// Each task runs its first cycle immediately. Calling it again is a
    /// no-op that returns the number of loops already running.
    pub async fn start(self: &Arc<Self>) -> Result<usize, DomainError> {
        if self.started.swap(true, Ordering::SeqCst) {
            warn!("Scheduler already started, ignoring");
            return Ok(self.tasks.lock().await.len());
        }

        if self.config.reset_on_start {
            self.reset_store().await?;
        }

        self.initialize_connectors().await;

        let mut tasks = self.tasks.lock().await;
        for slot in &self.slots {
            if !slot.status.lock().await.enabled {
                continue;
            }
            tasks.push(self.spawn_loop(Arc::clone(slot)));
        }

        info!(
            "Scheduler started: {} of {} connectors every {}s",
            tasks.len(),
            self.slots.len(),
            self.config.interval.as_secs()
        );
        Ok(tasks.len())
    }

    /// Deletes every stored document so entries from removed or disabled
    /// sources do not linger. Every restart therefore rebuilds the store.
    pub async fn reset_store(&self) -> Result<(), DomainError> {
        warn!("Startup reset: deleting all stored documents before the first sync");
        self.vector_repo.delete_all().await
    }

    /// Runs `initialize` on every connector. An auth failure disables only
    /// that connector. Returns the number of enabled connectors.
    pub async fn initialize_connectors(&self) -> usize {
        let mut enabled = 0;
        for slot in &self.slots {
            let result = slot.connector.initialize().await;
            let mut status = slot.status.lock().await;
            match result {
                Ok(()) => {
                    debug!("Initialized connector {}", slot.name());
                    status.enabled = true;
                    status.last_error = None;
                    enabled += 1;
                }
                Err(e) => {
                    error!("Failed to initialize connector {}: {}", slot.name(), e);
                    status.enabled = false;
                    status.last_error = Some(e.to_string());
                }
            }
        }
        enabled
    }

    /// Runs one cycle for `source` now, honouring `cancel`.
    pub async fn trigger(
        &self,
        source: &str,
        cancel: &CancellationToken,
    ) -> Result<SyncOutcome, DomainError> {
        let slot = self
            .slots
            .iter()
            .find(|s| s.name() == source)
            .ok_or_else(|| DomainError::not_found(format!("Unknown source: {}", source)))?;

        if !slot.status.lock().await.enabled {
            return Err(DomainError::invalid_input(format!(
                "Source {} is disabled after failed initialization",
                source
            )));
        }

        self.run_slot(slot, cancel).await
    }

    /// Runs one cycle for every enabled connector concurrently.
    pub async fn run_all_once(
        &self,
        cancel: &CancellationToken,
    ) -> Vec<(String, Result<SyncOutcome, DomainError>)> {
        let mut runs = Vec::new();
        for slot in &self.slots {
            if slot.status.lock().await.enabled {
                runs.push(async move { (slot.name().to_string(), self.run_slot(slot, cancel).await) });
            }
        }
        join_all(runs).await
    }

    pub async fn statuses(&self) -> Vec<ConnectorStatus> {
        let mut statuses = Vec::with_capacity(self.slots.len());
        for slot in &self.slots {
            let mut status = slot.status.lock().await.clone();
            status.watermark = self.watermarks.get(slot.name()).await;
            statuses.push(status);
        }
        statuses
    }

    /// Stops every periodic task and waits for it to finish.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        let tasks: Vec<JoinHandle<()>> = self.tasks.lock().await.drain(..).collect();
        for task in tasks {
            if let Err(e) = task.await {
                warn!("Sync task ended abnormally: {}", e);
            }
        }
        info!("Scheduler stopped");
    }

    fn spawn_loop(self: &Arc<Self>, slot: Arc<ConnectorSlot>) -> JoinHandle<()> {
        let scheduler = Arc::clone(self);
        let token = self.shutdown.child_token();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(scheduler.config.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        // Errors are recorded in the connector status and retried next tick
                        let _ = scheduler.run_slot(&slot, &token).await;
                    }
                }
            }
            debug!("Sync loop for {} stopped", slot.name());
        })
    }

    async fn run_slot(
        &self,
        slot: &ConnectorSlot,
        cancel: &CancellationToken,
    ) -> Result<SyncOutcome, DomainError> {
        let Ok(_guard) = slot.in_flight.try_lock() else {
            debug!("Sync for {} already in flight, skipping", slot.name());
            return Ok(SyncOutcome::AlreadyRunning);
        };

        let start_time = Instant::now();
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(DomainError::cancelled(format!("sync of {}", slot.name()))),
            result = self.run_cycle(slot) => result,
        };

        match &result {
            Ok(outcome) => info!(
                "Sync of {} finished in {:.2}s: {}",
                slot.name(),
                start_time.elapsed().as_secs_f64(),
                outcome.summary()
            ),
            Err(e) => warn!("Sync of {} aborted: {}", slot.name(), e),
        }

        let mut status = slot.status.lock().await;
        status.phase = SyncPhase::Idle;
        status.last_run = Some(Utc::now());
        match &result {
            Ok(outcome) => {
                status.last_outcome = Some(outcome.clone());
                status.last_error = None;
            }
            Err(e) => status.last_error = Some(e.to_string()),
        }

        result
    }

    async fn run_cycle(&self, slot: &ConnectorSlot) -> Result<SyncOutcome, DomainError> {
        let name = slot.name();
        let since = self.watermarks.since(name).await;
        // Taken before fetching so documents created mid-fetch are picked up next time
        let fetch_started = Utc::now();

        slot.set_phase(SyncPhase::Fetching).await;
        info!("Fetching {} since {}", name, since.to_rfc3339());
        let documents = slot.connector.fetch(since).await?;
        info!("Found {} documents from {}", documents.len(), name);

        if documents.is_empty() {
            return Ok(SyncOutcome::Empty);
        }

        slot.set_phase(SyncPhase::Embedding).await;
        let vectors = self.embedding_service.embed_batch(&documents).await?;
        if vectors.len() != documents.len() {
            return Err(DomainError::embedding(format!(
                "Expected {} embeddings for {}, got {}",
                documents.len(),
                name,
                vectors.len()
            )));
        }
        debug!("Created {} embeddings for {}", vectors.len(), name);

        slot.set_phase(SyncPhase::Storing).await;
        self.vector_repo.store(&documents, &vectors).await?;
        debug!("Stored {} documents for {}", documents.len(), name);

        let watermark = self.watermarks.advance(name, fetch_started).await;

        Ok(SyncOutcome::Stored {
            documents: documents.len(),
            watermark,
        })
    }
}
