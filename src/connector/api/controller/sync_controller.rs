use std::time::Duration;

use anyhow::{bail, Result};

use crate::{DomainError, SyncOutcome};

use super::super::Container;
use super::cancel_after;

pub struct SyncController<'a> {
    container: &'a Container,
}

impl<'a> SyncController<'a> {
    pub fn new(container: &'a Container) -> Self {
        Self { container }
    }

    /// Runs one cycle for `source`, or for every connector when `None`.
    pub async fn sync(&self, source: Option<String>, timeout_secs: u64) -> Result<String> {
        let scheduler = self.container.scheduler();
        if scheduler.sources().is_empty() {
            bail!("No connectors configured (set TODOIST_TOKEN to enable Todoist)");
        }

        scheduler.initialize_connectors().await;

        let token = cancel_after(Duration::from_secs(timeout_secs));
        let _guard = token.clone().drop_guard();

        let results = match source {
            Some(source) => {
                let outcome = scheduler.trigger(&source, &token).await;
                vec![(source, outcome)]
            }
            None => scheduler.run_all_once(&token).await,
        };

        Ok(self.format_results(&results))
    }

    fn format_results(&self, results: &[(String, Result<SyncOutcome, DomainError>)]) -> String {
        if results.is_empty() {
            return "No enabled connectors to sync.".to_string();
        }

        results
            .iter()
            .map(|(source, result)| match result {
                Ok(outcome) => format!("{}: {}", source, outcome.summary()),
                Err(e) => format!("{}: failed: {}", source, e),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
