use anyhow::{bail, Result};

use crate::Commands;

use super::container::Container;
use super::controller::{
    AskController, PurgeController, SearchController, StatsController, SyncController,
};

pub struct Router<'a> {
    ask_controller: AskController<'a>,
    sync_controller: SyncController<'a>,
    search_controller: SearchController<'a>,
    purge_controller: PurgeController<'a>,
    stats_controller: StatsController<'a>,
}

impl<'a> Router<'a> {
    pub fn new(container: &'a Container) -> Self {
        Self {
            ask_controller: AskController::new(container),
            sync_controller: SyncController::new(container),
            search_controller: SearchController::new(container),
            purge_controller: PurgeController::new(container),
            stats_controller: StatsController::new(container),
        }
    }

    pub async fn route(&self, command: Commands) -> Result<String> {
        match command {
            Commands::Ask {
                question,
                timeout_secs,
            } => self.ask_controller.ask(question, timeout_secs).await,
            Commands::Sync {
                source,
                timeout_secs,
            } => self.sync_controller.sync(source, timeout_secs).await,
            Commands::Search { query, num } => self.search_controller.search(query, num).await,
            Commands::Purge { source, all } => self.purge_controller.purge(source, all).await,
            Commands::Stats => self.stats_controller.stats().await,
            Commands::Serve { .. } => bail!("serve is handled by the server, not the router"),
        }
    }
}
