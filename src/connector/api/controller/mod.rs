pub mod ask_controller;
pub mod purge_controller;
pub mod search_controller;
pub mod stats_controller;
pub mod sync_controller;

use std::time::Duration;

use tokio_util::sync::CancellationToken;

pub use ask_controller::AskController;
pub use purge_controller::PurgeController;
pub use search_controller::SearchController;
pub use stats_controller::StatsController;
pub use sync_controller::SyncController;

/// A token that cancels itself once `timeout` elapses.
pub(crate) fn cancel_after(timeout: Duration) -> CancellationToken {
    let token = CancellationToken::new();
    let timer = token.clone();
    tokio::spawn(async move {
        tokio::select! {
            _ = tokio::time::sleep(timeout) => timer.cancel(),
            _ = timer.cancelled() => {}
        }
    });
    token
}
