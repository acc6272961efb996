use clap::Subcommand;

#[derive(Subcommand)]
pub enum Commands {
    /// Run the sync scheduler and the HTTP query server
    Serve {
        #[arg(long, default_value = "127.0.0.1:8080")]
        bind: String,
    },

    /// Answer a question from the stored documents
    Ask {
        question: String,

        #[arg(long, default_value = "120")]
        timeout_secs: u64,
    },

    /// Run one sync cycle now
    Sync {
        /// Only sync this connector
        #[arg(short, long)]
        source: Option<String>,

        #[arg(long, default_value = "600")]
        timeout_secs: u64,
    },

    Search {
        query: String,

        #[arg(long, default_value = "10")]
        num: usize,
    },

    /// Delete stored documents for one source, or everything with --all
    Purge {
        #[arg(required_unless_present = "all")]
        source: Option<String>,

        #[arg(long, conflicts_with = "source")]
        all: bool,
    },

    Stats,
}
