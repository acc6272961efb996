use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use sophia::connector::api::http;
use sophia::connector::{DEFAULT_OPENAI_BASE_URL, DEFAULT_TODOIST_FILTER};
use sophia::{Commands, Container, ContainerConfig, Router};

#[derive(Parser)]
#[command(name = "sophia")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[arg(short, long, global = true)]
    verbose: bool,

    #[arg(short, long, global = true, default_value = "~/.sophia")]
    data_dir: String,

    #[arg(long, global = true)]
    memory_storage: bool,

    #[arg(long, global = true)]
    mock_embeddings: bool,

    #[arg(long, global = true, default_value = "1536")]
    dimensions: usize,

    #[arg(long, global = true, default_value = "100")]
    batch_size: usize,

    /// Documents retrieved as context for each question
    #[arg(long, global = true, default_value = "25")]
    top_k: usize,

    #[arg(long, global = true, default_value = "text-embedding-ada-002")]
    embedding_model: String,

    #[arg(long, global = true, default_value = "gpt-4o-mini")]
    chat_model: String,

    /// Seconds between sync cycles of each connector
    #[arg(long, global = true, default_value = "3600")]
    interval_secs: u64,

    /// Keep stored documents when the scheduler starts instead of rebuilding
    #[arg(long, global = true)]
    no_reset: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine; the environment may already be set
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = ContainerConfig {
        data_dir: expand_tilde(&cli.data_dir),
        memory_storage: cli.memory_storage,
        mock_embeddings: cli.mock_embeddings,
        dimensions: cli.dimensions,
        batch_size: cli.batch_size,
        top_k: cli.top_k,
        embedding_model: cli.embedding_model,
        chat_model: cli.chat_model,
        openai_api_key: non_empty_env("OPENAI_API_KEY"),
        openai_base_url: non_empty_env("OPENAI_BASE_URL")
            .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
        todoist_token: non_empty_env("TODOIST_TOKEN"),
        todoist_filter: non_empty_env("TODOIST_FILTER")
            .unwrap_or_else(|| DEFAULT_TODOIST_FILTER.to_string()),
        sync_interval: Duration::from_secs(cli.interval_secs.max(1)),
        reset_on_start: !cli.no_reset,
    };

    let container = Container::new(config).await?;

    if let Commands::Serve { bind } = &cli.command {
        return http::serve(&container, bind).await;
    }

    let router = Router::new(&container);
    let output = router.route(cli.command).await?;
    println!("{}", output);

    Ok(())
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn expand_tilde(path: &str) -> String {
    if path == "~" || path.starts_with("~/") {
        if let Some(home) = std::env::var_os("HOME") {
            if path == "~" {
                return home.to_string_lossy().to_string();
            }
            return path.replacen("~", &home.to_string_lossy(), 1);
        }
    }
    path.to_string()
}
