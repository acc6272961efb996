use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::{debug, warn};

use crate::application::{ChatClient, SourceConnector};
use crate::{
    AskQuestionUseCase, DuckdbVectorRepository, EmbeddingConfig, EmbeddingService,
    InMemoryVectorRepository, MockEmbedding, OpenAiChatClient, OpenAiEmbedding,
    PurgeSourceUseCase, SchedulerConfig, SearchDocumentsUseCase, SyncScheduler, TodoistConnector,
    VectorRepository,
};

pub const DATABASE_FILE: &str = "sophia.duckdb";

pub struct ContainerConfig {
    pub data_dir: String,
    pub memory_storage: bool,
    pub mock_embeddings: bool,
    pub dimensions: usize,
    pub batch_size: usize,
    pub top_k: usize,
    pub embedding_model: String,
    pub chat_model: String,
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub todoist_token: Option<String>,
    pub todoist_filter: String,
    pub sync_interval: Duration,
    /// Wipe the store before the scheduler's first cycle.
    pub reset_on_start: bool,
}

pub struct Container {
    embedding_service: Arc<dyn EmbeddingService>,
    vector_repo: Arc<dyn VectorRepository>,
    chat_client: Arc<dyn ChatClient>,
    scheduler: Arc<SyncScheduler>,
    config: ContainerConfig,
}

impl Container {
    pub async fn new(config: ContainerConfig) -> Result<Self> {
        let api_key = config.openai_api_key.clone().unwrap_or_default();
        if api_key.is_empty() {
            warn!("OPENAI_API_KEY is not set; embedding and answer requests will be rejected");
        }

        let embedding_service: Arc<dyn EmbeddingService> = if config.mock_embeddings {
            debug!("Using mock embedding service");
            Arc::new(MockEmbedding::with_dimensions(config.dimensions))
        } else {
            debug!(
                "Using OpenAI embeddings ({}) at {}",
                config.embedding_model, config.openai_base_url
            );
            let embedding_config =
                EmbeddingConfig::new(&config.embedding_model, config.dimensions, config.batch_size);
            Arc::new(OpenAiEmbedding::new(
                api_key.clone(),
                &config.openai_base_url,
                embedding_config,
            )?)
        };

        let vector_repo: Arc<dyn VectorRepository> = if config.memory_storage {
            debug!("Using in-memory vector storage");
            Arc::new(InMemoryVectorRepository::new(config.dimensions))
        } else {
            std::fs::create_dir_all(&config.data_dir)?;
            let db_path = PathBuf::from(&config.data_dir).join(DATABASE_FILE);
            match DuckdbVectorRepository::new(&db_path, config.dimensions) {
                Ok(duckdb) => {
                    debug!("Using DuckDB vector storage at {:?}", db_path);
                    Arc::new(duckdb)
                }
                Err(e) => {
                    warn!(
                        "Failed to initialize DuckDB ({}): {}. Falling back to in-memory storage.",
                        db_path.display(),
                        e
                    );
                    Arc::new(InMemoryVectorRepository::new(config.dimensions))
                }
            }
        };
        vector_repo.initialize().await?;

        let chat_client: Arc<dyn ChatClient> = Arc::new(OpenAiChatClient::new(
            api_key,
            &config.openai_base_url,
            &config.chat_model,
        )?);

        let mut scheduler = SyncScheduler::new(
            vector_repo.clone(),
            embedding_service.clone(),
            SchedulerConfig::new(config.sync_interval).with_reset_on_start(config.reset_on_start),
        );
        for connector in Self::connectors(&config) {
            debug!("Registering connector {}", connector.name());
            scheduler = scheduler.with_connector(connector);
        }

        Ok(Self {
            embedding_service,
            vector_repo,
            chat_client,
            scheduler: Arc::new(scheduler),
            config,
        })
    }

    fn connectors(config: &ContainerConfig) -> Vec<Arc<dyn SourceConnector>> {
        let mut connectors: Vec<Arc<dyn SourceConnector>> = Vec::new();

        match config.todoist_token.as_deref() {
            Some(token) => connectors.push(Arc::new(TodoistConnector::new(
                token,
                &config.todoist_filter,
            ))),
            None => debug!("TODOIST_TOKEN not set, skipping Todoist connector"),
        }

        connectors
    }

    pub fn ask_use_case(&self) -> AskQuestionUseCase {
        AskQuestionUseCase::new(
            self.vector_repo.clone(),
            self.embedding_service.clone(),
            self.chat_client.clone(),
        )
        .with_top_k(self.config.top_k)
    }

    pub fn search_use_case(&self) -> SearchDocumentsUseCase {
        SearchDocumentsUseCase::new(self.vector_repo.clone(), self.embedding_service.clone())
    }

    pub fn purge_use_case(&self) -> PurgeSourceUseCase {
        PurgeSourceUseCase::new(self.vector_repo.clone())
    }

    pub fn scheduler(&self) -> Arc<SyncScheduler> {
        self.scheduler.clone()
    }

    pub fn vector_repo(&self) -> Arc<dyn VectorRepository> {
        self.vector_repo.clone()
    }

    pub fn data_dir(&self) -> &str {
        &self.config.data_dir
    }

    pub fn memory_storage(&self) -> bool {
        self.config.memory_storage
    }

    pub fn embedding_model(&self) -> &str {
        self.embedding_service.config().model_name()
    }
}
