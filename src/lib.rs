pub mod application;
pub mod cli;
pub mod connector;
pub mod domain;

pub use application::{
    AskQuestionUseCase, ChatClient, EmbeddingService, PurgeSourceUseCase, SchedulerConfig,
    SearchDocumentsUseCase, SourceConnector, SyncScheduler, VectorRepository, WatermarkStore,
    DEFAULT_TOP_K, SYSTEM_PROMPT,
};

pub use cli::Commands;

pub use connector::{
    Container, ContainerConfig, DuckdbVectorRepository, InMemoryVectorRepository, MockEmbedding,
    OpenAiChatClient, OpenAiEmbedding, Router, TodoistConnector,
};

pub use domain::{
    cosine_similarity, ConnectorStatus, Document, DomainError, EmbeddingConfig, SearchResult,
    SyncOutcome, SyncPhase,
};
