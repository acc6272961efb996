mod duckdb_vector_repository;
mod in_memory_vector_repository;
mod mock_embedding;
mod openai_chat_client;
mod openai_embedding;
mod todoist_connector;

pub use duckdb_vector_repository::*;
pub use in_memory_vector_repository::*;
pub use mock_embedding::*;
pub use openai_chat_client::*;
pub use openai_embedding::*;
pub use todoist_connector::*;
