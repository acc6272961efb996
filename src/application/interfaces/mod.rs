mod chat_client;
mod embedding_service;
mod source_connector;
mod vector_repository;

pub use chat_client::*;
pub use embedding_service::*;
pub use source_connector::*;
pub use vector_repository::*;
