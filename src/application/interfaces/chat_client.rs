use async_trait::async_trait;

use crate::domain::DomainError;

/// An interface for sending chat-style prompts to an LLM and receiving text responses.
///
/// Implementors encapsulate transport, serialization, and vendor-specific API
/// details. Consumers such as [`crate::AskQuestionUseCase`] stay decoupled from
/// any particular provider or HTTP client library.
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Send a `system` instruction followed by a `user` message and return
    /// every candidate completion, best first.
    async fn complete(&self, system: &str, user: &str) -> Result<Vec<String>, DomainError>;
}
