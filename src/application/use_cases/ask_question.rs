use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::application::{ChatClient, EmbeddingService, VectorRepository};
use crate::domain::{DomainError, SearchResult};

/// Number of retrieved documents placed in the grounding prompt.
pub const DEFAULT_TOP_K: usize = 25;

pub const SYSTEM_PROMPT: &str = "You are a helpful assistant with access to the user's personal information. Use the context provided to give accurate and relevant answers.";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Assembles the user message sent alongside [`SYSTEM_PROMPT`].
///
/// Results are enumerated in the order given, starting at 1.
pub fn build_prompt(question: &str, results: &[SearchResult]) -> String {
    let mut prompt = format!("Question: {}\n\nRelevant Context:\n", question);

    for (i, result) in results.iter().enumerate() {
        let doc = result.document();
        let _ = write!(
            prompt,
            "\n{}. From {} ({}):\n{}\n",
            i + 1,
            doc.source(),
            doc.timestamp().format(TIMESTAMP_FORMAT),
            doc.content()
        );
    }

    prompt.push_str("\nPlease provide a response based on the above context.");
    prompt
}

/// Retrieval-augmented question answering over the stored documents.
///
/// Failures before generation surface as [`DomainError::RetrievalError`] and
/// failures of the chat call as [`DomainError::GenerationError`]. No fallback
/// answer is ever produced.
pub struct AskQuestionUseCase {
    vector_repo: Arc<dyn VectorRepository>,
    embedding_service: Arc<dyn EmbeddingService>,
    chat_client: Arc<dyn ChatClient>,
    top_k: usize,
}

impl AskQuestionUseCase {
    pub fn new(
        vector_repo: Arc<dyn VectorRepository>,
        embedding_service: Arc<dyn EmbeddingService>,
        chat_client: Arc<dyn ChatClient>,
    ) -> Self {
        Self {
            vector_repo,
            embedding_service,
            chat_client,
            top_k: DEFAULT_TOP_K,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    pub async fn ask(&self, question: &str) -> Result<String, DomainError> {
        if question.trim().is_empty() {
            return Err(DomainError::invalid_input("Question must not be empty"));
        }

        info!("Answering question: {}", question);
        let start_time = Instant::now();

        let results = self.retrieve(question).await?;
        debug!("Retrieved {} context documents", results.len());

        let prompt = build_prompt(question, &results);
        let answer = self.generate(&prompt).await?;

        info!(
            "Answered in {:.2}s using {} documents",
            start_time.elapsed().as_secs_f64(),
            results.len()
        );

        Ok(answer)
    }

    /// Like [`ask`](Self::ask), but returns [`DomainError::Cancelled`] as soon
    /// as `cancel` fires. Asking never writes, so nothing needs undoing.
    pub async fn ask_with_cancel(
        &self,
        question: &str,
        cancel: &CancellationToken,
    ) -> Result<String, DomainError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(DomainError::cancelled("ask")),
            answer = self.ask(question) => answer,
        }
    }

    async fn retrieve(&self, question: &str) -> Result<Vec<SearchResult>, DomainError> {
        let query_vector = self
            .embedding_service
            .embed_query(question)
            .await
            .map_err(|e| DomainError::retrieval(format!("failed to embed question: {}", e)))?;

        self.vector_repo
            .search(&query_vector, self.top_k)
            .await
            .map_err(|e| DomainError::retrieval(format!("failed to search documents: {}", e)))
    }

    async fn generate(&self, prompt: &str) -> Result<String, DomainError> {
        let choices = self
            .chat_client
            .complete(SYSTEM_PROMPT, prompt)
            .await
            .map_err(|e| match e {
                DomainError::GenerationError(_) => e,
                other => DomainError::generation(other.to_string()),
            })?;

        choices
            .into_iter()
            .next()
            .ok_or_else(|| DomainError::generation("no completion choices returned"))
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::domain::Document;

    fn result(id: &str, source: &str, content: &str, hour: u32) -> SearchResult {
        let ts = Utc.with_ymd_and_hms(2024, 3, 9, hour, 5, 7).unwrap();
        SearchResult::new(Document::new(id, content, source, ts), 0.5)
    }

    #[test]
    fn test_prompt_without_context() {
        assert_eq!(
            build_prompt("What's due?", &[]),
            "Question: What's due?\n\nRelevant Context:\n\nPlease provide a response based on the above context."
        );
    }

    #[test]
    fn test_prompt_enumerates_results_in_rank_order() {
        let results = vec![
            result("t1", "todoist", "Task: Pay rent", 9),
            result("m1", "gmail", "Landlord reminder", 14),
        ];

        let prompt = build_prompt("When is rent due?", &results);

        assert_eq!(
            prompt,
            "Question: When is rent due?\n\nRelevant Context:\n\
             \n1. From todoist (2024-03-09 09:05:07):\nTask: Pay rent\n\
             \n2. From gmail (2024-03-09 14:05:07):\nLandlord reminder\n\
             \nPlease provide a response based on the above context."
        );
    }

    #[test]
    fn test_prompt_is_deterministic() {
        let results = vec![result("a", "slack", "hello", 1)];
        assert_eq!(build_prompt("q", &results), build_prompt("q", &results));
    }
}
