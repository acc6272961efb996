use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use sophia::{
    AskQuestionUseCase, ChatClient, Document, DomainError, EmbeddingService,
    InMemoryVectorRepository, MockEmbedding, SearchResult, VectorRepository, SYSTEM_PROMPT,
};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

const DIM: usize = 16;

/// Records every prompt and replies from a fixed script.
struct StubChat {
    reply: Result<Vec<String>, String>,
    delay: Option<Duration>,
    prompts: Mutex<Vec<(String, String)>>,
}

impl StubChat {
    fn answering(choices: &[&str]) -> Self {
        Self {
            reply: Ok(choices.iter().map(|c| c.to_string()).collect()),
            delay: None,
            prompts: Mutex::new(Vec::new()),
        }
    }

    fn failing(message: &str) -> Self {
        Self {
            reply: Err(message.to_string()),
            delay: None,
            prompts: Mutex::new(Vec::new()),
        }
    }

    fn slow(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    async fn last_user_prompt(&self) -> String {
        self.prompts
            .lock()
            .await
            .last()
            .map(|(_, user)| user.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ChatClient for StubChat {
    async fn complete(&self, system: &str, user: &str) -> Result<Vec<String>, DomainError> {
        self.prompts
            .lock()
            .await
            .push((system.to_string(), user.to_string()));
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.reply.clone().map_err(DomainError::generation)
    }
}

/// A store whose search always fails.
struct BrokenStore;

#[async_trait]
impl VectorRepository for BrokenStore {
    async fn initialize(&self) -> Result<(), DomainError> {
        Ok(())
    }

    async fn store(&self, _: &[Document], _: &[Vec<f32>]) -> Result<(), DomainError> {
        Ok(())
    }

    async fn search(&self, _: &[f32], _: usize) -> Result<Vec<SearchResult>, DomainError> {
        Err(DomainError::storage("database is locked"))
    }

    async fn delete_by_source(&self, _: &str) -> Result<(), DomainError> {
        Ok(())
    }

    async fn delete_all(&self) -> Result<(), DomainError> {
        Ok(())
    }

    async fn count(&self) -> Result<u64, DomainError> {
        Ok(0)
    }

    fn dimensions(&self) -> usize {
        DIM
    }
}

async fn seeded_store(embedding: &MockEmbedding, count: usize) -> Arc<InMemoryVectorRepository> {
    let repo = Arc::new(InMemoryVectorRepository::new(DIM));
    let documents: Vec<Document> = (0..count)
        .map(|i| {
            Document::new(
                format!("todoist-{}", i),
                format!("Task: errand number {}", i),
                "todoist",
                Utc::now(),
            )
        })
        .collect();
    let vectors = embedding.embed_batch(&documents).await.unwrap();
    repo.store(&documents, &vectors).await.unwrap();
    repo
}

#[tokio::test]
async fn ask_returns_first_choice_verbatim() {
    let embedding = Arc::new(MockEmbedding::with_dimensions(DIM));
    let repo = seeded_store(&embedding, 3).await;
    let chat = Arc::new(StubChat::answering(&["  Pay rent on Friday.\n", "ignored"]));

    let use_case = AskQuestionUseCase::new(repo, embedding, chat.clone());
    let answer = use_case.ask("What should I do this week?").await.unwrap();

    assert_eq!(answer, "  Pay rent on Friday.\n");

    let prompts = chat.prompts.lock().await;
    assert_eq!(prompts.len(), 1);
    assert_eq!(prompts[0].0, SYSTEM_PROMPT);
    assert!(prompts[0]
        .1
        .starts_with("Question: What should I do this week?\n\nRelevant Context:\n"));
    assert!(prompts[0]
        .1
        .ends_with("\nPlease provide a response based on the above context."));
}

#[tokio::test]
async fn ask_places_exact_match_first_in_context() {
    let embedding = Arc::new(MockEmbedding::with_dimensions(DIM));
    let repo = seeded_store(&embedding, 5).await;
    let chat = Arc::new(StubChat::answering(&["ok"]));

    let use_case = AskQuestionUseCase::new(repo, embedding, chat.clone());
    use_case.ask("Task: errand number 3").await.unwrap();

    let prompt = chat.last_user_prompt().await;
    assert!(prompt.contains("\n1. From todoist ("));
    let first_entry = prompt.split("\n1. From todoist (").nth(1).unwrap();
    assert!(first_entry
        .lines()
        .nth(1)
        .is_some_and(|line| line == "Task: errand number 3"));
}

#[tokio::test]
async fn ask_limits_context_to_top_k() {
    let embedding = Arc::new(MockEmbedding::with_dimensions(DIM));
    let repo = seeded_store(&embedding, 30).await;
    let chat = Arc::new(StubChat::answering(&["ok"]));

    let use_case = AskQuestionUseCase::new(repo.clone(), embedding.clone(), chat.clone());
    assert_eq!(use_case.top_k(), 25);
    use_case.ask("errands").await.unwrap();
    let prompt = chat.last_user_prompt().await;
    assert!(prompt.contains("\n25. From todoist"));
    assert!(!prompt.contains("\n26. From todoist"));

    let narrow = AskQuestionUseCase::new(repo, embedding, chat.clone()).with_top_k(2);
    narrow.ask("errands").await.unwrap();
    let prompt = chat.last_user_prompt().await;
    assert!(prompt.contains("\n2. From todoist"));
    assert!(!prompt.contains("\n3. From todoist"));
}

#[tokio::test]
async fn ask_with_empty_store_still_calls_model() {
    let embedding = Arc::new(MockEmbedding::with_dimensions(DIM));
    let repo = Arc::new(InMemoryVectorRepository::new(DIM));
    let chat = Arc::new(StubChat::answering(&["I don't know."]));

    let use_case = AskQuestionUseCase::new(repo, embedding, chat.clone());
    let answer = use_case.ask("Anything?").await.unwrap();

    assert_eq!(answer, "I don't know.");
    assert_eq!(
        chat.last_user_prompt().await,
        "Question: Anything?\n\nRelevant Context:\n\nPlease provide a response based on the above context."
    );
}

#[tokio::test]
async fn ask_without_choices_is_generation_error() {
    let embedding = Arc::new(MockEmbedding::with_dimensions(DIM));
    let repo = seeded_store(&embedding, 1).await;
    let chat = Arc::new(StubChat::answering(&[]));

    let use_case = AskQuestionUseCase::new(repo, embedding, chat);
    let err = use_case.ask("Hello?").await.unwrap_err();

    assert!(err.is_generation_error());
}

#[tokio::test]
async fn ask_chat_failure_is_generation_error() {
    let embedding = Arc::new(MockEmbedding::with_dimensions(DIM));
    let repo = seeded_store(&embedding, 1).await;
    let chat = Arc::new(StubChat::failing("API returned 500"));

    let use_case = AskQuestionUseCase::new(repo, embedding, chat);
    let err = use_case.ask("Hello?").await.unwrap_err();

    assert!(err.is_generation_error());
    assert!(err.to_string().contains("500"));
}

#[tokio::test]
async fn ask_search_failure_is_retrieval_error_and_skips_model() {
    let embedding = Arc::new(MockEmbedding::with_dimensions(DIM));
    let chat = Arc::new(StubChat::answering(&["never"]));

    let use_case = AskQuestionUseCase::new(Arc::new(BrokenStore), embedding, chat.clone());
    let err = use_case.ask("Hello?").await.unwrap_err();

    assert!(err.is_retrieval_error());
    assert!(chat.prompts.lock().await.is_empty());
}

#[tokio::test]
async fn ask_rejects_blank_question() {
    let embedding = Arc::new(MockEmbedding::with_dimensions(DIM));
    let repo = Arc::new(InMemoryVectorRepository::new(DIM));
    let chat = Arc::new(StubChat::answering(&["never"]));

    let use_case = AskQuestionUseCase::new(repo, embedding, chat.clone());
    let err = use_case.ask("   ").await.unwrap_err();

    assert!(matches!(err, DomainError::InvalidInput(_)));
    assert!(chat.prompts.lock().await.is_empty());
}

#[tokio::test]
async fn ask_with_cancel_stops_waiting_on_slow_model() {
    let embedding = Arc::new(MockEmbedding::with_dimensions(DIM));
    let repo = seeded_store(&embedding, 2).await;
    let chat = Arc::new(StubChat::answering(&["too late"]).slow(Duration::from_secs(30)));

    let use_case = AskQuestionUseCase::new(repo, embedding, chat);
    let token = CancellationToken::new();
    let canceller = {
        let token = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            token.cancel();
        })
    };

    let err = tokio::time::timeout(
        Duration::from_secs(5),
        use_case.ask_with_cancel("Hello?", &token),
    )
    .await
    .expect("cancellation should end the call")
    .unwrap_err();
    canceller.await.unwrap();

    assert!(err.is_cancelled());
}
