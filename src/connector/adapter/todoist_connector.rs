use std::fmt::Write as _;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::application::SourceConnector;
use crate::domain::{Document, DomainError};

pub const TODOIST_API_URL: &str = "https://api.todoist.com/rest/v2";
pub const DEFAULT_TODOIST_FILTER: &str = "today | overdue";
const SOURCE_NAME: &str = "todoist";

#[derive(Debug, Deserialize)]
struct TodoistTask {
    id: String,
    content: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    project_id: Option<String>,
    #[serde(default)]
    project_name: Option<String>,
    #[serde(default)]
    priority: i32,
    #[serde(default)]
    due: Option<DueDate>,
    #[serde(default)]
    url: Option<String>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DueDate {
    #[serde(default)]
    date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    datetime: Option<String>,
}

impl DueDate {
    fn display(&self) -> &str {
        match self.datetime.as_deref() {
            Some(datetime) if !datetime.is_empty() => datetime,
            _ => &self.date,
        }
    }
}

/// Pulls tasks matching a filter from the Todoist REST API.
pub struct TodoistConnector {
    client: reqwest::Client,
    token: String,
    filter: String,
    base_url: String,
}

impl TodoistConnector {
    pub fn new(token: impl Into<String>, filter: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
            token: token.into(),
            filter: filter.into(),
            base_url: TODOIST_API_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn task_to_document(task: TodoistTask) -> Document {
        let mut content = format!("Task: {}\n", task.content);
        if !task.description.is_empty() {
            let _ = writeln!(content, "Description: {}", task.description);
        }
        if task.priority != 0 {
            let _ = writeln!(
                content,
                "Priority (higher is more important): {}",
                task.priority
            );
        }
        if let Some(due) = &task.due {
            let _ = writeln!(content, "Due: {}", due.display());
        }

        let due = task
            .due
            .as_ref()
            .and_then(|d| serde_json::to_value(d).ok())
            .unwrap_or(Value::Null);

        // Prefixed so task ids cannot collide with another source's ids
        let mut document = Document::new(
            format!("{}-{}", SOURCE_NAME, task.id),
            content,
            SOURCE_NAME,
            task.created_at,
        )
        .with_title(task.content)
        .with_metadata("project_id", task.project_id.unwrap_or_default())
        .with_metadata("project_name", task.project_name.unwrap_or_default())
        .with_metadata("due", due);

        if let Some(url) = task.url.filter(|u| !u.is_empty()) {
            document = document.with_url(url);
        }
        document
    }
}

#[async_trait]
impl SourceConnector for TodoistConnector {
    fn name(&self) -> &str {
        SOURCE_NAME
    }

    async fn initialize(&self) -> Result<(), DomainError> {
        if self.token.trim().is_empty() {
            return Err(DomainError::auth("Todoist token is empty"));
        }
        Ok(())
    }

    /// Returns every task matching the filter on each call. The filter is
    /// keyed on due dates and tasks change after creation, so `since` is not
    /// applied; the store's upsert absorbs the repeats.
    async fn fetch(&self, _since: DateTime<Utc>) -> Result<Vec<Document>, DomainError> {
        let response = self
            .client
            .get(format!("{}/tasks", self.base_url))
            .query(&[("filter", self.filter.as_str())])
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| DomainError::fetch(format!("Failed to fetch tasks: {}", e)))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(DomainError::auth(format!("Todoist rejected the token: {}", status)));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DomainError::fetch(format!(
                "Failed to fetch tasks: {}: {}",
                status, body
            )));
        }

        let tasks: Vec<TodoistTask> = response
            .json()
            .await
            .map_err(|e| DomainError::fetch(format!("Failed to decode tasks: {}", e)))?;

        let documents: Vec<Document> = tasks.into_iter().map(Self::task_to_document).collect();

        debug!("Todoist returned {} tasks matching {:?}", documents.len(), self.filter);
        Ok(documents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(json: &str) -> TodoistTask {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_task_content_lines() {
        let doc = TodoistConnector::task_to_document(task(
            r#"{
                "id": "123",
                "content": "Pay rent",
                "description": "Transfer to landlord",
                "project_id": "p1",
                "project_name": "Home",
                "priority": 4,
                "due": {"date": "2024-03-01", "datetime": "2024-03-01T09:00:00Z"},
                "url": "https://todoist.com/showTask?id=123",
                "created_at": "2024-02-20T10:00:00Z"
            }"#,
        ));

        assert_eq!(doc.id(), "todoist-123");
        assert_eq!(doc.source(), "todoist");
        assert_eq!(doc.title(), Some("Pay rent"));
        assert_eq!(doc.url(), Some("https://todoist.com/showTask?id=123"));
        assert_eq!(
            doc.content(),
            "Task: Pay rent\n\
             Description: Transfer to landlord\n\
             Priority (higher is more important): 4\n\
             Due: 2024-03-01T09:00:00Z\n"
        );
        assert_eq!(doc.metadata()["project_name"], "Home");
        assert_eq!(doc.metadata()["due"]["date"], "2024-03-01");
    }

    #[test]
    fn test_minimal_task() {
        let doc = TodoistConnector::task_to_document(task(
            r#"{"id": "9", "content": "Call mom", "created_at": "2024-02-20T10:00:00Z"}"#,
        ));

        assert_eq!(doc.content(), "Task: Call mom\n");
        assert_eq!(doc.url(), None);
        assert_eq!(doc.metadata()["due"], Value::Null);
    }

    #[test]
    fn test_due_falls_back_to_date() {
        let doc = TodoistConnector::task_to_document(task(
            r#"{"id": "9", "content": "Gym", "due": {"date": "2024-05-02"}, "created_at": "2024-02-20T10:00:00Z"}"#,
        ));
        assert!(doc.content().ends_with("Due: 2024-05-02\n"));
    }

    #[tokio::test]
    async fn test_empty_token_fails_initialization() {
        let connector = TodoistConnector::new("  ", DEFAULT_TODOIST_FILTER);
        let err = connector.initialize().await.unwrap_err();
        assert!(err.is_auth_error());
    }
}
