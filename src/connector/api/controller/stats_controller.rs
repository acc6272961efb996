use anyhow::Result;

use crate::ConnectorStatus;

use super::super::Container;

pub struct StatsController<'a> {
    container: &'a Container,
}

impl<'a> StatsController<'a> {
    pub fn new(container: &'a Container) -> Self {
        Self { container }
    }

    pub async fn stats(&self) -> Result<String> {
        let documents = self.container.vector_repo().count().await?;
        let statuses = self.container.scheduler().statuses().await;
        Ok(self.format_stats(documents, &statuses))
    }

    fn format_stats(&self, documents: u64, statuses: &[ConnectorStatus]) -> String {
        let storage = if self.container.memory_storage() {
            "memory"
        } else {
            "duckdb"
        };
        let connectors = if statuses.is_empty() {
            "(none)".to_string()
        } else {
            statuses
                .iter()
                .map(|s| s.source.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        };

        format!(
            "Sophia Statistics\n=================\nDocuments:  {}\nConnectors: {}\nEmbeddings: {}\nStorage:    {}\nData Dir:   {}",
            documents,
            connectors,
            self.container.embedding_model(),
            storage,
            self.container.data_dir()
        )
    }
}
