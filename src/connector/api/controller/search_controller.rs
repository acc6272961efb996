use anyhow::Result;

use crate::SearchResult;

use super::super::Container;

pub struct SearchController<'a> {
    container: &'a Container,
}

impl<'a> SearchController<'a> {
    pub fn new(container: &'a Container) -> Self {
        Self { container }
    }

    pub async fn search(&self, query: String, num: usize) -> Result<String> {
        let use_case = self.container.search_use_case();
        let results = use_case.execute(&query, num).await?;

        Ok(self.format_search_results(&results))
    }

    fn format_search_results(&self, results: &[SearchResult]) -> String {
        if results.is_empty() {
            return "No results found.".to_string();
        }

        let mut output = format!("Found {} results:\n\n", results.len());

        for (i, result) in results.iter().enumerate() {
            output.push_str(&format!("{}. {}\n", i + 1, result.display_line()));
            output.push_str(&format!(
                "   {}\n",
                result.document().timestamp().format("%Y-%m-%d %H:%M:%S")
            ));

            let preview: String = result
                .document()
                .content()
                .lines()
                .take(10)
                .map(|l| format!("   | {}", l))
                .collect::<Vec<_>>()
                .join("\n");
            output.push_str(&preview);
            output.push_str("\n\n");
        }

        output
    }
}
