use std::time::Duration;

use anyhow::Result;

use super::super::Container;
use super::cancel_after;

pub struct AskController<'a> {
    container: &'a Container,
}

impl<'a> AskController<'a> {
    pub fn new(container: &'a Container) -> Self {
        Self { container }
    }

    pub async fn ask(&self, question: String, timeout_secs: u64) -> Result<String> {
        let token = cancel_after(Duration::from_secs(timeout_secs));
        let _guard = token.clone().drop_guard();

        let use_case = self.container.ask_use_case();
        let answer = use_case.ask_with_cancel(&question, &token).await?;
        Ok(answer)
    }
}
