use anyhow::{bail, Result};

use super::super::Container;

pub struct PurgeController<'a> {
    container: &'a Container,
}

impl<'a> PurgeController<'a> {
    pub fn new(container: &'a Container) -> Self {
        Self { container }
    }

    pub async fn purge(&self, source: Option<String>, all: bool) -> Result<String> {
        let use_case = self.container.purge_use_case();

        match (source, all) {
            (_, true) => {
                use_case.purge_all().await?;
                Ok("All documents deleted.".to_string())
            }
            (Some(source), false) => {
                use_case.purge_source(&source).await?;
                Ok(format!("Documents from {} deleted.", source))
            }
            (None, false) => bail!("Specify a source to purge, or --all"),
        }
    }
}
