use async_trait::async_trait;
use scraper::Selector;
use std::sync::OnceLock;
use tracing::info;

use super::settings::ModuleSettings;
use super::traits::{AnyError, ScrapeModule};
use crate::response::ResponseEnvelope;

static TITLE: OnceLock<Selector> = OnceLock::new();

fn title_selector() -> &'static Selector {
    TITLE.get_or_init(|| Selector::parse("title").expect("static selector is valid"))
}

/// Built-in module that fetches each target once and logs what came back.
///
/// Used by the CLI `probe` subcommand and as a reference implementation of
/// the module contract.
#[derive(Debug, Default)]
pub struct ProbeModule {
    settings: ModuleSettings,
    targets: Vec<String>,
    pages: usize,
}

impl ProbeModule {
    pub fn new(settings: ModuleSettings, targets: Vec<String>) -> Self {
        Self {
            settings,
            targets,
            pages: 0,
        }
    }
}

#[async_trait]
impl ScrapeModule for ProbeModule {
    fn targets(&self) -> Vec<String> {
        self.targets.clone()
    }

    fn settings(&self) -> &ModuleSettings {
        &self.settings
    }

    async fn handle(&mut self, response: ResponseEnvelope) -> Result<(), AnyError> {
        self.pages += 1;

        if let Some(document) = response.html() {
            let title: String = document
                .select(title_selector())
                .next()
                .map(|element| element.text().collect())
                .unwrap_or_default();
            info!(
                status = response.status_code(),
                title = %title.trim(),
                "Fetched HTML page"
            );
        } else if response.json().is_some() {
            info!(
                status = response.status_code(),
                bytes = response.content().len(),
                "Fetched JSON document"
            );
        } else {
            info!(
                status = response.status_code(),
                bytes = response.content().len(),
                "Fetched response"
            );
        }

        Ok(())
    }

    async fn after_success(&mut self) {
        info!(pages = self.pages, "Probe finished");
    }
}
