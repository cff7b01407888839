use async_trait::async_trait;

use super::settings::ModuleSettings;
use crate::engine::RunError;
use crate::response::ResponseEnvelope;
use crate::services::Services;

/// Errors surfaced by module code.
pub type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Contract every scrape module satisfies.
///
/// The engine creates a fresh instance per run, calls [`init`] once, then
/// [`handle`] once per fetched target in target order, then exactly one of
/// [`after_success`]/[`after_failure`], then [`close`]. Nothing else runs
/// concurrently with the module while it executes.
///
/// [`init`]: ScrapeModule::init
/// [`handle`]: ScrapeModule::handle
/// [`after_success`]: ScrapeModule::after_success
/// [`after_failure`]: ScrapeModule::after_failure
/// [`close`]: ScrapeModule::close
#[async_trait]
pub trait ScrapeModule: Send + Sync {
    /// Target path fragments, fetched in order. Each is appended to the
    /// settings' base URL to form a request URL.
    fn targets(&self) -> Vec<String>;

    /// Per-module settings, established at construction or during `init`.
    fn settings(&self) -> &ModuleSettings;

    /// Optional setup before any target is fetched.
    async fn init(&mut self, _services: &Services) -> Result<(), AnyError> {
        Ok(())
    }

    /// Handle one fetched target. An error here aborts the whole module run
    /// and is never retried.
    async fn handle(&mut self, response: ResponseEnvelope) -> Result<(), AnyError>;

    /// Runs once after the last target was handled.
    async fn after_success(&mut self) {}

    /// Runs once after the run aborted, with the causing error.
    async fn after_failure(&mut self, _cause: &RunError) {}

    /// Teardown for modules holding scoped resources. Runs exactly once
    /// after the terminal hook, on every exit path.
    async fn close(&mut self) {}
}
