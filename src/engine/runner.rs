//! Per-module execution: fetch, retry, handle, pace

use std::sync::Arc;
use thiserror::Error;
use tokio::time::{Instant, sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use super::backoff::RetryPolicy;
use crate::modules::{AnyError, ModuleSettings, ScrapeModule};
use crate::observability::Metrics;
use crate::response::ResponseEnvelope;
use crate::transport::{TargetRequest, Transport, TransportError};

/// Why a module run aborted. Exactly one of these reaches the module's
/// `after_failure` hook when a run does not succeed.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("module init failed: {0}")]
    Init(AnyError),

    #[error("transport failure after {attempts} attempt(s): {source}")]
    Transport {
        attempts: u32,
        source: TransportError,
    },

    #[error("unacceptable status {status} {reason} after {attempts} attempt(s)")]
    UnacceptableStatus {
        status: u16,
        reason: String,
        attempts: u32,
    },

    #[error("handler failed: {0}")]
    Handler(AnyError),

    #[error("run canceled")]
    Canceled,
}

/// Drives one instantiated module through its targets.
pub(crate) struct ModuleRunner {
    transport: Arc<dyn Transport>,
    retries: u32,
    metrics: Arc<Metrics>,
}

impl ModuleRunner {
    pub(crate) fn new(transport: Arc<dyn Transport>, retries: u32, metrics: Arc<Metrics>) -> Self {
        Self {
            transport,
            retries,
            metrics,
        }
    }

    /// Fetch and handle every target in order, enforcing minimum spacing
    /// between consecutive requests. Spacing is measured from send time, so
    /// handler time counts toward the wait.
    pub(crate) async fn run(
        &self,
        module: &mut dyn ScrapeModule,
        cancel: &CancellationToken,
    ) -> Result<(), RunError> {
        let settings = module.settings().clone();
        let policy = RetryPolicy::from_settings(&settings);
        let targets = module.targets();
        debug!(targets = targets.len(), "Target list enumerated");

        for target in targets {
            if cancel.is_cancelled() {
                return Err(RunError::Canceled);
            }

            let url = format!("{}/{}", settings.base_url(), target);
            let (response, sent_at) = self.fetch(&url, &settings, &policy, cancel).await?;

            module.handle(response).await.map_err(RunError::Handler)?;

            let spacing = policy.spacing();
            let elapsed = sent_at.elapsed();
            if elapsed < spacing {
                sleep(spacing - elapsed).await;
            }
        }

        Ok(())
    }

    /// Fetch one target, retrying per policy within the attempt budget.
    /// Returns the accepted response together with its send instant.
    async fn fetch(
        &self,
        url: &str,
        settings: &ModuleSettings,
        policy: &RetryPolicy,
        cancel: &CancellationToken,
    ) -> Result<(ResponseEnvelope, Instant), RunError> {
        let mut attempts: u32 = 0;

        loop {
            if cancel.is_cancelled() {
                return Err(RunError::Canceled);
            }
            attempts += 1;

            let request = TargetRequest {
                url: url.to_string(),
                headers: settings.headers().clone(),
            };

            trace!(url, attempt = attempts, "Getting target");
            let sent_at = Instant::now();
            self.metrics.request_sent();

            match self.transport.send(request).await {
                Ok(raw) => {
                    let response = ResponseEnvelope::from_raw(raw);
                    if policy.is_acceptable(response.status_code()) {
                        if attempts > 1 {
                            debug!(url, attempts, "Fetch succeeded after retry");
                        }
                        return Ok((response, sent_at));
                    }

                    if attempts >= self.retries {
                        return Err(RunError::UnacceptableStatus {
                            status: response.status_code(),
                            reason: response.reason_phrase().to_string(),
                            attempts,
                        });
                    }

                    let delay = policy.next_delay(attempts, Some(&response));
                    warn!(
                        url,
                        status = response.status_code(),
                        attempt = attempts,
                        delay_ms = delay.as_millis() as u64,
                        "Status rejected, retrying"
                    );
                    self.metrics.retry();
                    sleep(delay).await;
                }
                Err(error) => {
                    if attempts >= self.retries {
                        warn!(url, attempts, error = %error, "Fetch failed after retries");
                        return Err(RunError::Transport {
                            attempts,
                            source: error,
                        });
                    }

                    let delay = policy.next_delay(attempts, None);
                    warn!(
                        url,
                        attempt = attempts,
                        error = %error,
                        delay_ms = delay.as_millis() as u64,
                        "Fetch failed, retrying"
                    );
                    self.metrics.retry();
                    sleep(delay).await;
                }
            }
        }
    }
}
