//! Module execution engine
//!
//! The [`Engine`] owns an ordered registry of module descriptors and runs
//! them strictly one after another: each module is instantiated fresh,
//! initialized, driven through its targets by the runner, notified of its
//! outcome through exactly one lifecycle hook, then torn down. A module
//! failure never aborts the batch; cancellation stops the batch at the next
//! module boundary.
//!
//! The engine itself is a small state machine, `Idle -> Running -> {Idle,
//! Disposed}`, guarded by a lock because `start`, `dispose`, registration,
//! and configuration setters may be called concurrently by client code even
//! though module execution is single-threaded.

mod backoff;
mod runner;

pub use backoff::RetryPolicy;
pub use runner::RunError;

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::modules::{ModuleDescriptor, RegistrationError, validate_batch};
use crate::observability::Metrics;
use crate::services::Services;
use crate::transport::{HttpConfig, HttpTransport, Transport, TransportError};
use runner::ModuleRunner;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("engine is already running")]
    Running,

    #[error("engine has been disposed")]
    Disposed,

    #[error("configuration is frozen once the engine has started")]
    ConfigFrozen,

    #[error(transparent)]
    Registration(#[from] RegistrationError),

    #[error("transport setup failed: {0}")]
    Transport(#[from] TransportError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    Running,
    Disposed,
}

/// Outcome of one module execution within a run.
#[derive(Debug)]
pub struct ModuleOutcome {
    pub module: String,
    pub result: Result<(), RunError>,
}

/// Aggregated outcomes of one engine run.
#[derive(Debug)]
pub struct RunReport {
    pub outcomes: Vec<ModuleOutcome>,
}

impl RunReport {
    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_err()).count()
    }
}

struct Inner {
    state: EngineState,
    started: bool,
    queue: VecDeque<ModuleDescriptor>,
    retries: u32,
    http: HttpConfig,
    proxy: Option<String>,
    transport: Option<Arc<dyn Transport>>,
}

/// Sequential scraping engine. See the module docs for the lifecycle.
pub struct Engine {
    inner: Mutex<Inner>,
    metrics: Arc<Metrics>,
}

impl Engine {
    pub fn new() -> Self {
        Self::from_config(Config::default())
    }

    pub fn from_config(config: Config) -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: EngineState::Idle,
                started: false,
                queue: VecDeque::new(),
                retries: config.engine.retries,
                http: config.http.to_http_config(),
                proxy: config.http.proxy.clone(),
                transport: None,
            }),
            metrics: Arc::new(Metrics::new()),
        }
    }

    /// Engine over an externally-supplied transport instead of the built-in
    /// HTTP client. The timeout setter has no effect on such a transport.
    pub fn with_transport(transport: Arc<dyn Transport>) -> Self {
        let engine = Self::new();
        engine.lock().transport = Some(transport);
        engine
    }

    pub fn metrics(&self) -> Arc<Metrics> {
        self.metrics.clone()
    }

    pub fn state(&self) -> EngineState {
        self.lock().state
    }

    /// Per-request timeout of the built-in transport. Frozen after the
    /// first `start`.
    pub fn set_timeout(&self, timeout: Duration) -> Result<(), EngineError> {
        let mut inner = self.lock();
        Self::guard_config(&inner)?;
        inner.http.request_timeout = timeout;
        Ok(())
    }

    /// Fetch attempt budget per target. Frozen after the first `start`.
    pub fn set_retries(&self, retries: u32) -> Result<(), EngineError> {
        let mut inner = self.lock();
        Self::guard_config(&inner)?;
        inner.retries = retries;
        Ok(())
    }

    /// Enqueue a batch of module descriptors in order. All-or-nothing: if
    /// any descriptor is invalid the whole batch is rejected and the
    /// registry is left unchanged.
    pub fn register(&self, batch: Vec<ModuleDescriptor>) -> Result<(), EngineError> {
        let mut inner = self.lock();
        match inner.state {
            EngineState::Running => return Err(EngineError::Running),
            EngineState::Disposed => return Err(EngineError::Disposed),
            EngineState::Idle => {}
        }

        validate_batch(&batch, inner.queue.iter().map(|d| d.name()))?;

        for descriptor in batch {
            info!(module = %descriptor.name(), "Queued module in series");
            inner.queue.push_back(descriptor);
        }
        Ok(())
    }

    /// Run every registered module in registration order. Completes when
    /// all have run; individual module failures are reported in the
    /// [`RunReport`], not raised. Errors only on engine misuse.
    pub async fn start(
        &self,
        services: Services,
        cancel: CancellationToken,
    ) -> Result<RunReport, EngineError> {
        let (descriptors, transport, retries) = {
            let mut inner = self.lock();
            match inner.state {
                EngineState::Running => return Err(EngineError::Running),
                EngineState::Disposed => return Err(EngineError::Disposed),
                EngineState::Idle => {}
            }
            inner.state = EngineState::Running;
            inner.started = true;

            let transport = match &inner.transport {
                Some(transport) => transport.clone(),
                None => match HttpTransport::new(inner.http.clone(), inner.proxy.as_deref()) {
                    Ok(transport) => {
                        let transport: Arc<dyn Transport> = Arc::new(transport);
                        inner.transport = Some(transport.clone());
                        transport
                    }
                    Err(error) => {
                        inner.state = EngineState::Idle;
                        return Err(error.into());
                    }
                },
            };

            let descriptors: Vec<ModuleDescriptor> = inner.queue.drain(..).collect();
            (descriptors, transport, inner.retries)
        };

        let run_id = Uuid::new_v4();
        info!(%run_id, modules = descriptors.len(), "Starting to process modules in series");

        let runner = ModuleRunner::new(transport, retries, self.metrics.clone());
        let mut outcomes = Vec::with_capacity(descriptors.len());
        let mut remaining = descriptors.into_iter();

        while let Some(descriptor) = remaining.next() {
            if cancel.is_cancelled() {
                let skipped = remaining.len() + 1;
                warn!(%run_id, skipped, "Cancellation observed, skipping remaining modules");
                break;
            }

            let name = descriptor.name().to_string();
            let result = execute_module(&runner, &descriptor, &services, &cancel).await;
            match &result {
                Ok(()) => {
                    self.metrics.module_succeeded();
                    info!(module = %name, "Module finished");
                }
                Err(cause) => {
                    self.metrics.module_failed();
                    error!(module = %name, error = %cause, "Module failed");
                }
            }
            outcomes.push(ModuleOutcome {
                module: name,
                result,
            });
        }

        self.lock().state = EngineState::Idle;
        Ok(RunReport { outcomes })
    }

    /// Release the engine and its transport. Rejected while running; every
    /// operation after disposal is rejected.
    pub fn dispose(&self) -> Result<(), EngineError> {
        let mut inner = self.lock();
        match inner.state {
            EngineState::Running => Err(EngineError::Running),
            EngineState::Disposed => Err(EngineError::Disposed),
            EngineState::Idle => {
                inner.state = EngineState::Disposed;
                inner.transport = None;
                inner.queue.clear();
                Ok(())
            }
        }
    }

    fn guard_config(inner: &Inner) -> Result<(), EngineError> {
        match inner.state {
            EngineState::Running => Err(EngineError::Running),
            EngineState::Disposed => Err(EngineError::Disposed),
            EngineState::Idle if inner.started => Err(EngineError::ConfigFrozen),
            EngineState::Idle => Ok(()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().expect("engine state lock poisoned")
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

/// Execute one module: instantiate, init, run, fire exactly one terminal
/// hook, then tear down on every exit path.
async fn execute_module(
    runner: &ModuleRunner,
    descriptor: &ModuleDescriptor,
    services: &Services,
    cancel: &CancellationToken,
) -> Result<(), RunError> {
    debug!(module = %descriptor.name(), "Creating module instance");
    let mut module = descriptor.instantiate();

    debug!(module = %descriptor.name(), "Initializing module");
    let result = match module.init(services).await {
        Err(error) => Err(RunError::Init(error)),
        Ok(()) => runner.run(module.as_mut(), cancel).await,
    };

    match &result {
        Ok(()) => module.after_success().await,
        Err(cause) => module.after_failure(cause).await,
    }
    module.close().await;

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::{ModuleSettings, ProbeModule, ScrapeModule};
    use crate::transport::{RawResponse, TargetRequest};
    use async_trait::async_trait;
    use std::collections::BTreeMap;

    struct EmptyOk;

    #[async_trait]
    impl Transport for EmptyOk {
        async fn send(&self, _request: TargetRequest) -> Result<RawResponse, TransportError> {
            Ok(RawResponse {
                status: 200,
                reason: Some("OK".to_string()),
                headers: BTreeMap::new(),
                body: String::new(),
            })
        }
    }

    fn probe_descriptor(name: &str) -> ModuleDescriptor {
        ModuleDescriptor::from_factory(name, || {
            Box::new(ProbeModule::new(ModuleSettings::default(), Vec::new()))
        })
    }

    #[tokio::test]
    async fn test_start_with_empty_queue_completes() {
        let engine = Engine::with_transport(Arc::new(EmptyOk));
        let report = engine
            .start(Services::new(), CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.total(), 0);
        assert_eq!(engine.state(), EngineState::Idle);
    }

    #[tokio::test]
    async fn test_config_is_frozen_after_first_start() {
        let engine = Engine::with_transport(Arc::new(EmptyOk));
        engine.set_retries(5).unwrap();
        engine.set_timeout(Duration::from_secs(30)).unwrap();

        engine
            .start(Services::new(), CancellationToken::new())
            .await
            .unwrap();

        assert!(matches!(
            engine.set_retries(1),
            Err(EngineError::ConfigFrozen)
        ));
        assert!(matches!(
            engine.set_timeout(Duration::from_secs(1)),
            Err(EngineError::ConfigFrozen)
        ));
    }

    #[tokio::test]
    async fn test_dispose_rejects_further_operations() {
        let engine = Engine::with_transport(Arc::new(EmptyOk));
        engine.dispose().unwrap();

        assert!(matches!(engine.dispose(), Err(EngineError::Disposed)));
        assert!(matches!(
            engine.register(vec![probe_descriptor("probe")]),
            Err(EngineError::Disposed)
        ));
        assert!(matches!(
            engine.start(Services::new(), CancellationToken::new()).await,
            Err(EngineError::Disposed)
        ));
    }

    #[tokio::test]
    async fn test_invalid_batch_leaves_registry_unchanged() {
        let engine = Engine::with_transport(Arc::new(EmptyOk));
        engine.register(vec![probe_descriptor("probe")]).unwrap();

        // Second batch collides with the queued name; neither of its
        // descriptors may be enqueued.
        let result = engine.register(vec![
            probe_descriptor("other"),
            probe_descriptor("probe"),
        ]);
        assert!(matches!(
            result,
            Err(EngineError::Registration(RegistrationError::DuplicateName(_)))
        ));

        let report = engine
            .start(Services::new(), CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(report.total(), 1);
        assert_eq!(report.outcomes[0].module, "probe");
    }

    #[tokio::test]
    async fn test_typed_registration_runs_default_instance() {
        let engine = Engine::with_transport(Arc::new(EmptyOk));
        engine
            .register(vec![ModuleDescriptor::of::<ProbeModule>()])
            .unwrap();

        let report = engine
            .start(Services::new(), CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(report.succeeded(), 1);
        assert_eq!(report.outcomes[0].module, "ProbeModule");
    }

    #[tokio::test]
    async fn test_module_with_settings_from_init() {
        // Settings may be established during init rather than construction.
        struct LateSettings {
            settings: ModuleSettings,
        }

        #[async_trait]
        impl ScrapeModule for LateSettings {
            fn targets(&self) -> Vec<String> {
                Vec::new()
            }

            fn settings(&self) -> &ModuleSettings {
                &self.settings
            }

            async fn init(
                &mut self,
                _services: &Services,
            ) -> Result<(), crate::modules::AnyError> {
                self.settings = ModuleSettings::builder().min_backoff(0.0).build();
                Ok(())
            }

            async fn handle(
                &mut self,
                _response: crate::response::ResponseEnvelope,
            ) -> Result<(), crate::modules::AnyError> {
                Ok(())
            }
        }

        let engine = Engine::with_transport(Arc::new(EmptyOk));
        engine
            .register(vec![ModuleDescriptor::from_factory("late", || {
                Box::new(LateSettings {
                    settings: ModuleSettings::default(),
                })
            })])
            .unwrap();

        let report = engine
            .start(Services::new(), CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(report.succeeded(), 1);
    }
}
