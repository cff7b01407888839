//! Observability stubs (metrics, tracing)

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics handle for recording counters
#[derive(Debug, Default)]
pub struct Metrics {
    requests_sent: AtomicU64,
    retries: AtomicU64,
    modules_succeeded: AtomicU64,
    modules_failed: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_sent(&self) {
        self.requests_sent.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "requests_sent", "Metric incremented");
    }

    pub fn retry(&self) {
        self.retries.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "retries", "Metric incremented");
    }

    pub fn module_succeeded(&self) {
        self.modules_succeeded.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "modules_succeeded", "Metric incremented");
    }

    pub fn module_failed(&self) {
        self.modules_failed.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "modules_failed", "Metric incremented");
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            requests_sent: self.requests_sent.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            modules_succeeded: self.modules_succeeded.load(Ordering::Relaxed),
            modules_failed: self.modules_failed.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    pub requests_sent: u64,
    pub retries: u64,
    pub modules_succeeded: u64,
    pub modules_failed: u64,
}
