//! Per-module request settings

use std::fmt;
use std::sync::Arc;

use crate::response::{HeadersMap, ResponseEnvelope};

/// Computes the backoff for a failed attempt: 1-based attempt count plus the
/// last received response (absent on transport failure), returning seconds.
pub type BackoffProvider = Arc<dyn Fn(u32, Option<&ResponseEnvelope>) -> f64 + Send + Sync>;

/// Decides whether a received status code counts as a successful fetch.
pub type StatusPredicate = Arc<dyn Fn(u16) -> bool + Send + Sync>;

/// Settings a module supplies for its requests: where to fetch, which
/// headers to send, and how to pace and retry.
#[derive(Clone)]
pub struct ModuleSettings {
    base_url: String,
    headers: HeadersMap,
    min_backoff: f64,
    exponential_backoff: bool,
    retry_backoff: Option<BackoffProvider>,
    acceptable_status: StatusPredicate,
}

impl Default for ModuleSettings {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            headers: HeadersMap::new(),
            min_backoff: 2.0,
            exponential_backoff: true,
            retry_backoff: None,
            acceptable_status: Arc::new(|_| true),
        }
    }
}

impl ModuleSettings {
    pub fn builder() -> ModuleSettingsBuilder {
        ModuleSettingsBuilder {
            inner: Self::default(),
        }
    }

    /// Base URL each target fragment is appended to. Defaults to empty.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Headers to send with every request.
    pub fn headers(&self) -> &HeadersMap {
        &self.headers
    }

    /// Minimum gap between consecutive requests, in seconds. Defaults to 2.0.
    pub fn min_backoff(&self) -> f64 {
        self.min_backoff
    }

    /// Whether retry backoff doubles per attempt. Defaults to true.
    pub fn exponential_backoff(&self) -> bool {
        self.exponential_backoff
    }

    /// Custom retry backoff; when set it replaces the default rule entirely.
    pub fn retry_backoff(&self) -> Option<&BackoffProvider> {
        self.retry_backoff.as_ref()
    }

    pub fn acceptable_status(&self) -> &StatusPredicate {
        &self.acceptable_status
    }
}

impl fmt::Debug for ModuleSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleSettings")
            .field("base_url", &self.base_url)
            .field("headers", &self.headers)
            .field("min_backoff", &self.min_backoff)
            .field("exponential_backoff", &self.exponential_backoff)
            .field("retry_backoff", &self.retry_backoff.is_some())
            .finish()
    }
}

pub struct ModuleSettingsBuilder {
    inner: ModuleSettings,
}

impl ModuleSettingsBuilder {
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.inner.base_url = base_url.into();
        self
    }

    /// Append one header value; repeated names accumulate in call order.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.inner
            .headers
            .entry(name.into())
            .or_default()
            .push(value.into());
        self
    }

    pub fn headers(mut self, headers: HeadersMap) -> Self {
        self.inner.headers = headers;
        self
    }

    /// Negative values are clamped to zero.
    pub fn min_backoff(mut self, seconds: f64) -> Self {
        self.inner.min_backoff = seconds.max(0.0);
        self
    }

    pub fn exponential_backoff(mut self, enabled: bool) -> Self {
        self.inner.exponential_backoff = enabled;
        self
    }

    pub fn retry_backoff<F>(mut self, provider: F) -> Self
    where
        F: Fn(u32, Option<&ResponseEnvelope>) -> f64 + Send + Sync + 'static,
    {
        self.inner.retry_backoff = Some(Arc::new(provider));
        self
    }

    pub fn acceptable_status<F>(mut self, predicate: F) -> Self
    where
        F: Fn(u16) -> bool + Send + Sync + 'static,
    {
        self.inner.acceptable_status = Arc::new(predicate);
        self
    }

    pub fn build(self) -> ModuleSettings {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = ModuleSettings::default();
        assert_eq!(settings.base_url(), "");
        assert!(settings.headers().is_empty());
        assert_eq!(settings.min_backoff(), 2.0);
        assert!(settings.exponential_backoff());
        assert!(settings.retry_backoff().is_none());
        assert!((settings.acceptable_status())(500));
    }

    #[test]
    fn test_builder_sets_fields() {
        let settings = ModuleSettings::builder()
            .base_url("https://example.com")
            .header("Accept", "text/html")
            .min_backoff(0.5)
            .exponential_backoff(false)
            .acceptable_status(|status| status == 200)
            .build();

        assert_eq!(settings.base_url(), "https://example.com");
        assert_eq!(settings.headers()["Accept"], vec!["text/html"]);
        assert_eq!(settings.min_backoff(), 0.5);
        assert!(!settings.exponential_backoff());
        assert!((settings.acceptable_status())(200));
        assert!(!(settings.acceptable_status())(404));
    }

    #[test]
    fn test_repeated_headers_accumulate_in_order() {
        let settings = ModuleSettings::builder()
            .header("Cookie", "a=1")
            .header("Cookie", "b=2")
            .build();

        assert_eq!(settings.headers()["Cookie"], vec!["a=1", "b=2"]);
    }

    #[test]
    fn test_negative_min_backoff_clamps_to_zero() {
        let settings = ModuleSettings::builder().min_backoff(-3.0).build();
        assert_eq!(settings.min_backoff(), 0.0);
    }

    #[test]
    fn test_retry_backoff_provider_is_used_verbatim() {
        let settings = ModuleSettings::builder()
            .retry_backoff(|attempt, _last| attempt as f64 * 1.5)
            .build();

        let provider = settings.retry_backoff().expect("provider set");
        assert_eq!(provider(2, None), 3.0);
    }
}
