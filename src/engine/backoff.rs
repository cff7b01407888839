//! Retry and pacing decisions derived from module settings

use std::time::Duration;

use crate::modules::{BackoffProvider, ModuleSettings, StatusPredicate};
use crate::response::ResponseEnvelope;

/// Pure decision logic for one module run: which status codes count as
/// success, how long to wait before the next retry attempt, and the
/// minimum spacing between consecutive successful requests.
///
/// The policy never decides how many attempts are allowed; that budget
/// belongs to the runner.
#[derive(Clone)]
pub struct RetryPolicy {
    min_backoff: f64,
    exponential: bool,
    provider: Option<BackoffProvider>,
    acceptable: StatusPredicate,
}

impl RetryPolicy {
    pub fn from_settings(settings: &ModuleSettings) -> Self {
        Self {
            min_backoff: settings.min_backoff(),
            exponential: settings.exponential_backoff(),
            provider: settings.retry_backoff().cloned(),
            acceptable: settings.acceptable_status().clone(),
        }
    }

    pub fn is_acceptable(&self, status: u16) -> bool {
        (self.acceptable)(status)
    }

    /// Delay before the next attempt after a failed fetch. `attempt` is the
    /// 1-based count of attempts made so far; `last` is the last received
    /// response, absent when the failure was transport-level.
    ///
    /// A custom provider replaces the default rule entirely; otherwise the
    /// delay is `min_backoff * 2^(attempt-1)` with exponential backoff on,
    /// or flat `min_backoff` with it off.
    pub fn next_delay(&self, attempt: u32, last: Option<&ResponseEnvelope>) -> Duration {
        if let Some(provider) = &self.provider {
            return Duration::from_secs_f64(provider(attempt, last).max(0.0));
        }

        let seconds = if self.exponential {
            self.min_backoff * 2f64.powi(attempt.saturating_sub(1) as i32)
        } else {
            self.min_backoff
        };
        Duration::from_secs_f64(seconds)
    }

    /// Minimum gap between consecutive successful requests: the attempt-one
    /// value of the default rule, i.e. flat `min_backoff`.
    pub fn spacing(&self) -> Duration {
        Duration::from_secs_f64(self.min_backoff)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(settings: ModuleSettings) -> RetryPolicy {
        RetryPolicy::from_settings(&settings)
    }

    #[test]
    fn test_exponential_delays_double_per_attempt() {
        let policy = policy(ModuleSettings::builder().min_backoff(2.0).build());

        assert_eq!(policy.next_delay(1, None), Duration::from_secs(2));
        assert_eq!(policy.next_delay(2, None), Duration::from_secs(4));
        assert_eq!(policy.next_delay(3, None), Duration::from_secs(8));
    }

    #[test]
    fn test_linear_delays_are_flat() {
        let policy = policy(
            ModuleSettings::builder()
                .min_backoff(2.0)
                .exponential_backoff(false)
                .build(),
        );

        for attempt in 1..=3 {
            assert_eq!(policy.next_delay(attempt, None), Duration::from_secs(2));
        }
    }

    #[test]
    fn test_custom_provider_overrides_default_rule() {
        let policy = policy(
            ModuleSettings::builder()
                .min_backoff(60.0)
                .retry_backoff(|attempt, _last| attempt as f64 * 0.5)
                .build(),
        );

        assert_eq!(policy.next_delay(1, None), Duration::from_secs_f64(0.5));
        assert_eq!(policy.next_delay(4, None), Duration::from_secs(2));
    }

    #[test]
    fn test_negative_provider_result_clamps_to_zero() {
        let policy = policy(
            ModuleSettings::builder()
                .retry_backoff(|_, _| -1.0)
                .build(),
        );

        assert_eq!(policy.next_delay(1, None), Duration::ZERO);
    }

    #[test]
    fn test_spacing_is_flat_min_backoff() {
        let policy = policy(ModuleSettings::builder().min_backoff(1.5).build());
        assert_eq!(policy.spacing(), Duration::from_secs_f64(1.5));
    }

    #[test]
    fn test_default_predicate_accepts_everything() {
        let policy = policy(ModuleSettings::default());
        assert!(policy.is_acceptable(200));
        assert!(policy.is_acceptable(404));
        assert!(policy.is_acceptable(500));
    }

    #[test]
    fn test_custom_predicate_rejects() {
        let policy = policy(
            ModuleSettings::builder()
                .acceptable_status(|status| (200..300).contains(&status))
                .build(),
        );

        assert!(policy.is_acceptable(204));
        assert!(!policy.is_acceptable(503));
    }
}
