//! Monitor configuration.

use std::time::Duration;

use crate::collector::fetcher::DEFAULT_MAX_CONTINUATIONS;
use crate::console::InvalidInput;

/// Real-time (20 second) performance interval.
pub const REALTIME_INTERVAL_ID: i32 = 20;
pub const DEFAULT_MAX_SAMPLES: u32 = 10;
/// Upper bound on samples per query.
pub const MAX_SAMPLES_LIMIT: u32 = 3600;
pub const DEFAULT_PERIOD: Duration = Duration::from_secs(10);
pub const DEFAULT_GROUP: &str = "cpu";

/// Retry policy for failed sample queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first failure. Zero makes every fault fatal.
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Policy that treats the first fault as fatal.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }
}

/// Settings for one monitoring run.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Name of the virtual machine to monitor.
    pub vm_name: String,
    /// Counter group offered for selection.
    pub group: String,
    pub interval_id: i32,
    pub max_samples: u32,
    /// Pause between sample queries.
    pub period: Duration,
    /// Stop after this many polling iterations. `None` polls until cancelled.
    pub iterations: Option<u64>,
    /// Page size hint for property retrieval.
    pub page_size: Option<u32>,
    pub max_continuations: usize,
    pub retry: RetryPolicy,
    pub invalid_input: InvalidInput,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self::new(String::new())
    }
}

impl MonitorConfig {
    pub fn new(vm_name: impl Into<String>) -> Self {
        Self {
            vm_name: vm_name.into(),
            group: DEFAULT_GROUP.to_string(),
            interval_id: REALTIME_INTERVAL_ID,
            max_samples: DEFAULT_MAX_SAMPLES,
            period: DEFAULT_PERIOD,
            iterations: None,
            page_size: None,
            max_continuations: DEFAULT_MAX_CONTINUATIONS,
            retry: RetryPolicy::default(),
            invalid_input: InvalidInput::default(),
        }
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = group.into();
        self
    }

    pub fn with_interval_id(mut self, interval_id: i32) -> Self {
        self.interval_id = interval_id;
        self
    }

    pub fn with_max_samples(mut self, max_samples: u32) -> Self {
        self.max_samples = max_samples;
        self
    }

    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    pub fn with_iterations(mut self, iterations: Option<u64>) -> Self {
        self.iterations = iterations;
        self
    }

    pub fn with_page_size(mut self, page_size: Option<u32>) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_max_continuations(mut self, limit: usize) -> Self {
        self.max_continuations = limit;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_invalid_input(mut self, policy: InvalidInput) -> Self {
        self.invalid_input = policy;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_realtime_sampling() {
        let config = MonitorConfig::new("web-01");
        assert_eq!(config.group, "cpu");
        assert_eq!(config.interval_id, 20);
        assert_eq!(config.max_samples, 10);
        assert_eq!(config.period, Duration::from_secs(10));
        assert_eq!(config.iterations, None);
        assert_eq!(config.invalid_input, InvalidInput::Fail);
        assert_eq!(config.retry.max_retries, 3);
    }

    #[test]
    fn no_retry_policy_keeps_backoff_defaults() {
        let policy = RetryPolicy::none();
        assert_eq!(policy.max_retries, 0);
        assert_eq!(policy.initial_backoff, Duration::from_secs(1));
    }
}
