//! Autosave timing and retry settings.

use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_DEBOUNCE_MS: u64 = 2_000;
pub const DEFAULT_INTERVAL_MS: u64 = 30_000;
/// Upper bound for backed-off retry delays
pub const MAX_RETRY_DELAY_MS: u64 = 3_600_000;

/// What to do after a failed save
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RetryPolicy {
    /// Multiplier applied to the interval per consecutive failure; 1.0 keeps
    /// the plain interval
    pub backoff_factor: f64,
    /// Stop saving after this many failures in a row, until the next edit
    pub max_consecutive_failures: Option<u32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            backoff_factor: 1.0,
            max_consecutive_failures: None,
        }
    }
}

impl RetryPolicy {
    pub fn exhausted(&self, failures: u32) -> bool {
        self.max_consecutive_failures
            .is_some_and(|max| failures >= max)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AutosaveConfig {
    pub enabled: bool,
    pub debounce_ms: u64,
    pub interval_ms: u64,
    pub retry: RetryPolicy,
}

impl Default for AutosaveConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            interval_ms: DEFAULT_INTERVAL_MS,
            retry: RetryPolicy::default(),
        }
    }
}

impl AutosaveConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Delay before the next attempt after `failures` consecutive failures.
    pub fn retry_delay(&self, failures: u32) -> Duration {
        let factor = self.retry.backoff_factor.max(1.0);
        let exponent = i32::try_from(failures).unwrap_or(i32::MAX);
        let cap = MAX_RETRY_DELAY_MS.max(self.interval_ms);
        let millis = self.interval_ms as f64 * factor.powi(exponent);
        if millis.is_finite() && millis < cap as f64 {
            Duration::from_millis(millis as u64)
        } else {
            Duration::from_millis(cap)
        }
    }
}
