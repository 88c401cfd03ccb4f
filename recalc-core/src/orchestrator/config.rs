//! Orchestrator configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Timing and retention settings for a
/// [`CalculationOrchestrator`](super::CalculationOrchestrator).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct OrchestratorConfig {
    /// Quiet period after the last schedule before a drain starts (default: 150ms)
    #[serde(default = "default_debounce")]
    pub debounce_ms: u64,

    /// Delay before retrying a drain requested while one is running (default: 100ms)
    #[serde(default = "default_retry_delay")]
    pub retry_delay_ms: u64,

    /// Delay before draining work that arrived during a batch (default: 50ms)
    #[serde(default = "default_refill_delay")]
    pub refill_delay_ms: u64,

    /// Batches kept in history (default: 50)
    #[serde(default = "default_max_history")]
    pub max_history: usize,

    /// Batches reported by `calculation_stats` (default: 10)
    #[serde(default = "default_recent_batches")]
    pub recent_batches: usize,
}

impl OrchestratorConfig {
    /// Parse a JSON config, filling omitted fields with defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_history == 0 {
            return Err(ConfigError::EmptyHistory);
        }
        Ok(())
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn refill_delay(&self) -> Duration {
        Duration::from_millis(self.refill_delay_ms)
    }

    pub fn with_debounce_ms(mut self, ms: u64) -> Self {
        self.debounce_ms = ms;
        self
    }

    pub fn with_retry_delay_ms(mut self, ms: u64) -> Self {
        self.retry_delay_ms = ms;
        self
    }

    pub fn with_refill_delay_ms(mut self, ms: u64) -> Self {
        self.refill_delay_ms = ms;
        self
    }

    pub fn with_max_history(mut self, max: usize) -> Self {
        self.max_history = max;
        self
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce(),
            retry_delay_ms: default_retry_delay(),
            refill_delay_ms: default_refill_delay(),
            max_history: default_max_history(),
            recent_batches: default_recent_batches(),
        }
    }
}

// Default value functions
fn default_debounce() -> u64 {
    150
}
fn default_retry_delay() -> u64 {
    100
}
fn default_refill_delay() -> u64 {
    50
}
fn default_max_history() -> usize {
    50
}
fn default_recent_batches() -> usize {
    10
}
