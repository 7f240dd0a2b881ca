//! Configuration for a measurement context.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{PerfError, PerfResult};

/// Default number of memory readings considered when classifying a trend.
pub const DEFAULT_TREND_WINDOW: usize = 10;

/// Settings for a [`PerfContext`](crate::PerfContext).
///
/// Every field has a default, so a partial JSON document is enough:
///
/// ```rust
/// use perf_core::PerfConfig;
///
/// let config = PerfConfig::from_json_str(r#"{ "warmupIterations": 3 }"#).unwrap();
/// assert_eq!(config.warmup_iterations, 3);
/// assert_eq!(config.trend_window, 10);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PerfConfig {
    /// Number of memory readings in the trend window (at least 2)
    pub trend_window: usize,
    /// Untimed invocations before each benchmark's trials
    pub warmup_iterations: usize,
    /// Query host memory when the build supports it
    pub probe_host_memory: bool,
    /// Subjects registered up front, fixing their ranking order
    pub subjects: Vec<String>,
}

impl Default for PerfConfig {
    fn default() -> Self {
        Self {
            trend_window: DEFAULT_TREND_WINDOW,
            warmup_iterations: 0,
            probe_host_memory: true,
            subjects: Vec::new(),
        }
    }
}

impl PerfConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the trend window size.
    pub fn with_trend_window(mut self, window: usize) -> Self {
        self.trend_window = window;
        self
    }

    /// Set the number of warmup invocations per benchmark.
    pub fn with_warmup_iterations(mut self, iterations: usize) -> Self {
        self.warmup_iterations = iterations;
        self
    }

    /// Enable or disable host memory probing.
    pub fn with_host_memory(mut self, enabled: bool) -> Self {
        self.probe_host_memory = enabled;
        self
    }

    /// Pre-register subjects in the given order.
    pub fn with_subjects<I, S>(mut self, subjects: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.subjects = subjects.into_iter().map(Into::into).collect();
        self
    }

    pub fn validate(&self) -> PerfResult<()> {
        if self.trend_window < 2 {
            return Err(PerfError::InvalidConfig(format!(
                "trendWindow must be at least 2, got {}",
                self.trend_window
            )));
        }
        if let Some(blank) = self.subjects.iter().find(|s| s.trim().is_empty()) {
            return Err(PerfError::InvalidConfig(format!(
                "subject names must not be blank: {:?}",
                blank
            )));
        }
        Ok(())
    }

    /// Parse and validate a JSON document.
    pub fn from_json_str(json: &str) -> PerfResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON file.
    pub fn load(path: impl AsRef<Path>) -> PerfResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&content)?;
        tracing::debug!(target: "perf::config", path = %path.display(), "configuration loaded");
        Ok(config)
    }
}
