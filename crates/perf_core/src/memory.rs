//! Memory usage probing and trend detection.
//!
//! Hosts differ in whether they can report memory usage at all. That
//! capability is modelled as a [`MemoryProbe`] chosen when the context is
//! built: the real [`ProcessMemoryProbe`] (behind the `host-memory` feature) or
//! the [`NoopProbe`]. A probe that cannot answer is not an error; the monitor
//! simply reports [`MemorySnapshot::unavailable`].
//!
//! # Example
//!
//! ```rust
//! use perf_core::memory::{MemoryMonitor, MemoryTrend, NoopProbe};
//!
//! let mut monitor = MemoryMonitor::new(Box::new(NoopProbe), 10);
//! let snapshot = monitor.snapshot();
//! assert_eq!(snapshot.trend, MemoryTrend::Stable);
//! assert_eq!(snapshot.used_mb, 0.0);
//! ```

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Raw usage figures returned by a probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeapUsage {
    pub used_bytes: u64,
    pub total_bytes: u64,
}

/// Source of memory usage readings.
pub trait MemoryProbe: Send {
    /// Read current usage, or `None` if the host cannot tell.
    fn query(&mut self) -> Option<HeapUsage>;

    /// Short identifier for logging.
    fn name(&self) -> &'static str;
}

/// Probe for hosts without memory introspection.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProbe;

impl MemoryProbe for NoopProbe {
    fn query(&mut self) -> Option<HeapUsage> {
        None
    }

    fn name(&self) -> &'static str {
        "noop"
    }
}

/// Reads the current process's resident memory against total host memory.
#[cfg(feature = "host-memory")]
pub struct ProcessMemoryProbe {
    system: sysinfo::System,
    pid: Option<sysinfo::Pid>,
}

#[cfg(feature = "host-memory")]
impl ProcessMemoryProbe {
    pub fn new() -> Self {
        let pid = match sysinfo::get_current_pid() {
            Ok(pid) => Some(pid),
            Err(reason) => {
                tracing::debug!(target: "perf::memory", reason, "current pid unavailable");
                None
            }
        };
        Self {
            system: sysinfo::System::new(),
            pid,
        }
    }
}

#[cfg(feature = "host-memory")]
impl Default for ProcessMemoryProbe {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "host-memory")]
impl MemoryProbe for ProcessMemoryProbe {
    fn query(&mut self) -> Option<HeapUsage> {
        let pid = self.pid?;
        self.system.refresh_memory();
        if !self.system.refresh_process(pid) {
            return None;
        }

        let used_bytes = self.system.process(pid)?.memory();
        let total_bytes = self.system.total_memory();
        (total_bytes > 0).then_some(HeapUsage {
            used_bytes,
            total_bytes,
        })
    }

    fn name(&self) -> &'static str {
        "process"
    }
}

/// Best probe available in this build.
pub fn default_probe() -> Box<dyn MemoryProbe> {
    #[cfg(feature = "host-memory")]
    {
        Box::new(ProcessMemoryProbe::new())
    }
    #[cfg(not(feature = "host-memory"))]
    {
        Box::new(NoopProbe)
    }
}

/// Direction of memory usage across the recent window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryTrend {
    #[default]
    Stable,
    Increasing,
    Decreasing,
}

/// A point-in-time view of memory usage.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemorySnapshot {
    pub used_mb: f64,
    pub total_mb: f64,
    /// Used as a share of total, in [0, 100]
    pub percentage: f64,
    pub trend: MemoryTrend,
}

impl MemorySnapshot {
    /// The snapshot reported when no reading is possible.
    pub fn unavailable() -> Self {
        Self::default()
    }

    fn from_usage(usage: HeapUsage, trend: MemoryTrend) -> Self {
        let used_mb = usage.used_bytes as f64 / BYTES_PER_MB;
        let total_mb = usage.total_bytes as f64 / BYTES_PER_MB;
        let percentage = if usage.total_bytes == 0 {
            0.0
        } else {
            (usage.used_bytes as f64 / usage.total_bytes as f64 * 100.0).clamp(0.0, 100.0)
        };
        Self {
            used_mb,
            total_mb,
            percentage,
            trend,
        }
    }
}

/// Wraps a probe and keeps the bounded history used to classify the trend.
pub struct MemoryMonitor {
    probe: Box<dyn MemoryProbe>,
    history: VecDeque<f64>,
    window: usize,
}

impl MemoryMonitor {
    /// `window` is clamped to at least 2 readings.
    pub fn new(probe: Box<dyn MemoryProbe>, window: usize) -> Self {
        let window = window.max(2);
        Self {
            probe,
            history: VecDeque::new(),
            window,
        }
    }

    /// Query the probe and classify the trend over the window, this reading
    /// included.
    pub fn snapshot(&mut self) -> MemorySnapshot {
        let Some(usage) = self.probe.query() else {
            tracing::debug!(
                target: "perf::memory",
                probe = self.probe.name(),
                "memory usage unavailable"
            );
            return MemorySnapshot::unavailable();
        };

        let used_mb = usage.used_bytes as f64 / BYTES_PER_MB;
        if self.history.len() >= self.window {
            self.history.pop_front();
        }
        self.history.push_back(used_mb);

        MemorySnapshot::from_usage(usage, classify_trend(&self.history))
    }

    /// Recent `used_mb` readings, oldest first.
    pub fn history(&self) -> Vec<f64> {
        self.history.iter().copied().collect()
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn probe_name(&self) -> &'static str {
        self.probe.name()
    }
}

impl std::fmt::Debug for MemoryMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryMonitor")
            .field("probe", &self.probe.name())
            .field("history", &self.history)
            .field("window", &self.window)
            .finish()
    }
}

/// Increasing if no step goes down and at least one goes up; decreasing
/// analogously; otherwise stable.
fn classify_trend(history: &VecDeque<f64>) -> MemoryTrend {
    let steps: Vec<f64> = history
        .iter()
        .zip(history.iter().skip(1))
        .map(|(prev, next)| next - prev)
        .collect();

    let rose = steps.iter().any(|step| *step > 0.0);
    let fell = steps.iter().any(|step| *step < 0.0);

    match (rose, fell) {
        (true, false) => MemoryTrend::Increasing,
        (false, true) => MemoryTrend::Decreasing,
        _ => MemoryTrend::Stable,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Replays scripted readings, in MB.
    struct ScriptedProbe {
        readings: VecDeque<Option<f64>>,
    }

    impl ScriptedProbe {
        fn new(readings: &[Option<f64>]) -> Self {
            Self {
                readings: readings.iter().copied().collect(),
            }
        }
    }

    impl MemoryProbe for ScriptedProbe {
        fn query(&mut self) -> Option<HeapUsage> {
            let used_mb = self.readings.pop_front().flatten()?;
            Some(HeapUsage {
                used_bytes: (used_mb * BYTES_PER_MB) as u64,
                total_bytes: (1000.0 * BYTES_PER_MB) as u64,
            })
        }

        fn name(&self) -> &'static str {
            "scripted"
        }
    }

    fn trends(readings: &[Option<f64>], window: usize) -> Vec<MemoryTrend> {
        let mut monitor = MemoryMonitor::new(Box::new(ScriptedProbe::new(readings)), window);
        readings.iter().map(|_| monitor.snapshot().trend).collect()
    }

    #[test]
    fn test_noop_probe_returns_sentinel() {
        let mut monitor = MemoryMonitor::new(Box::new(NoopProbe), 10);
        for _ in 0..3 {
            let snapshot = monitor.snapshot();
            assert_eq!(snapshot.used_mb, 0.0);
            assert_eq!(snapshot.total_mb, 0.0);
            assert_eq!(snapshot.percentage, 0.0);
            assert_eq!(snapshot.trend, MemoryTrend::Stable);
        }
        assert!(monitor.history().is_empty());
    }

    #[test]
    fn test_snapshot_values() {
        let mut monitor = MemoryMonitor::new(Box::new(ScriptedProbe::new(&[Some(250.0)])), 10);
        let snapshot = monitor.snapshot();
        assert_eq!(snapshot.used_mb, 250.0);
        assert_eq!(snapshot.total_mb, 1000.0);
        assert!((snapshot.percentage - 25.0).abs() < 1e-9);
        assert_eq!(snapshot.trend, MemoryTrend::Stable);
    }

    #[test]
    fn test_increasing_trend() {
        let readings = [Some(10.0), Some(10.0), Some(12.0), Some(15.0)];
        assert_eq!(trends(&readings, 10).last(), Some(&MemoryTrend::Increasing));
    }

    #[test]
    fn test_decreasing_trend() {
        let readings = [Some(20.0), Some(18.0), Some(18.0), Some(11.0)];
        assert_eq!(trends(&readings, 10).last(), Some(&MemoryTrend::Decreasing));
    }

    #[test]
    fn test_mixed_and_flat_are_stable() {
        let mixed = [Some(10.0), Some(12.0), Some(11.0)];
        assert_eq!(trends(&mixed, 10).last(), Some(&MemoryTrend::Stable));

        let flat = [Some(10.0), Some(10.0), Some(10.0)];
        assert_eq!(trends(&flat, 10).last(), Some(&MemoryTrend::Stable));
    }

    #[test]
    fn test_window_forgets_old_readings() {
        // The early dip falls out of a 3-reading window.
        let readings = [Some(50.0), Some(10.0), Some(20.0), Some(30.0), Some(40.0)];
        let observed = trends(&readings, 3);
        assert_eq!(observed[2], MemoryTrend::Stable);
        assert_eq!(observed[4], MemoryTrend::Increasing);
    }

    #[test]
    fn test_unavailable_reading_does_not_enter_window() {
        let readings = [Some(10.0), None, Some(20.0)];
        let mut monitor = MemoryMonitor::new(Box::new(ScriptedProbe::new(&readings)), 10);

        monitor.snapshot();
        assert_eq!(monitor.snapshot(), MemorySnapshot::unavailable());
        assert_eq!(monitor.snapshot().trend, MemoryTrend::Increasing);
        assert_eq!(monitor.history(), vec![10.0, 20.0]);
    }

    #[test]
    fn test_window_minimum() {
        let monitor = MemoryMonitor::new(Box::new(NoopProbe), 0);
        assert_eq!(monitor.window(), 2);
    }

    #[test]
    fn test_unbounded_window_grows_with_readings() {
        let readings = [Some(10.0), Some(11.0), Some(12.0)];
        let mut monitor = MemoryMonitor::new(Box::new(ScriptedProbe::new(&readings)), usize::MAX);
        assert_eq!(monitor.window(), usize::MAX);

        let observed: Vec<_> = readings.iter().map(|_| monitor.snapshot().trend).collect();
        assert_eq!(observed.last(), Some(&MemoryTrend::Increasing));
        assert_eq!(monitor.history().len(), 3);
    }

    #[test]
    fn test_trend_serializes_lowercase() {
        let json = serde_json::to_string(&MemoryTrend::Increasing).unwrap();
        assert_eq!(json, "\"increasing\"");
    }

    #[cfg(feature = "host-memory")]
    #[test]
    fn test_process_probe_reports_sane_values() {
        let mut monitor = MemoryMonitor::new(Box::new(ProcessMemoryProbe::new()), 10);
        let snapshot = monitor.snapshot();
        assert!(snapshot.used_mb >= 0.0);
        assert!((0.0..=100.0).contains(&snapshot.percentage));
    }
}
