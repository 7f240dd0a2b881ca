//! Distribution statistics over a set of trial durations.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Summary of a duration distribution, in milliseconds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimingStats {
    pub count: usize,
    pub min_ms: f64,
    pub max_ms: f64,
    pub mean_ms: f64,
    pub median_ms: f64,
    pub p95_ms: f64,
    pub p99_ms: f64,
    /// Population standard deviation
    pub std_dev_ms: f64,
    pub total_ms: f64,
}

impl TimingStats {
    /// Summarize `durations`. An empty slice yields all zeros.
    pub fn from_samples(durations: &[f64]) -> Self {
        if durations.is_empty() {
            return Self::default();
        }

        let count = durations.len();
        let mut ordered = durations.to_vec();
        ordered.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));

        let total_ms: f64 = durations.iter().sum();
        let mean_ms = total_ms / count as f64;
        let variance = durations
            .iter()
            .map(|d| (d - mean_ms).powi(2))
            .sum::<f64>()
            / count as f64;

        Self {
            count,
            min_ms: ordered[0],
            max_ms: ordered[count - 1],
            mean_ms,
            median_ms: percentile(&ordered, 50.0),
            p95_ms: percentile(&ordered, 95.0),
            p99_ms: percentile(&ordered, 99.0),
            std_dev_ms: variance.sqrt(),
            total_ms,
        }
    }

    /// Spread between the slowest and fastest trial.
    pub fn range_ms(&self) -> f64 {
        self.max_ms - self.min_ms
    }
}

/// Linear-interpolated percentile over already sorted data.
fn percentile(ordered: &[f64], p: f64) -> f64 {
    match ordered.len() {
        0 => 0.0,
        1 => ordered[0],
        len => {
            let rank = (p / 100.0) * (len - 1) as f64;
            let lower = rank.floor() as usize;
            let upper = (rank.ceil() as usize).min(len - 1);
            let fraction = rank - lower as f64;
            ordered[lower] + fraction * (ordered[upper] - ordered[lower])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_from_samples() {
        let stats = TimingStats::from_samples(&[4.0, 1.0, 3.0, 2.0, 5.0]);

        assert_eq!(stats.count, 5);
        assert_eq!(stats.min_ms, 1.0);
        assert_eq!(stats.max_ms, 5.0);
        assert_eq!(stats.mean_ms, 3.0);
        assert_eq!(stats.median_ms, 3.0);
        assert_eq!(stats.total_ms, 15.0);
        assert_eq!(stats.range_ms(), 4.0);
        assert!((stats.std_dev_ms - 2.0_f64.sqrt()).abs() < 1e-9);
    }

    #[test]
    fn test_stats_empty() {
        let stats = TimingStats::from_samples(&[]);
        assert_eq!(stats, TimingStats::default());
    }

    #[test]
    fn test_even_count_median_interpolates() {
        let stats = TimingStats::from_samples(&[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(stats.median_ms, 2.5);
    }

    #[test]
    fn test_percentile() {
        let ordered: Vec<f64> = (1..=10).map(f64::from).collect();
        assert!((percentile(&ordered, 50.0) - 5.5).abs() < 0.01);
        assert!((percentile(&ordered, 90.0) - 9.1).abs() < 0.01);
        assert_eq!(percentile(&[7.0], 99.0), 7.0);
    }
}
