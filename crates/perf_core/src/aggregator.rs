//! Lifetime running statistics per subject.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{PerfError, PerfResult};

/// A single timing observation attributed to a subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sample {
    pub subject: String,
    pub duration_ms: f64,
}

impl Sample {
    /// Create a sample of `duration_ms` for `subject`.
    pub fn new(subject: impl Into<String>, duration_ms: f64) -> Self {
        Self {
            subject: subject.into(),
            duration_ms,
        }
    }
}

/// Running statistics for one subject.
///
/// `average_duration` is always `total_duration / count`; it is recomputed on
/// every update and is 0 while `count` is 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateRecord {
    pub subject: String,
    pub count: u64,
    pub total_duration: f64,
    pub average_duration: f64,
}

impl AggregateRecord {
    fn empty(subject: &str) -> Self {
        Self {
            subject: subject.to_string(),
            count: 0,
            total_duration: 0.0,
            average_duration: 0.0,
        }
    }

    fn absorb(&mut self, duration_ms: f64) {
        self.count += 1;
        self.total_duration += duration_ms;
        self.average_duration = self.total_duration / self.count as f64;
    }
}

/// Aggregates samples per subject.
///
/// Subjects keep the position they were first registered at, including across
/// resets, so enumeration and tie-breaking stay deterministic.
#[derive(Debug, Clone, Default)]
pub struct MetricsAggregator {
    records: HashMap<String, AggregateRecord>,
    /// Registration order
    order: Vec<String>,
}

impl MetricsAggregator {
    /// Create an empty aggregator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an aggregator with subjects pre-registered in the given order.
    pub fn with_subjects<I, S>(subjects: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut aggregator = Self::new();
        for subject in subjects {
            aggregator.register(subject.as_ref());
        }
        aggregator
    }

    /// Reserve a position in the enumeration order without recording anything.
    ///
    /// Registering an already known subject is a no-op.
    pub fn register(&mut self, subject: &str) {
        if !self.order.iter().any(|known| known == subject) {
            self.order.push(subject.to_string());
        }
    }

    /// Record one duration for `subject`.
    pub fn update(&mut self, subject: &str, duration_ms: f64) -> PerfResult<()> {
        if !duration_ms.is_finite() || duration_ms < 0.0 {
            tracing::debug!(
                target: "perf::aggregator",
                subject,
                duration_ms,
                "sample rejected"
            );
            return Err(PerfError::InvalidSample {
                subject: subject.to_string(),
                duration_ms,
            });
        }

        self.register(subject);
        let record = self
            .records
            .entry(subject.to_string())
            .or_insert_with(|| AggregateRecord::empty(subject));
        record.absorb(duration_ms);

        tracing::trace!(
            target: "perf::aggregator",
            subject,
            duration_ms,
            count = record.count,
            average_ms = record.average_duration,
            "sample recorded"
        );
        Ok(())
    }

    /// Record a [`Sample`].
    pub fn record(&mut self, sample: &Sample) -> PerfResult<()> {
        self.update(&sample.subject, sample.duration_ms)
    }

    /// Lifetime record for `subject`, if it has any samples.
    pub fn get(&self, subject: &str) -> Option<&AggregateRecord> {
        self.records.get(subject)
    }

    /// All records, in registration order.
    pub fn get_all(&self) -> Vec<AggregateRecord> {
        self.order
            .iter()
            .filter_map(|subject| self.records.get(subject))
            .cloned()
            .collect()
    }

    /// Drop one subject's record, or every record when `subject` is `None`.
    pub fn reset(&mut self, subject: Option<&str>) {
        match subject {
            Some(subject) => {
                self.records.remove(subject);
            }
            None => self.records.clear(),
        }
        tracing::debug!(target: "perf::aggregator", subject, "aggregates reset");
    }

    /// Every subject ever registered, in order.
    pub fn subjects(&self) -> &[String] {
        &self.order
    }

    /// Number of subjects with a live record.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no subject has a live record.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_update_scenario() {
        let mut aggregator = MetricsAggregator::new();
        aggregator.update("A", 10.0).unwrap();
        aggregator.update("A", 20.0).unwrap();

        let record = aggregator.get("A").unwrap();
        assert_eq!(record.count, 2);
        assert_eq!(record.total_duration, 30.0);
        assert_eq!(record.average_duration, 15.0);
    }

    #[test]
    fn test_negative_sample_rejected() {
        let mut aggregator = MetricsAggregator::new();
        aggregator.update("A", 4.0).unwrap();
        let before = aggregator.get("A").cloned();

        let err = aggregator.update("A", -1.0).unwrap_err();
        assert!(matches!(err, PerfError::InvalidSample { .. }));
        assert_eq!(aggregator.get("A").cloned(), before);
    }

    #[test]
    fn test_rejected_first_sample_creates_nothing() {
        let mut aggregator = MetricsAggregator::new();
        assert!(aggregator.update("ghost", f64::NAN).is_err());
        assert!(aggregator.update("ghost", f64::INFINITY).is_err());
        assert!(aggregator.get("ghost").is_none());
        assert!(aggregator.subjects().is_empty());
    }

    #[test]
    fn test_zero_duration_is_valid() {
        let mut aggregator = MetricsAggregator::new();
        aggregator.update("A", 0.0).unwrap();
        let record = aggregator.get("A").unwrap();
        assert_eq!(record.count, 1);
        assert_eq!(record.average_duration, 0.0);
    }

    #[test]
    fn test_get_all_in_registration_order() {
        let mut aggregator = MetricsAggregator::new();
        aggregator.update("zustand", 1.0).unwrap();
        aggregator.update("context", 1.0).unwrap();
        aggregator.update("redux", 1.0).unwrap();
        aggregator.update("zustand", 1.0).unwrap();

        let subjects: Vec<_> = aggregator
            .get_all()
            .into_iter()
            .map(|r| r.subject)
            .collect();
        assert_eq!(subjects, vec!["zustand", "context", "redux"]);
    }

    #[test]
    fn test_reset_one_subject() {
        let mut aggregator = MetricsAggregator::new();
        aggregator.update("A", 1.0).unwrap();
        aggregator.update("B", 2.0).unwrap();

        aggregator.reset(Some("A"));

        assert!(aggregator.get("A").is_none());
        let all = aggregator.get_all();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].subject, "B");
    }

    #[test]
    fn test_reset_all() {
        let mut aggregator = MetricsAggregator::new();
        aggregator.update("A", 1.0).unwrap();
        aggregator.update("B", 2.0).unwrap();

        aggregator.reset(None);
        assert!(aggregator.get_all().is_empty());
        assert!(aggregator.is_empty());
    }

    #[test]
    fn test_readded_subject_starts_fresh_and_keeps_position() {
        let mut aggregator = MetricsAggregator::new();
        aggregator.update("A", 100.0).unwrap();
        aggregator.update("B", 1.0).unwrap();
        aggregator.reset(Some("A"));
        aggregator.update("A", 3.0).unwrap();

        let all = aggregator.get_all();
        assert_eq!(all[0].subject, "A");
        assert_eq!(all[0].count, 1);
        assert_eq!(all[0].total_duration, 3.0);
        assert_eq!(all[0].average_duration, 3.0);
    }

    #[test]
    fn test_preregistered_order() {
        let mut aggregator = MetricsAggregator::with_subjects(["redux", "context"]);
        assert!(aggregator.get_all().is_empty());

        aggregator.update("context", 1.0).unwrap();
        aggregator.update("redux", 1.0).unwrap();
        assert_eq!(aggregator.get_all()[0].subject, "redux");
    }

    #[test]
    fn test_record_sample() {
        let mut aggregator = MetricsAggregator::new();
        aggregator.record(&Sample::new("A", 7.0)).unwrap();
        assert_eq!(aggregator.get("A").unwrap().total_duration, 7.0);
    }

    proptest! {
        #[test]
        fn prop_average_is_lifetime_mean(durations in prop::collection::vec(0.0f64..10_000.0, 1..64)) {
            let mut aggregator = MetricsAggregator::new();
            for d in &durations {
                aggregator.update("subject", *d).unwrap();
            }

            let record = aggregator.get("subject").unwrap();
            let expected = durations.iter().sum::<f64>() / durations.len() as f64;
            prop_assert_eq!(record.count, durations.len() as u64);
            prop_assert!((record.average_duration - expected).abs() < 1e-6);
        }

        #[test]
        fn prop_negative_never_mutates(
            durations in prop::collection::vec(0.0f64..1_000.0, 0..16),
            bad in -1_000.0f64..-0.0001,
        ) {
            let mut aggregator = MetricsAggregator::new();
            for d in &durations {
                aggregator.update("subject", *d).unwrap();
            }
            let before = aggregator.get_all();

            prop_assert!(aggregator.update("subject", bad).is_err());
            prop_assert_eq!(aggregator.get_all(), before);
        }
    }
}
