//! Start/stop timing keyed by subject.

use std::collections::HashMap;
use std::sync::Arc;

use crate::aggregator::{MetricsAggregator, Sample};
use crate::clock::Clock;
use crate::error::{PerfError, PerfResult};

/// Pairs `start` and `end` calls per subject and turns them into samples.
///
/// Only one measurement can be in flight per subject. A second `start` for the
/// same subject replaces the first, whose elapsed time is discarded. Timers for
/// different subjects are independent.
pub struct Sampler {
    clock: Arc<dyn Clock>,
    pending: HashMap<String, f64>,
}

impl Sampler {
    /// Create a sampler reading time from `clock`.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            pending: HashMap::new(),
        }
    }

    /// Begin timing `subject`. Overwrites any pending start for it.
    pub fn start(&mut self, subject: &str) {
        let now = self.clock.now_ms();
        if let Some(previous) = self.pending.insert(subject.to_string(), now) {
            tracing::debug!(
                target: "perf::sampler",
                subject,
                discarded_ms = now - previous,
                "restarted pending measurement"
            );
        }
    }

    /// Stop timing `subject` and return the sample without recording it.
    pub fn stop(&mut self, subject: &str) -> PerfResult<Sample> {
        let started = self.pending.remove(subject).ok_or_else(|| {
            tracing::warn!(target: "perf::sampler", subject, "end without matching start");
            PerfError::Measurement {
                subject: subject.to_string(),
            }
        })?;

        let duration_ms = (self.clock.now_ms() - started).max(0.0);
        Ok(Sample::new(subject, duration_ms))
    }

    /// Stop timing `subject`, feed the sample to `aggregator` and return the
    /// measured duration.
    ///
    /// On error the aggregate is left untouched; callers that want the
    /// "duration 0" convention can use `unwrap_or_default()`.
    pub fn end(&mut self, subject: &str, aggregator: &mut MetricsAggregator) -> PerfResult<f64> {
        let sample = self.stop(subject)?;
        aggregator.record(&sample)?;

        tracing::trace!(
            target: "perf::sampler",
            subject,
            duration_ms = sample.duration_ms,
            "measurement completed"
        );
        Ok(sample.duration_ms)
    }

    /// Drop a pending start without recording anything.
    ///
    /// Returns whether a measurement was pending.
    pub fn cancel(&mut self, subject: &str) -> bool {
        self.pending.remove(subject).is_some()
    }

    /// Whether `subject` has a start with no matching end yet.
    pub fn is_pending(&self, subject: &str) -> bool {
        self.pending.contains_key(subject)
    }

    /// Number of subjects currently being timed.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

impl std::fmt::Debug for Sampler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sampler")
            .field("pending", &self.pending)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn sampler_with_clock() -> (Sampler, ManualClock) {
        let clock = ManualClock::new();
        (Sampler::new(Arc::new(clock.clone())), clock)
    }

    #[test]
    fn test_start_end_records_duration() {
        let (mut sampler, clock) = sampler_with_clock();
        let mut aggregator = MetricsAggregator::new();

        sampler.start("redux");
        clock.advance_ms(12.5);
        let duration = sampler.end("redux", &mut aggregator).unwrap();

        assert_eq!(duration, 12.5);
        assert_eq!(aggregator.get("redux").unwrap().count, 1);
        assert!(!sampler.is_pending("redux"));
    }

    #[test]
    fn test_end_without_start() {
        let (mut sampler, _clock) = sampler_with_clock();
        let mut aggregator = MetricsAggregator::new();

        let result = sampler.end("redux", &mut aggregator);
        assert!(matches!(result, Err(PerfError::Measurement { .. })));
        assert_eq!(result.unwrap_or_default(), 0.0);
        assert!(aggregator.get("redux").is_none());
    }

    #[test]
    fn test_latest_start_wins() {
        let (mut sampler, clock) = sampler_with_clock();
        let mut aggregator = MetricsAggregator::new();

        sampler.start("redux");
        clock.advance_ms(10.0);
        sampler.start("redux");
        clock.advance_ms(3.0);

        assert_eq!(sampler.pending_count(), 1);
        assert_eq!(sampler.end("redux", &mut aggregator).unwrap(), 3.0);
    }

    #[test]
    fn test_independent_subjects() {
        let (mut sampler, clock) = sampler_with_clock();
        let mut aggregator = MetricsAggregator::new();

        sampler.start("a");
        clock.advance_ms(5.0);
        sampler.start("b");
        clock.advance_ms(2.0);

        assert_eq!(sampler.end("b", &mut aggregator).unwrap(), 2.0);
        assert_eq!(sampler.end("a", &mut aggregator).unwrap(), 7.0);
    }

    #[test]
    fn test_second_end_fails() {
        let (mut sampler, clock) = sampler_with_clock();
        let mut aggregator = MetricsAggregator::new();

        sampler.start("a");
        clock.advance_ms(1.0);
        sampler.end("a", &mut aggregator).unwrap();
        assert!(sampler.end("a", &mut aggregator).is_err());
        assert_eq!(aggregator.get("a").unwrap().count, 1);
    }

    #[test]
    fn test_cancel() {
        let (mut sampler, _clock) = sampler_with_clock();
        sampler.start("a");
        assert!(sampler.cancel("a"));
        assert!(!sampler.cancel("a"));
        assert!(sampler.stop("a").is_err());
    }
}
