//! Controlled, repeated execution of a single operation.
//!
//! A benchmark runs its trials strictly one after another: the timer for the
//! next trial does not start until the previous operation, including any
//! `.await` inside it, has completed. Results go to an append-only log that is
//! independent of the live aggregates.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use perf_core::{BenchmarkRunner, MonotonicClock};
//!
//! let mut runner = BenchmarkRunner::new(Arc::new(MonotonicClock::new()));
//! let result = runner
//!     .run_sync("vec", "push_1k", || (0..1000).collect::<Vec<u32>>(), 5)
//!     .unwrap();
//! assert_eq!(result.iterations, 5);
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::future::Future;
use std::hint::black_box;
use std::sync::Arc;

use crate::clock::Clock;
use crate::error::{PerfError, PerfResult};
use crate::report::BenchmarkReport;
use crate::stats::TimingStats;

/// Upper bound on trial slots reserved up front. Longer runs grow as needed.
const PREALLOCATED_TRIALS: usize = 1024;

/// Outcome of one benchmark run. Immutable once logged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BenchmarkResult {
    pub subject: String,
    pub operation_label: String,
    /// Trials actually completed
    pub iterations: usize,
    /// Trials asked for; larger than `iterations` when cancelled early
    pub requested_iterations: usize,
    pub total_duration: f64,
    /// `total_duration / iterations`
    pub average_time: f64,
    pub stats: TimingStats,
    pub recorded_at: DateTime<Utc>,
}

impl BenchmarkResult {
    pub fn was_cancelled(&self) -> bool {
        self.iterations < self.requested_iterations
    }
}

/// Runs benchmarks and keeps their results.
pub struct BenchmarkRunner {
    clock: Arc<dyn Clock>,
    results: Vec<BenchmarkResult>,
    warmup_iterations: usize,
}

impl BenchmarkRunner {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            results: Vec::new(),
            warmup_iterations: 0,
        }
    }

    /// Invoke the operation this many times, untimed, before each run.
    pub fn with_warmup(mut self, iterations: usize) -> Self {
        self.warmup_iterations = iterations;
        self
    }

    /// Benchmark an asynchronous operation.
    pub async fn run<F, Fut, T>(
        &mut self,
        subject: &str,
        operation_label: &str,
        operation: F,
        iterations: usize,
    ) -> PerfResult<BenchmarkResult>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = T>,
    {
        self.run_until(subject, operation_label, operation, iterations, |_| false)
            .await
    }

    /// Benchmark an asynchronous operation, stopping early once
    /// `should_cancel(completed_trials)` returns true.
    ///
    /// Cancellation is only checked between trials, so at least one trial
    /// always completes.
    pub async fn run_until<F, Fut, T, C>(
        &mut self,
        subject: &str,
        operation_label: &str,
        mut operation: F,
        iterations: usize,
        mut should_cancel: C,
    ) -> PerfResult<BenchmarkResult>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = T>,
        C: FnMut(usize) -> bool,
    {
        check_iterations(iterations)?;

        for _ in 0..self.warmup_iterations {
            black_box(operation().await);
        }

        let mut durations = Vec::with_capacity(iterations.min(PREALLOCATED_TRIALS));
        while durations.len() < iterations {
            let started = self.clock.now_ms();
            black_box(operation().await);
            durations.push((self.clock.now_ms() - started).max(0.0));

            if durations.len() < iterations && should_cancel(durations.len()) {
                break;
            }
        }

        Ok(self.commit(subject, operation_label, iterations, durations))
    }

    /// Benchmark a synchronous operation.
    pub fn run_sync<F, T>(
        &mut self,
        subject: &str,
        operation_label: &str,
        operation: F,
        iterations: usize,
    ) -> PerfResult<BenchmarkResult>
    where
        F: FnMut() -> T,
    {
        self.run_sync_until(subject, operation_label, operation, iterations, |_| false)
    }

    /// Synchronous counterpart of [`run_until`](Self::run_until).
    pub fn run_sync_until<F, T, C>(
        &mut self,
        subject: &str,
        operation_label: &str,
        mut operation: F,
        iterations: usize,
        mut should_cancel: C,
    ) -> PerfResult<BenchmarkResult>
    where
        F: FnMut() -> T,
        C: FnMut(usize) -> bool,
    {
        check_iterations(iterations)?;

        for _ in 0..self.warmup_iterations {
            black_box(operation());
        }

        let mut durations = Vec::with_capacity(iterations.min(PREALLOCATED_TRIALS));
        while durations.len() < iterations {
            let started = self.clock.now_ms();
            black_box(operation());
            durations.push((self.clock.now_ms() - started).max(0.0));

            if durations.len() < iterations && should_cancel(durations.len()) {
                break;
            }
        }

        Ok(self.commit(subject, operation_label, iterations, durations))
    }

    fn commit(
        &mut self,
        subject: &str,
        operation_label: &str,
        requested: usize,
        durations: Vec<f64>,
    ) -> BenchmarkResult {
        let stats = TimingStats::from_samples(&durations);
        let result = BenchmarkResult {
            subject: subject.to_string(),
            operation_label: operation_label.to_string(),
            iterations: durations.len(),
            requested_iterations: requested,
            total_duration: stats.total_ms,
            average_time: stats.total_ms / durations.len() as f64,
            stats,
            recorded_at: Utc::now(),
        };

        if result.was_cancelled() {
            tracing::info!(
                target: "perf::runner",
                subject,
                operation = operation_label,
                completed = result.iterations,
                requested,
                "benchmark cancelled early"
            );
        }
        tracing::debug!(
            target: "perf::runner",
            subject,
            operation = operation_label,
            iterations = result.iterations,
            average_ms = result.average_time,
            total_ms = result.total_duration,
            "benchmark completed"
        );

        self.results.push(result.clone());
        result
    }

    /// Copy of the result log, oldest first.
    pub fn results(&self) -> Vec<BenchmarkResult> {
        self.results.clone()
    }

    /// Results for one operation, fastest average first.
    pub fn compare_operations(&self, operation_label: &str) -> Vec<BenchmarkResult> {
        let mut matching: Vec<BenchmarkResult> = self
            .results
            .iter()
            .filter(|result| result.operation_label == operation_label)
            .cloned()
            .collect();
        matching.sort_by(|a, b| {
            a.average_time
                .partial_cmp(&b.average_time)
                .unwrap_or(Ordering::Equal)
        });
        matching
    }

    /// Structured report over the whole log.
    pub fn report(&self) -> BenchmarkReport {
        BenchmarkReport::from_results(&self.results)
    }

    /// Text tables, one per operation label.
    pub fn generate_report(&self) -> String {
        self.report().render()
    }

    pub fn clear(&mut self) {
        self.results.clear();
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

impl std::fmt::Debug for BenchmarkRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BenchmarkRunner")
            .field("results", &self.results.len())
            .field("warmup_iterations", &self.warmup_iterations)
            .finish_non_exhaustive()
    }
}

fn check_iterations(iterations: usize) -> PerfResult<()> {
    if iterations == 0 {
        tracing::debug!(target: "perf::runner", "benchmark rejected: zero iterations");
        return Err(PerfError::InvalidIterationCount {
            requested: iterations,
        });
    }
    Ok(())
}
