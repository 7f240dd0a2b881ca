//! Caller-owned measurement session.

use std::future::Future;
use std::sync::Arc;

use crate::aggregator::{AggregateRecord, MetricsAggregator};
use crate::clock::{Clock, MonotonicClock};
use crate::config::PerfConfig;
use crate::error::PerfResult;
use crate::memory::{default_probe, MemoryMonitor, MemoryProbe, MemorySnapshot, NoopProbe};
use crate::report::BenchmarkReport;
use crate::runner::{BenchmarkResult, BenchmarkRunner};
use crate::sampler::Sampler;
use crate::score::{Comparison, ScoreCalculator};

/// Everything a caller needs to measure, compare and benchmark.
///
/// Each context is an isolated session: two contexts never share samples,
/// aggregates or benchmark results. Mutating methods take `&mut self`; hosts
/// that measure from several threads should wrap the context in a `Mutex`.
///
/// # Example
///
/// ```rust
/// use perf_core::{PerfConfig, PerfContext};
///
/// let mut ctx = PerfContext::new(PerfConfig::default());
/// let sum: u64 = ctx.measure("iterator", || (0..1_000u64).sum());
/// assert_eq!(sum, 499_500);
/// assert_eq!(ctx.get_aggregate("iterator").unwrap().count, 1);
/// ```
#[derive(Debug)]
pub struct PerfContext {
    config: PerfConfig,
    sampler: Sampler,
    aggregator: MetricsAggregator,
    scores: ScoreCalculator,
    runner: BenchmarkRunner,
    memory: MemoryMonitor,
}

impl PerfContext {
    /// Build a context on the wall clock, probing host memory if both the
    /// build and `config` allow it.
    pub fn new(config: PerfConfig) -> Self {
        let probe: Box<dyn MemoryProbe> = if config.probe_host_memory {
            default_probe()
        } else {
            Box::new(NoopProbe)
        };
        Self::with_parts(config, Arc::new(MonotonicClock::new()), probe)
    }

    /// Build a context with an explicit clock and memory probe.
    pub fn with_parts(
        config: PerfConfig,
        clock: Arc<dyn Clock>,
        probe: Box<dyn MemoryProbe>,
    ) -> Self {
        tracing::debug!(
            target: "perf::context",
            probe = probe.name(),
            trend_window = config.trend_window,
            warmup = config.warmup_iterations,
            "perf context created"
        );

        Self {
            sampler: Sampler::new(clock.clone()),
            aggregator: MetricsAggregator::with_subjects(&config.subjects),
            scores: ScoreCalculator::new(),
            runner: BenchmarkRunner::new(clock).with_warmup(config.warmup_iterations),
            memory: MemoryMonitor::new(probe, config.trend_window),
            config,
        }
    }

    /// The configuration this context was built from.
    pub fn config(&self) -> &PerfConfig {
        &self.config
    }

    /// Fix a subject's position in rankings before it has any samples.
    pub fn register_subject(&mut self, subject: &str) {
        self.aggregator.register(subject);
    }

    // Live measurement

    /// Begin timing `subject`. A second start before the matching end
    /// replaces the first.
    pub fn start_measure(&mut self, subject: &str) {
        self.sampler.start(subject);
    }

    /// Finish the pending measurement for `subject` and fold it into the
    /// aggregates. See [`Sampler::end`].
    pub fn end_measure(&mut self, subject: &str) -> PerfResult<f64> {
        self.sampler.end(subject, &mut self.aggregator)
    }

    /// Time a synchronous closure as one sample for `subject`.
    pub fn measure<F, T>(&mut self, subject: &str, f: F) -> T
    where
        F: FnOnce() -> T,
    {
        self.start_measure(subject);
        let output = f();
        if let Err(e) = self.end_measure(subject) {
            tracing::warn!(target: "perf::context", "Dropped sample for {}: {}", subject, e);
        }
        output
    }

    /// Lifetime aggregate for `subject`, if it has any samples.
    pub fn get_aggregate(&self, subject: &str) -> Option<&AggregateRecord> {
        self.aggregator.get(subject)
    }

    /// Every live aggregate, in registration order.
    pub fn get_all_aggregates(&self) -> Vec<AggregateRecord> {
        self.aggregator.get_all()
    }

    /// Drop one subject's aggregate, or all of them when `subject` is `None`.
    pub fn reset_aggregates(&mut self, subject: Option<&str>) {
        self.aggregator.reset(subject);
    }

    /// Score every subject with samples and rank them fastest first.
    pub fn compare(&self) -> Comparison {
        self.scores.compare(&self.aggregator)
    }

    // Benchmarks

    /// Run `operation` `iterations` times, one trial after another, and log
    /// the result.
    pub async fn run_benchmark<F, Fut, T>(
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
        self.runner
            .run(subject, operation_label, operation, iterations)
            .await
    }

    /// Like [`run_benchmark`](Self::run_benchmark), but stops early once
    /// `should_cancel(completed)` returns true between trials.
    pub async fn run_benchmark_until<F, Fut, T, C>(
        &mut self,
        subject: &str,
        operation_label: &str,
        operation: F,
        iterations: usize,
        should_cancel: C,
    ) -> PerfResult<BenchmarkResult>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = T>,
        C: FnMut(usize) -> bool,
    {
        self.runner
            .run_until(subject, operation_label, operation, iterations, should_cancel)
            .await
    }

    /// Benchmark a synchronous operation.
    pub fn run_benchmark_sync<F, T>(
        &mut self,
        subject: &str,
        operation_label: &str,
        operation: F,
        iterations: usize,
    ) -> PerfResult<BenchmarkResult>
    where
        F: FnMut() -> T,
    {
        self.runner
            .run_sync(subject, operation_label, operation, iterations)
    }

    /// Synchronous counterpart of
    /// [`run_benchmark_until`](Self::run_benchmark_until).
    pub fn run_benchmark_sync_until<F, T, C>(
        &mut self,
        subject: &str,
        operation_label: &str,
        operation: F,
        iterations: usize,
        should_cancel: C,
    ) -> PerfResult<BenchmarkResult>
    where
        F: FnMut() -> T,
        C: FnMut(usize) -> bool,
    {
        self.runner
            .run_sync_until(subject, operation_label, operation, iterations, should_cancel)
    }

    /// A copy of the benchmark log, oldest first.
    pub fn get_benchmark_results(&self) -> Vec<BenchmarkResult> {
        self.runner.results()
    }

    /// Logged results for `operation_label`, fastest average first.
    pub fn compare_operations(&self, operation_label: &str) -> Vec<BenchmarkResult> {
        self.runner.compare_operations(operation_label)
    }

    /// Text tables of every logged benchmark, grouped by operation.
    pub fn generate_report(&self) -> String {
        self.runner.generate_report()
    }

    /// The same grouping as [`generate_report`](Self::generate_report), as data.
    pub fn benchmark_report(&self) -> BenchmarkReport {
        self.runner.report()
    }

    /// Empty the benchmark log. Aggregates are untouched.
    pub fn clear_benchmarks(&mut self) {
        self.runner.clear();
    }

    // Memory

    /// Current memory usage and its trend over the configured window.
    pub fn get_memory_snapshot(&mut self) -> MemorySnapshot {
        self.memory.snapshot()
    }
}

impl Default for PerfContext {
    fn default() -> Self {
        Self::new(PerfConfig::default())
    }
}
