//! Comparative Performance Measurement
//!
//! This crate times operations, aggregates running statistics per *subject*
//! (one of several alternative strategies being compared), ranks subjects by
//! score, and runs isolated repeated-execution benchmarks:
//! - Start/end timing keyed by subject, feeding lifetime aggregates
//! - Scores and rankings derived from those aggregates
//! - Sequential benchmarks of sync or async operations, with cooperative
//!   cancellation and a text/JSON report
//! - Memory usage snapshots with a trend over a bounded window
//!
//! All state lives in a caller-owned [`PerfContext`]; there is no global
//! instance.
//!
//! # Feature Flags
//!
//! - `host-memory` (default): read process memory through `sysinfo`. Without
//!   it, memory snapshots are always the "unavailable" sentinel.
//!
//! # Example
//!
//! ```rust
//! use perf_core::{PerfConfig, PerfContext};
//!
//! let mut ctx = PerfContext::new(PerfConfig::default().with_subjects(["vec", "list"]));
//!
//! ctx.start_measure("vec");
//! let v: Vec<u32> = (0..100).collect();
//! ctx.end_measure("vec").unwrap_or_default();
//!
//! ctx.measure("list", || (0..100).collect::<std::collections::LinkedList<u32>>());
//!
//! let comparison = ctx.compare();
//! assert_eq!(comparison.ranking.len(), 2);
//!
//! ctx.run_benchmark_sync("vec", "collect_100", || (0..100).collect::<Vec<u32>>(), 10)
//!     .unwrap();
//! println!("{}", ctx.generate_report());
//! # drop(v);
//! ```

pub mod aggregator;
pub mod clock;
mod config;
mod context;
mod error;
pub mod memory;
pub mod report;
pub mod runner;
pub mod sampler;
pub mod score;
mod stats;

pub use aggregator::{AggregateRecord, MetricsAggregator, Sample};
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use config::{PerfConfig, DEFAULT_TREND_WINDOW};
pub use context::PerfContext;
pub use error::{PerfError, PerfResult};
pub use memory::{HeapUsage, MemoryMonitor, MemoryProbe, MemorySnapshot, MemoryTrend, NoopProbe};
pub use report::{BenchmarkReport, ReportGroup, ReportRow};
pub use runner::{BenchmarkResult, BenchmarkRunner};
pub use sampler::Sampler;
pub use score::{Comparison, RankedSubject, ScoreCalculator, SCORE_CEILING};
pub use stats::TimingStats;

#[cfg(feature = "host-memory")]
pub use memory::ProcessMemoryProbe;
