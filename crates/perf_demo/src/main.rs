//! Strategy comparison demo
//!
//! Drives `perf_core` the way the interactive demos do: every state-management
//! strategy handles the same workload while its dispatches are timed live,
//! then each one is benchmarked in isolation and the results are reported.
//!
//! Usage: `perf-demo [config.json]`. Set `RUST_LOG=perf=debug` to see the
//! instrumentation's own logging.

mod strategies;

use anyhow::{Context as _, Result};
use perf_core::{PerfConfig, PerfContext};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use strategies::{StoreFactory, TodoStore};

const LIVE_ACTIONS: usize = 200;
const BENCH_ACTIONS: usize = 500;
const BENCH_ITERATIONS: usize = 20;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let factories = strategies::all();
    let config = load_config(&factories)?;
    let mut ctx = PerfContext::new(config);

    tracing::info!("Measuring live dispatches...");
    for make in &factories {
        measure_live(&mut ctx, make());
    }

    let comparison = ctx.compare();
    println!("Live dispatch ranking:");
    for (position, entry) in comparison.ranking.iter().enumerate() {
        let aggregate = ctx.get_aggregate(&entry.subject);
        println!(
            "  {}. {:<16} score {:>6.2}  avg {:>8.4}ms over {} samples",
            position + 1,
            entry.subject,
            entry.score,
            aggregate.map(|a| a.average_duration).unwrap_or_default(),
            aggregate.map(|a| a.count).unwrap_or_default(),
        );
    }
    if let Some(fastest) = &comparison.fastest {
        println!("  fastest: {fastest}");
    }
    println!();

    tracing::info!("Running isolated benchmarks...");
    for make in factories.iter().copied() {
        let subject = make().name();

        ctx.run_benchmark(
            subject,
            "bulk_dispatch",
            || async move {
                let mut store = make();
                for (i, action) in strategies::workload(BENCH_ACTIONS).enumerate() {
                    store.dispatch(action);
                    // Let other tasks run, as a UI event loop would.
                    if i % 100 == 99 {
                        tokio::task::yield_now().await;
                    }
                }
                store.len()
            },
            BENCH_ITERATIONS,
        )
        .await
        .with_context(|| format!("benchmarking {subject}"))?;

        ctx.run_benchmark_sync(
            subject,
            "snapshot_read",
            || {
                let mut store = make();
                for action in strategies::workload(50) {
                    store.dispatch(action);
                }
                store.open_titles()
            },
            BENCH_ITERATIONS,
        )
        .with_context(|| format!("benchmarking {subject}"))?;
    }

    println!("{}", ctx.generate_report());

    if let Some(best) = ctx.compare_operations("bulk_dispatch").first() {
        println!(
            "Fastest bulk dispatch: {} ({:.4}ms per run)",
            best.subject, best.average_time
        );
    }

    let memory = ctx.get_memory_snapshot();
    println!("Memory: {}", serde_json::to_string(&memory)?);

    Ok(())
}

fn load_config(factories: &[StoreFactory]) -> Result<PerfConfig> {
    match std::env::args().nth(1) {
        Some(path) => {
            tracing::info!("Loading configuration from {}", path);
            PerfConfig::load(&path).with_context(|| format!("loading {path}"))
        }
        None => Ok(PerfConfig::default().with_subjects(factories.iter().map(|make| make().name()))),
    }
}

fn measure_live(ctx: &mut PerfContext, mut store: Box<dyn TodoStore>) {
    let subject = store.name();
    for action in strategies::workload(LIVE_ACTIONS) {
        ctx.start_measure(subject);
        store.dispatch(action);
        if let Err(e) = ctx.end_measure(subject) {
            tracing::warn!("Dropped sample for {}: {}", subject, e);
        }
    }
}
