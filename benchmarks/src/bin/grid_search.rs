//! Sweep the pipeline grid against one workload.
//!
//! ```text
//! cargo run --release -p benchmarks --bin grid_search -- [listings.csv]
//! ```
//!
//! Without a CSV path the sweep runs on synthetic listings. Every run is
//! appended to `benchmarks/results/grid_search.jsonl`; the sweep stops early
//! once a run reaches the target eval RMSLE.

use benchmarks::{grid, predict_latency, time_fn, FanOutSink, Workload};
use resale_pricer::experiment::{ExperimentRunner, JsonLinesSink, MemorySink, RunOptions, TrackingSink};
use resale_pricer::Model;
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const SEED: u64 = 42;
const SYNTHETIC_ROWS: usize = 2000;
const TARGET_RMSLE: f64 = 0.05;
const RESULTS_DIR: &str = "benchmarks/results";
const RESULTS: &str = "benchmarks/results/grid_search.jsonl";

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let csv = std::env::args().nth(1);
    let workload = match Workload::load(csv.as_deref(), SYNTHETIC_ROWS, SEED) {
        Ok(workload) => workload,
        Err(e) => {
            error!(error = %e, "failed to build workload");
            return ExitCode::FAILURE;
        }
    };
    info!(
        source = %workload.source,
        train = workload.splits.train.len(),
        eval = workload.splits.eval.len(),
        "loaded workload"
    );

    if let Err(e) = std::fs::create_dir_all(RESULTS_DIR) {
        error!(error = %e, dir = RESULTS_DIR, "cannot create results directory");
        return ExitCode::FAILURE;
    }
    let mut memory = MemorySink::new().with_target("rmsle_eval", TARGET_RMSLE);
    let mut jsonl = JsonLinesSink::new(RESULTS);
    let runner = ExperimentRunner::new(RunOptions::default().with_test(true));

    let mut best_model: Option<(f64, Model)> = None;
    println!("{:<24} {:>10} {:>10} {:>10} {:>9}", "model", "rmsle_trn", "rmsle_eval", "wape_eval", "fit_ms");
    println!("{}", "-".repeat(67));
    {
        let sinks: Vec<&mut dyn TrackingSink> = vec![&mut memory, &mut jsonl];
        let mut sink = FanOutSink::new(sinks);

        for config in grid(SEED) {
            let name = config.model_name().to_string();
            let (result, elapsed) = time_fn(|| runner.run(config, &workload.splits, &mut sink));
            match result {
                Ok(outcome) => {
                    println!(
                        "{:<24} {:>10.4} {:>10.4} {:>10.4} {:>9.1}",
                        name,
                        outcome.train.rmsle,
                        outcome.metric(),
                        outcome.eval.wape,
                        elapsed.as_secs_f64() * 1000.0
                    );
                    if best_model.as_ref().map_or(true, |(m, _)| outcome.metric() < *m) {
                        best_model = Some((outcome.metric(), outcome.model));
                    }
                }
                Err(e) => warn!(model = %name, error = %e, "run failed"),
            }
            if sink.should_stop() {
                info!(threshold = TARGET_RMSLE, "target reached, stopping sweep");
                break;
            }
        }
    }

    match memory.best("rmsle_eval") {
        Some(best) => {
            println!();
            println!("best: {} (eval RMSLE {:.4})", best.model_name, best.metrics["rmsle_eval"]);
            if let Ok(json) = serde_json::to_string_pretty(&best.config) {
                println!("{}", json);
            }
            if let (Some((_, model)), Some(row)) = (&best_model, workload.single_row()) {
                match predict_latency(model, row, 10, 200) {
                    Ok(stats) => println!(
                        "single-row predict: mean {:.3} ms, p95 {:.3} ms, max {:.3} ms",
                        stats.mean_ms, stats.p95_ms, stats.max_ms
                    ),
                    Err(e) => warn!(error = %e, "latency measurement failed"),
                }
            }
            ExitCode::SUCCESS
        }
        None => {
            error!("no run completed");
            ExitCode::FAILURE
        }
    }
}
