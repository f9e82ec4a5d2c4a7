//! Benchmark utilities and sweep helpers for resale-pricer.
//!
//! This library provides the shared pieces used by the criterion benches and
//! the `grid_search` binary:
//!
//! - Workload construction (synthetic listings or a CSV export)
//! - A fan-out tracking sink for sweeps
//! - Timing and predict-latency helpers

pub mod data;
pub mod sweep;
pub mod utils;

pub use data::Workload;
pub use sweep::{grid, FanOutSink};
pub use utils::{predict_latency, time_fn, LatencyStats};
