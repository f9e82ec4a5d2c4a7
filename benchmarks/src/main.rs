// Entry point listing the available benches and sweeps.

fn main() {
    println!("resale-pricer benchmark suite");
    println!();
    println!("Usage:");
    println!("  cargo bench -p benchmarks");
    println!("  cargo bench -p benchmarks --bench <benchmark_name>");
    println!("  cargo run --release -p benchmarks --bin grid_search -- [listings.csv]");
    println!();
    println!("Available benchmarks:");
    println!("  - pipeline: fit time per estimator and single-row / batch predict latency");
    println!("  - metrics: RMSLE and WAPE over growing prediction vectors");
    println!();
    println!("Set RUST_LOG=debug for per-component logging during sweeps.");
}
