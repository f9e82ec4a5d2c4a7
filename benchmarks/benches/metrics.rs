use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use resale_pricer::metrics::Metrics;

fn prices(n: usize) -> (Vec<f64>, Vec<f64>) {
    let y_true: Vec<f64> = (0..n).map(|i| 20.0 + (i % 97) as f64).collect();
    let y_pred: Vec<f64> = y_true.iter().map(|p| p * 1.1 + 0.5).collect();
    (y_true, y_pred)
}

fn bench_rmsle(c: &mut Criterion) {
    for size in [100, 1000, 10000, 100000] {
        c.bench_with_input(BenchmarkId::new("rmsle", size), &size, |b, &n| {
            let (y_true, y_pred) = prices(n);
            b.iter(|| black_box(Metrics::rmsle(black_box(&y_true), black_box(&y_pred))));
        });
    }
}

fn bench_wape(c: &mut Criterion) {
    for size in [100, 1000, 10000, 100000] {
        c.bench_with_input(BenchmarkId::new("wape", size), &size, |b, &n| {
            let (y_true, y_pred) = prices(n);
            b.iter(|| black_box(Metrics::wape(black_box(&y_true), black_box(&y_pred))));
        });
    }
}

criterion_group!(benches, bench_rmsle, bench_wape);
criterion_main!(benches);
