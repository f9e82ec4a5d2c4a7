//! Wall-clock helpers for the sweep binary.

use resale_pricer::{Listing, Model, Result};
use std::time::{Duration, Instant};

/// Run `f` once and return its result with the elapsed time.
pub fn time_fn<F, R>(f: F) -> (R, Duration)
where
    F: FnOnce() -> R,
{
    let start = Instant::now();
    let result = f();
    (result, start.elapsed())
}

/// Latency distribution in milliseconds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LatencyStats {
    pub samples: usize,
    pub mean_ms: f64,
    pub median_ms: f64,
    pub p95_ms: f64,
    pub max_ms: f64,
}

impl LatencyStats {
    /// Summarise raw samples; all zeros when there are none.
    pub fn from_samples(mut samples: Vec<f64>) -> Self {
        if samples.is_empty() {
            return Self::default();
        }
        samples.sort_by(f64::total_cmp);
        let n = samples.len();
        let at = |q: f64| samples[((n as f64 * q) as usize).min(n - 1)];
        Self {
            samples: n,
            mean_ms: samples.iter().sum::<f64>() / n as f64,
            median_ms: if n % 2 == 0 {
                (samples[n / 2 - 1] + samples[n / 2]) / 2.0
            } else {
                samples[n / 2]
            },
            p95_ms: at(0.95),
            max_ms: samples[n - 1],
        }
    }
}

/// Single-row predict latency, the serving-path cost of a fitted model.
///
/// `warmup` calls run first and are not measured. The first failing
/// prediction aborts the measurement.
pub fn predict_latency(model: &Model, row: &Listing, warmup: usize, iterations: usize) -> Result<LatencyStats> {
    let rows = std::slice::from_ref(row);
    for _ in 0..warmup {
        model.predict(rows)?;
    }
    let mut samples = Vec::with_capacity(iterations);
    for _ in 0..iterations {
        let (prediction, elapsed) = time_fn(|| model.predict(rows));
        prediction?;
        samples.push(elapsed.as_secs_f64() * 1000.0);
    }
    Ok(LatencyStats::from_samples(samples))
}

#[cfg(test)]
mod tests {
    use super::*;
    use resale_pricer::data::synthetic;
    use resale_pricer::PipelineConfig;

    #[test]
    fn test_latency_stats() {
        let stats = LatencyStats::from_samples(vec![5.0, 1.0, 3.0, 2.0, 4.0]);
        assert_eq!(stats.samples, 5);
        assert!((stats.mean_ms - 3.0).abs() < 1e-12);
        assert_eq!(stats.median_ms, 3.0);
        assert_eq!(stats.p95_ms, 5.0);
        assert_eq!(stats.max_ms, 5.0);
        assert_eq!(LatencyStats::from_samples(Vec::new()), LatencyStats::default());
    }

    #[test]
    fn test_predict_latency_counts_samples() {
        let data = synthetic::generate(40, 1);
        let mut model = Model::new(PipelineConfig::default()).unwrap();
        model.fit(&data.listings, &data.prices).unwrap();
        let stats = predict_latency(&model, &data.listings[0], 2, 20).unwrap();
        assert_eq!(stats.samples, 20);
        assert!(stats.max_ms >= stats.median_ms);
    }

    #[test]
    fn test_predict_latency_requires_fitted_model() {
        let data = synthetic::generate(2, 1);
        let model = Model::new(PipelineConfig::default()).unwrap();
        assert!(predict_latency(&model, &data.listings[0], 0, 3).is_err());
    }
}
