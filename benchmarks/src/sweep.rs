//! Grid construction and sink fan-out for hyperparameter sweeps.

use resale_pricer::experiment::{RunRecord, TrackingSink};
use resale_pricer::{
    BoostingParams, EstimatorConfig, PipelineConfig, ReducerConfig, ReducerKind, Result,
    TextConfig,
};

/// Forwards every record to each inner sink; stops when any of them asks to.
pub struct FanOutSink<'a> {
    sinks: Vec<&'a mut dyn TrackingSink>,
}

impl<'a> FanOutSink<'a> {
    pub fn new(sinks: Vec<&'a mut dyn TrackingSink>) -> Self {
        Self { sinks }
    }
}

impl TrackingSink for FanOutSink<'_> {
    fn record(&mut self, record: &RunRecord) -> Result<()> {
        for sink in self.sinks.iter_mut() {
            sink.record(record)?;
        }
        Ok(())
    }

    fn should_stop(&self) -> bool {
        self.sinks.iter().any(|s| s.should_stop())
    }
}

/// Configurations swept by `grid_search`, each under a distinct model name.
///
/// Covers the median baseline, ridge over a range of penalties with and
/// without the text branch, and gradient boosting over learning rate and depth.
pub fn grid(seed: u64) -> Vec<PipelineConfig> {
    let text = TextConfig::default().with_reducer(Some(ReducerConfig::new(ReducerKind::Pca, 32)));
    let mut configs = vec![PipelineConfig::new("median")
        .with_seed(seed)
        .with_estimator(EstimatorConfig::median())];

    for alpha in [0.1, 1.0, 10.0] {
        for use_text in [false, true] {
            let name = format!("ridge-a{}-{}", alpha, if use_text { "text" } else { "tab" });
            configs.push(
                PipelineConfig::new(name)
                    .with_seed(seed)
                    .with_estimator(EstimatorConfig::ridge(alpha))
                    .with_text(use_text)
                    .with_text_config(text.clone()),
            );
        }
    }

    for learning_rate in [0.05, 0.1, 0.3] {
        for max_depth in [2, 4] {
            let params = BoostingParams {
                learning_rate,
                max_depth,
                ..BoostingParams::default()
            };
            configs.push(
                PipelineConfig::new(format!("gboost-lr{}-d{}", learning_rate, max_depth))
                    .with_seed(seed)
                    .with_estimator(EstimatorConfig::gradient_boosting(params)),
            );
        }
    }
    configs
}

#[cfg(test)]
mod tests {
    use super::*;
    use resale_pricer::MemorySink;
    use std::collections::{BTreeMap, HashSet};

    #[test]
    fn test_grid_configs_are_valid_and_uniquely_named() {
        let configs = grid(1);
        assert_eq!(configs.len(), 13);
        let names: HashSet<&str> = configs.iter().map(|c| c.model_name()).collect();
        assert_eq!(names.len(), configs.len());
        for config in &configs {
            config.validate().unwrap();
        }
    }

    #[test]
    fn test_fan_out_reaches_every_sink() {
        let mut first = MemorySink::new();
        let mut second = MemorySink::new().with_target("rmsle_eval", 0.5);
        let record = RunRecord {
            model_name: "m".to_string(),
            config: BTreeMap::new(),
            metrics: BTreeMap::from([("rmsle_eval".to_string(), 0.4)]),
        };
        {
            let sinks: Vec<&mut dyn TrackingSink> = vec![&mut first, &mut second];
            let mut sink = FanOutSink::new(sinks);
            assert!(!sink.should_stop());
            sink.record(&record).unwrap();
            assert!(sink.should_stop());
        }
        assert_eq!(first.records().len(), 1);
        assert_eq!(second.records().len(), 1);
    }
}
