//! Experiment runner and tracking sinks.
//!
//! [`ExperimentRunner::run`] drives one configuration through
//! `fit → evaluate → record` against a set of [`Splits`]. The runner keeps no
//! state between calls, so a sweep driver can call it repeatedly with varied
//! configurations and consult [`TrackingSink::should_stop`] between runs.

use crate::config::PipelineConfig;
use crate::data::split::Splits;
use crate::error::Result;
use crate::model::{Evaluation, Model};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

/// What a run does besides fitting and evaluating on train/eval.
#[derive(Clone, Debug, Default)]
pub struct RunOptions {
    pub evaluate_test: bool,
    pub save_dir: Option<PathBuf>,
}

impl RunOptions {
    pub fn with_test(mut self, evaluate_test: bool) -> Self {
        self.evaluate_test = evaluate_test;
        self
    }

    pub fn with_save_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.save_dir = Some(dir.into());
        self
    }
}

/// One tracked run: the flattened configuration and its metrics.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub model_name: String,
    pub config: BTreeMap<String, Value>,
    pub metrics: BTreeMap<String, f64>,
}

impl RunRecord {
    pub fn metric(&self, name: &str) -> Option<f64> {
        self.metrics.get(name).copied()
    }
}

/// Destination for run records.
pub trait TrackingSink {
    fn record(&mut self, record: &RunRecord) -> Result<()>;

    /// Early-stopping signal for sweep drivers.
    fn should_stop(&self) -> bool {
        false
    }
}

/// Keeps records in memory; signals a stop once a metric reaches a target.
#[derive(Clone, Debug, Default)]
pub struct MemorySink {
    records: Vec<RunRecord>,
    target: Option<(String, f64)>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop once `metric` is at or below `threshold` in any recorded run.
    pub fn with_target(mut self, metric: impl Into<String>, threshold: f64) -> Self {
        self.target = Some((metric.into(), threshold));
        self
    }

    pub fn records(&self) -> &[RunRecord] {
        &self.records
    }

    /// Record with the lowest value of `metric`.
    pub fn best(&self, metric: &str) -> Option<&RunRecord> {
        self.records
            .iter()
            .filter_map(|r| r.metric(metric).map(|v| (v, r)))
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, r)| r)
    }
}

impl TrackingSink for MemorySink {
    fn record(&mut self, record: &RunRecord) -> Result<()> {
        self.records.push(record.clone());
        Ok(())
    }

    fn should_stop(&self) -> bool {
        match &self.target {
            Some((metric, threshold)) => self
                .records
                .iter()
                .any(|r| r.metric(metric).is_some_and(|v| v <= *threshold)),
            None => false,
        }
    }
}

/// Appends one JSON object per run to a file.
#[derive(Clone, Debug)]
pub struct JsonLinesSink {
    path: PathBuf,
}

impl JsonLinesSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read back every record written so far.
    pub fn read_all(&self) -> Result<Vec<RunRecord>> {
        let contents = std::fs::read_to_string(&self.path)?;
        contents
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| Ok(serde_json::from_str(line)?))
            .collect()
    }
}

impl TrackingSink for JsonLinesSink {
    fn record(&mut self, record: &RunRecord) -> Result<()> {
        let line = serde_json::to_string(record)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", line)?;
        Ok(())
    }
}

/// Result of one run.
#[derive(Debug)]
pub struct ExperimentOutcome {
    pub train: Evaluation,
    pub eval: Evaluation,
    pub test: Option<Evaluation>,
    pub model: Model,
    pub artifact: Option<PathBuf>,
}

impl ExperimentOutcome {
    /// Metric the run is compared on: eval RMSLE.
    pub fn metric(&self) -> f64 {
        self.eval.rmsle
    }
}

#[derive(Clone, Debug, Default)]
pub struct ExperimentRunner {
    options: RunOptions,
}

impl ExperimentRunner {
    pub fn new(options: RunOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &RunOptions {
        &self.options
    }

    /// Fit `config` on the train split, evaluate, record and optionally save.
    ///
    /// # Errors
    /// Errors from configuration, fitting, evaluation, the sink or saving
    /// propagate unmodified. Nothing is recorded for a failed run.
    pub fn run(
        &self,
        config: PipelineConfig,
        splits: &Splits,
        sink: &mut dyn TrackingSink,
    ) -> Result<ExperimentOutcome> {
        let flat = config.to_flat();
        let model_name = config.model_name().to_string();
        info!(
            model = %model_name,
            train = splits.train.len(),
            eval = splits.eval.len(),
            test = splits.test.len(),
            "starting experiment run"
        );

        let mut model = Model::new(config)?;
        model.fit(&splits.train.listings, &splits.train.prices)?;

        let train = model.evaluate(&splits.train.listings, &splits.train.prices)?;
        let eval = model.evaluate(&splits.eval.listings, &splits.eval.prices)?;
        let test = if self.options.evaluate_test {
            Some(model.evaluate(&splits.test.listings, &splits.test.prices)?)
        } else {
            None
        };

        let mut metrics = BTreeMap::new();
        for (split, evaluation) in [("train", Some(train)), ("eval", Some(eval)), ("test", test)] {
            if let Some(e) = evaluation {
                metrics.insert(format!("rmsle_{}", split), e.rmsle);
                metrics.insert(format!("wape_{}", split), e.wape);
            }
        }
        sink.record(&RunRecord {
            model_name: model_name.clone(),
            config: flat,
            metrics,
        })?;

        let artifact = match &self.options.save_dir {
            Some(dir) => Some(model.save(dir)?),
            None => None,
        };

        info!(
            model = %model_name,
            rmsle_train = train.rmsle,
            rmsle_eval = eval.rmsle,
            rmsle_test = test.map(|e| e.rmsle),
            "finished experiment run"
        );

        Ok(ExperimentOutcome {
            train,
            eval,
            test,
            model,
            artifact,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EstimatorConfig, EstimatorKind};
    use crate::data::split::{train_eval_test_split, SplitRatios};
    use crate::data::synthetic;

    fn splits() -> Splits {
        let data = synthetic::generate(120, 11);
        train_eval_test_split(&data, SplitRatios::default(), 11).unwrap()
    }

    #[test]
    fn test_run_records_flat_config_and_metrics() {
        let splits = splits();
        let mut sink = MemorySink::new();
        let runner = ExperimentRunner::new(RunOptions::default().with_test(true));
        let outcome = runner
            .run(PipelineConfig::new("ridge-run"), &splits, &mut sink)
            .unwrap();

        assert_eq!(sink.records().len(), 1);
        let record = &sink.records()[0];
        assert_eq!(record.model_name, "ridge-run");
        assert_eq!(record.config["estimator.kind"], Value::from("ridge"));
        assert_eq!(record.metric("rmsle_eval"), Some(outcome.metric()));
        for key in ["rmsle_train", "wape_train", "wape_eval", "rmsle_test", "wape_test"] {
            assert!(record.metrics.contains_key(key), "missing {}", key);
        }
        assert!(outcome.test.is_some());
        assert!(outcome.model.is_fitted());
    }

    #[test]
    fn test_repeated_runs_are_independent() {
        let splits = splits();
        let runner = ExperimentRunner::default();
        let mut sink = MemorySink::new();
        let first = runner.run(PipelineConfig::default(), &splits, &mut sink).unwrap();
        let median = PipelineConfig::new("median").with_estimator(EstimatorConfig::median());
        runner.run(median, &splits, &mut sink).unwrap();
        let again = runner.run(PipelineConfig::default(), &splits, &mut sink).unwrap();

        assert_eq!(first.metric(), again.metric());
        assert!(first.test.is_none());
        let best = sink.best("rmsle_eval").unwrap();
        assert_eq!(best.config["estimator.kind"], Value::from(EstimatorKind::Ridge.to_string()));
    }

    #[test]
    fn test_memory_sink_target_stops() {
        let splits = splits();
        let runner = ExperimentRunner::default();
        let mut sink = MemorySink::new().with_target("rmsle_eval", 10.0);
        assert!(!sink.should_stop());
        runner.run(PipelineConfig::default(), &splits, &mut sink).unwrap();
        assert!(sink.should_stop());
    }

    #[test]
    fn test_failed_run_records_nothing() {
        let splits = splits();
        let mut sink = MemorySink::new();
        let config = PipelineConfig::default().with_tabular(false);
        assert!(ExperimentRunner::default().run(config, &splits, &mut sink).is_err());
        assert!(sink.records().is_empty());
    }

    #[test]
    fn test_json_lines_sink_and_save_dir() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = JsonLinesSink::new(dir.path().join("runs.jsonl"));
        let runner = ExperimentRunner::new(RunOptions::default().with_save_dir(dir.path()));
        let splits = splits();

        let outcome = runner.run(PipelineConfig::new("a"), &splits, &mut sink).unwrap();
        runner.run(PipelineConfig::new("b"), &splits, &mut sink).unwrap();

        let records = sink.read_all().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].model_name, "b");
        assert!(!sink.should_stop());

        let artifact = outcome.artifact.unwrap();
        assert_eq!(artifact, dir.path().join("a.bin"));
        let loaded = Model::load(&artifact).unwrap();
        assert_eq!(
            loaded.predict(&splits.eval.listings).unwrap(),
            outcome.model.predict(&splits.eval.listings).unwrap()
        );
    }

    #[test]
    fn test_corrupt_tracking_file_is_serialization_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("runs.jsonl");
        std::fs::write(&path, "{not json\n").unwrap();
        let err = JsonLinesSink::new(&path).read_all().unwrap_err();
        assert!(matches!(err, crate::error::PipelineError::Serialization(_)), "{:?}", err);
    }
}
