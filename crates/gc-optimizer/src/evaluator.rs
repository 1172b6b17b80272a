//! Single (configuration, fold) evaluation.
//!
//! The evaluator never propagates a failure. Anything that goes wrong while
//! building, fitting, forecasting, or scoring (including a panic) is recorded
//! as a [`TaskFailure`] and every requested metric becomes missing.

use gc_models::ModelSpec;
use gc_types::{Configuration, DataError, Dataset, Frequency, ModelError};
use std::any::Any;
use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::metrics::MetricSet;
use crate::split::Fold;

/// Why a task produced no scores.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TaskFailure {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(ModelError),

    #[error("could not slice fold data: {0}")]
    Data(DataError),

    #[error("fit failed: {0}")]
    Fit(ModelError),

    #[error("forecast failed: {0}")]
    Forecast(ModelError),

    #[error("forecast has {got} values for {expected} test rows")]
    ForecastLength { expected: usize, got: usize },

    #[error("task panicked: {0}")]
    Panicked(String),

    #[error("task produced no result")]
    Lost,
}

/// Scores of one task, keyed by metric name.
///
/// `None` marks a missing score. A failed task carries the failure and has
/// every metric missing; a successful task may still have individual missing
/// metrics when a metric came out non-finite.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricResult {
    pub scores: BTreeMap<String, Option<f64>>,
    pub failure: Option<TaskFailure>,
}

impl MetricResult {
    /// A result with every metric missing.
    pub fn missing(metrics: &MetricSet, failure: TaskFailure) -> Self {
        Self {
            scores: metrics.iter().map(|m| (m.name().to_string(), None)).collect(),
            failure: Some(failure),
        }
    }

    pub fn get(&self, metric: &str) -> Option<f64> {
        self.scores.get(metric).copied().flatten()
    }

    pub fn is_failure(&self) -> bool {
        self.failure.is_some()
    }
}

/// Evaluates configurations against folds of one shared dataset.
#[derive(Debug, Clone)]
pub struct FoldEvaluator {
    dataset: Arc<Dataset>,
    target_column: String,
    metrics: MetricSet,
    frequency: Frequency,
}

impl FoldEvaluator {
    pub fn new(
        dataset: Arc<Dataset>,
        target_column: impl Into<String>,
        metrics: MetricSet,
        frequency: Frequency,
    ) -> Self {
        Self {
            dataset,
            target_column: target_column.into(),
            metrics,
            frequency,
        }
    }

    pub fn metrics(&self) -> &MetricSet {
        &self.metrics
    }

    /// Fit on the fold's training rows, forecast its test rows, and score.
    pub fn evaluate(&self, configuration: &Configuration, fold: &Fold) -> MetricResult {
        let outcome = catch_unwind(AssertUnwindSafe(|| self.try_evaluate(configuration, fold)));

        let failure = match outcome {
            Ok(Ok(scores)) => {
                return MetricResult {
                    scores,
                    failure: None,
                }
            }
            Ok(Err(failure)) => failure,
            Err(payload) => TaskFailure::Panicked(panic_message(payload)),
        };

        debug!("Task {} failed: {}", configuration, failure);
        MetricResult::missing(&self.metrics, failure)
    }

    fn try_evaluate(
        &self,
        configuration: &Configuration,
        fold: &Fold,
    ) -> Result<BTreeMap<String, Option<f64>>, TaskFailure> {
        let spec = ModelSpec::from_configuration(configuration, self.frequency)
            .map_err(TaskFailure::InvalidConfiguration)?;

        let train = self
            .dataset
            .select(&fold.train, &self.target_column)
            .map_err(TaskFailure::Data)?;
        let actual = self
            .dataset
            .select(&fold.test, &self.target_column)
            .map_err(TaskFailure::Data)?;

        let mut model = spec.build();
        model.fit(&train).map_err(TaskFailure::Fit)?;
        let predicted = model.forecast(actual.len()).map_err(TaskFailure::Forecast)?;
        if predicted.len() != actual.len() {
            return Err(TaskFailure::ForecastLength {
                expected: actual.len(),
                got: predicted.len(),
            });
        }

        Ok(self
            .metrics
            .iter()
            .map(|metric| {
                let value = metric.compute(&actual, &predicted);
                (metric.name().to_string(), value.is_finite().then_some(value))
            })
            .collect())
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use gc_types::{ModelKind, ParameterValue};

    fn dataset(values: Vec<f64>) -> Arc<Dataset> {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let timestamps = (0..values.len() as i64)
            .map(|i| start + Duration::days(i))
            .collect();
        Arc::new(Dataset::single_series("s", timestamps, "y", values).unwrap())
    }

    fn evaluator(values: Vec<f64>, metrics: MetricSet) -> FoldEvaluator {
        FoldEvaluator::new(dataset(values), "y", metrics, Frequency::Daily)
    }

    #[test]
    fn scores_a_naive_forecast() {
        let eval = evaluator(
            vec![1.0, 2.0, 3.0, 5.0, 7.0],
            MetricSet::builtin(&["mae", "bias"]).unwrap(),
        );
        let result = eval.evaluate(
            &Configuration::bare(ModelKind::Naive),
            &Fold::from_ranges(0..3, 3..5),
        );
        assert!(!result.is_failure());
        // forecast [3, 3] vs actual [5, 7]
        assert_eq!(result.get("mae"), Some(3.0));
        assert_eq!(result.get("bias"), Some(-3.0));
    }

    #[test]
    fn fit_failure_yields_all_missing() {
        let eval = evaluator(
            vec![1.0, 2.0, 3.0],
            MetricSet::builtin(&["mae", "mse"]).unwrap(),
        );
        let result = eval.evaluate(
            &Configuration::bare(ModelKind::Drift),
            &Fold::from_ranges(0..1, 1..3),
        );
        assert_eq!(
            result.failure,
            Some(TaskFailure::Fit(ModelError::InsufficientData { needed: 2, got: 1 }))
        );
        assert_eq!(result.scores.len(), 2);
        assert!(result.scores.values().all(Option::is_none));
    }

    #[test]
    fn invalid_configuration_is_a_task_failure() {
        let eval = evaluator(vec![1.0, 2.0, 3.0], MetricSet::builtin(&["mae"]).unwrap());
        let cfg = Configuration::new(ModelKind::Ses, vec![("alpha".into(), ParameterValue::Float(7.0))]);
        let result = eval.evaluate(&cfg, &Fold::from_ranges(0..2, 2..3));
        assert!(matches!(
            result.failure,
            Some(TaskFailure::InvalidConfiguration(_))
        ));
        assert_eq!(result.get("mae"), None);
    }

    #[test]
    fn missing_target_column_is_a_task_failure() {
        let eval = FoldEvaluator::new(
            dataset(vec![1.0, 2.0, 3.0]),
            "revenue",
            MetricSet::builtin(&["mae"]).unwrap(),
            Frequency::Daily,
        );
        let result = eval.evaluate(
            &Configuration::bare(ModelKind::Naive),
            &Fold::from_ranges(0..2, 2..3),
        );
        assert!(matches!(result.failure, Some(TaskFailure::Data(_))));
    }

    #[test]
    fn panicking_metric_is_isolated() {
        let metrics = MetricSet::new()
            .add("boom", |_: &[f64], _: &[f64]| -> f64 { panic!("metric exploded") });
        let eval = evaluator(vec![1.0, 2.0, 3.0], metrics);
        let result = eval.evaluate(
            &Configuration::bare(ModelKind::Naive),
            &Fold::from_ranges(0..2, 2..3),
        );
        assert_eq!(
            result.failure,
            Some(TaskFailure::Panicked("metric exploded".to_string()))
        );
        assert_eq!(result.scores.get("boom"), Some(&None));
    }

    #[test]
    fn non_finite_metric_is_missing_only_for_that_metric() {
        let metrics = MetricSet::builtin(&["mae"])
            .unwrap()
            .add("undefined", |_: &[f64], _: &[f64]| f64::NAN);
        let eval = evaluator(vec![1.0, 2.0, 4.0], metrics);
        let result = eval.evaluate(
            &Configuration::bare(ModelKind::Naive),
            &Fold::from_ranges(0..2, 2..3),
        );
        assert!(!result.is_failure());
        assert_eq!(result.get("mae"), Some(2.0));
        assert_eq!(result.scores.get("undefined"), Some(&None));
    }
}
