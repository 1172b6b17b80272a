//! Evaluation requests: precondition checks, dispatch, aggregation, ranking.

use gc_types::{Configuration, DataError, Dataset, Frequency, GcResult, SearchError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::coordinator::ExecutionCoordinator;
use crate::metrics::{Metric, MetricSet};
use crate::pool::WorkerPoolConfig;
use crate::ranking::{aggregate, Ranking};
use crate::search::SearchSpace;
use crate::split::{Fold, SplitSpec};
use crate::trial::{EvaluationStatus, Mode};

/// A complete grid evaluation over one dataset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationRequest {
    /// Run name; non-empty and free of path separators.
    pub name: String,
    pub search_space: SearchSpace,
    pub target_column: String,
    /// Built-in metric names. Names matching a custom metric resolve to it.
    pub metrics: Vec<String>,
    /// Metric the ranking is sorted by.
    pub eval_metric: String,
    #[serde(default)]
    pub mode: Mode,
    #[serde(default)]
    pub frequency: Frequency,
    #[serde(default)]
    pub splits: SplitSpec,
    #[serde(default)]
    pub pool: WorkerPoolConfig,
    #[serde(skip)]
    custom_metrics: MetricSet,
}

/// Concrete work derived from a request and a dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationPlan {
    pub configurations: Vec<Configuration>,
    pub folds: Vec<Fold>,
}

impl EvaluationPlan {
    pub fn task_count(&self) -> usize {
        self.configurations.len() * self.folds.len()
    }
}

/// Outcome of a run: final status and the ranking.
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationReport {
    pub status: EvaluationStatus,
    pub folds: usize,
    pub ranking: Ranking,
}

impl EvaluationRequest {
    pub fn new(
        name: impl Into<String>,
        search_space: SearchSpace,
        target_column: impl Into<String>,
        eval_metric: impl Into<String>,
    ) -> Self {
        let eval_metric = eval_metric.into();
        Self {
            name: name.into(),
            search_space,
            target_column: target_column.into(),
            metrics: vec![eval_metric.clone()],
            eval_metric,
            mode: Mode::default(),
            frequency: Frequency::default(),
            splits: SplitSpec::default(),
            pool: WorkerPoolConfig::default(),
            custom_metrics: MetricSet::new(),
        }
    }

    pub fn with_metrics<S: Into<String>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
        self.metrics = names.into_iter().map(Into::into).collect();
        self
    }

    /// Register a custom metric and request it.
    pub fn with_metric(mut self, metric: Metric) -> Self {
        if !self.metrics.iter().any(|m| m == metric.name()) {
            self.metrics.push(metric.name().to_string());
        }
        self.custom_metrics = std::mem::take(&mut self.custom_metrics).with(metric);
        self
    }

    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_frequency(mut self, frequency: Frequency) -> Self {
        self.frequency = frequency;
        self
    }

    pub fn with_splits(mut self, splits: SplitSpec) -> Self {
        self.splits = splits;
        self
    }

    pub fn with_pool(mut self, pool: WorkerPoolConfig) -> Self {
        self.pool = pool;
        self
    }

    /// Resolve the requested metric names.
    pub fn metric_set(&self) -> Result<MetricSet, SearchError> {
        if self.metrics.is_empty() {
            return Err(SearchError::NoMetrics);
        }
        self.metrics.iter().try_fold(MetricSet::new(), |set, name| {
            let metric = match self.custom_metrics.iter().find(|m| m.name() == name) {
                Some(custom) => custom.clone(),
                None => Metric::builtin(name)?,
            };
            Ok(set.with(metric))
        })
    }

    /// Check every precondition and derive the task plan. Nothing is dispatched.
    pub fn plan(&self, dataset: &Dataset) -> GcResult<EvaluationPlan> {
        validate_name(&self.name)?;

        let metrics = self.metric_set()?;
        if !metrics.contains(&self.eval_metric) {
            return Err(SearchError::UnknownEvalMetric {
                metric: self.eval_metric.clone(),
                available: metrics.names(),
            }
            .into());
        }

        let configurations: Vec<Configuration> = self.search_space.grid()?.collect();

        dataset.validate()?;
        if !dataset.has_column(&self.target_column) {
            return Err(DataError::ColumnNotFound {
                column: self.target_column.clone(),
            }
            .into());
        }
        if dataset.distinct_series().len() > 1 {
            warn!(
                "Dataset holds {} series; folds index rows across all of them",
                dataset.distinct_series().len()
            );
        }

        let folds = self.splits.resolve(dataset.len())?;

        Ok(EvaluationPlan {
            configurations,
            folds,
        })
    }

    /// Run on a fresh coordinator built from `self.pool`.
    pub fn run(&self, dataset: Dataset) -> GcResult<EvaluationReport> {
        let coordinator = ExecutionCoordinator::new(self.pool.clone());
        self.run_with(&coordinator, Arc::new(dataset))
    }

    pub fn run_with(
        &self,
        coordinator: &ExecutionCoordinator,
        dataset: Arc<Dataset>,
    ) -> GcResult<EvaluationReport> {
        let plan = self.plan(&dataset)?;
        let metrics = self.metric_set()?;
        info!(
            "Evaluation '{}': {} configurations, {} folds, ranking by {} ({})",
            self.name,
            plan.configurations.len(),
            plan.folds.len(),
            self.eval_metric,
            self.mode
        );

        let execution = coordinator.run(
            &self.name,
            &plan.configurations,
            &plan.folds,
            dataset,
            &self.target_column,
            &metrics,
            self.frequency,
        )?;

        let aggregated = aggregate(
            &execution.results,
            plan.configurations.len(),
            plan.folds.len(),
            &metrics,
        )?;
        let ranking = Ranking::new(plan.configurations, aggregated, &self.eval_metric, self.mode)?;

        match ranking.best() {
            Some(best) => info!(
                "Best configuration for '{}': {} ({} = {:.6})",
                self.name,
                best.configuration,
                self.eval_metric,
                best.score(&self.eval_metric).unwrap_or(f64::NAN)
            ),
            None => warn!(
                "No configuration produced a value for {} in '{}'",
                self.eval_metric, self.name
            ),
        }

        Ok(EvaluationReport {
            status: execution.status,
            folds: plan.folds.len(),
            ranking,
        })
    }
}

/// Names must be non-empty and must not contain path separators.
pub fn validate_name(name: &str) -> Result<(), SearchError> {
    if name.trim().is_empty() || name.contains(['/', '\\']) {
        return Err(SearchError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// Evaluate every configuration of `search_space` on every fold and rank them.
///
/// `mode` is `"minimize"` or `"maximize"`. All preconditions are checked
/// before any task is dispatched.
#[allow(clippy::too_many_arguments)]
pub fn evaluate(
    search_space: &SearchSpace,
    dataset: Dataset,
    target_column: &str,
    metrics: MetricSet,
    eval_metric: &str,
    mode: &str,
    frequency: Frequency,
    splits: SplitSpec,
) -> GcResult<Ranking> {
    let mode: Mode = mode.parse()?;
    let request = metrics.iter().fold(
        EvaluationRequest::new("evaluate", search_space.clone(), target_column, eval_metric)
            .with_metrics(Vec::<String>::new()),
        |request, metric| request.with_metric(metric.clone()),
    );
    let report = request
        .with_mode(mode)
        .with_frequency(frequency)
        .with_splits(splits)
        .with_pool(WorkerPoolConfig::default())
        .run(dataset)?;
    Ok(report.ranking)
}
