//! Parallel dispatch of (configuration, fold) tasks.
//!
//! The task list is the row-major cross product of configurations and folds:
//! task `i` evaluates configuration `i / F` on fold `i % F`. Tasks run on a
//! rayon pool and report back over a channel tagged with their index, so the
//! returned results are in task-list order no matter which worker finished
//! first.

use crossbeam_channel::unbounded;
use gc_data::{DatasetRef, DatasetStore};
use gc_types::{Configuration, Dataset, Frequency, GcError, GcResult};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::evaluator::{FoldEvaluator, MetricResult, TaskFailure};
use crate::metrics::MetricSet;
use crate::pool::WorkerPoolConfig;
use crate::split::Fold;
use crate::trial::EvaluationStatus;

/// Results of one dispatch, in task-list order, plus final run status.
#[derive(Debug, Clone)]
pub struct Execution {
    pub results: Vec<MetricResult>,
    pub status: EvaluationStatus,
}

/// Schedules evaluation tasks onto a local worker pool.
#[derive(Debug, Clone)]
pub struct ExecutionCoordinator {
    config: WorkerPoolConfig,
    store: Arc<DatasetStore>,
}

impl ExecutionCoordinator {
    pub fn new(config: WorkerPoolConfig) -> Self {
        Self {
            config,
            store: Arc::new(DatasetStore::new()),
        }
    }

    /// Share a dataset store with other coordinators.
    pub fn with_store(mut self, store: Arc<DatasetStore>) -> Self {
        self.store = store;
        self
    }

    pub fn config(&self) -> &WorkerPoolConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<DatasetStore> {
        &self.store
    }

    /// Evaluate every configuration on every fold.
    ///
    /// The dataset is placed in the store once and every task reads the same
    /// shared copy. Returns exactly `configurations.len() * folds.len()`
    /// results.
    #[allow(clippy::too_many_arguments)]
    pub fn run(
        &self,
        name: &str,
        configurations: &[Configuration],
        folds: &[Fold],
        dataset: Arc<Dataset>,
        target_column: &str,
        metrics: &MetricSet,
        frequency: Frequency,
    ) -> GcResult<Execution> {
        let n_folds = folds.len();
        let total = configurations.len() * n_folds;

        let handle = self.store.put_shared(dataset);
        let mut status = EvaluationStatus::new(name, total);
        status.mark_running();

        let shared = match self.store.get(&handle) {
            Ok(shared) => shared,
            Err(e) => return Err(self.abort(&mut status, &handle, e)),
        };
        let evaluator = FoldEvaluator::new(shared, target_column, metrics.clone(), frequency);

        let pool = match self.config.build_pool(total) {
            Ok(pool) => pool,
            Err(e) => return Err(self.abort(&mut status, &handle, e)),
        };
        info!(
            "Dispatching {} tasks ({} configurations x {} folds) on {} workers",
            total,
            configurations.len(),
            n_folds,
            pool.current_num_threads()
        );

        // Workers share only the read-only evaluator and the sending side of the channel.
        let (sender, receiver) = unbounded::<(usize, MetricResult)>();
        {
            let evaluator = &evaluator;
            pool.scope(|scope| {
                for index in 0..total {
                    let sender = sender.clone();
                    scope.spawn(move |_| {
                        let configuration = &configurations[index / n_folds];
                        let fold = &folds[index % n_folds];
                        let result = evaluator.evaluate(configuration, fold);
                        debug!("Task {} finished: {}", index, configuration);
                        let _ = sender.send((index, result));
                    });
                }
            });
        }
        drop(sender);
        self.store.release(&handle);

        let mut slots: Vec<Option<MetricResult>> = vec![None; total];
        for (index, result) in receiver.iter() {
            status.record(&result);
            debug!("Collected task {} ({:.0}% done)", index, status.progress() * 100.0);
            slots[index] = Some(result);
        }

        let mut lost = 0;
        let results: Vec<MetricResult> = slots
            .into_iter()
            .map(|slot| {
                slot.unwrap_or_else(|| {
                    lost += 1;
                    MetricResult::missing(metrics, TaskFailure::Lost)
                })
            })
            .collect();
        if lost > 0 {
            warn!("{} tasks returned no result and were recorded as missing", lost);
        }

        status.mark_completed();
        info!(
            "Finished {} tasks ({} failed) in {:.2}s",
            status.tasks_completed,
            status.tasks_failed,
            status.elapsed_seconds().unwrap_or_default()
        );

        Ok(Execution { results, status })
    }
}

impl ExecutionCoordinator {
    /// End a run that could not dispatch: mark it failed and release its dataset.
    fn abort(
        &self,
        status: &mut EvaluationStatus,
        handle: &DatasetRef,
        error: GcError,
    ) -> GcError {
        status.mark_failed(error.to_string());
        self.store.release(handle);
        error!(
            "Evaluation '{}' ({}) failed before dispatch: {}",
            status.name, status.id, error
        );
        error
    }
}

impl Default for ExecutionCoordinator {
    fn default() -> Self {
        Self::new(WorkerPoolConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use crate::trial::EvaluationState;
    use gc_types::{ModelKind, ParameterValue};
    use rand::Rng;

    fn dataset(n: usize) -> Arc<Dataset> {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let timestamps = (0..n as i64).map(|i| start + Duration::days(i)).collect();
        let values = (0..n).map(|i| (i as f64).sin() * 10.0 + i as f64).collect();
        Arc::new(Dataset::single_series("s", timestamps, "y", values).unwrap())
    }

    fn windows(values: &[i64]) -> Vec<Configuration> {
        values
            .iter()
            .map(|&w| {
                Configuration::new(
                    ModelKind::WindowAverage,
                    vec![("window".to_string(), ParameterValue::Int(w))],
                )
            })
            .collect()
    }

    #[test]
    fn results_follow_task_order_under_random_delays() {
        let configurations = windows(&[1, 2, 3, 4]);
        let folds = crate::split::SplitSpec::Count(3).resolve(40).unwrap();

        // Each task sleeps a random amount inside the metric so completion
        // order is shuffled relative to dispatch order.
        let metrics = MetricSet::builtin(&["mae"]).unwrap().add("delay", |_: &[f64], _: &[f64]| {
            let millis = rand::rng().random_range(0..15);
            std::thread::sleep(std::time::Duration::from_millis(millis));
            0.0
        });

        let coordinator = ExecutionCoordinator::new(WorkerPoolConfig::default().with_workers(4));
        let data = dataset(40);
        let execution = coordinator
            .run("order", &configurations, &folds, data.clone(), "y", &metrics, Frequency::Daily)
            .unwrap();
        assert_eq!(execution.results.len(), 12);

        let sequential = FoldEvaluator::new(data, "y", metrics.clone(), Frequency::Daily);
        for (index, result) in execution.results.iter().enumerate() {
            let expected = sequential.evaluate(&configurations[index / 3], &folds[index % 3]);
            assert_eq!(result.get("mae"), expected.get("mae"), "task {index}");
        }
    }

    #[test]
    fn failures_are_isolated_per_task() {
        let configurations = vec![
            Configuration::bare(ModelKind::Drift),
            Configuration::bare(ModelKind::Naive),
        ];
        let folds = vec![Fold::from_ranges(0..1, 1..3), Fold::from_ranges(0..3, 3..5)];
        let metrics = MetricSet::builtin(&["mae", "mse"]).unwrap();

        let execution = ExecutionCoordinator::new(WorkerPoolConfig::default().with_workers(2))
            .run("isolation", &configurations, &folds, dataset(5), "y", &metrics, Frequency::Daily)
            .unwrap();

        let results = &execution.results;
        assert_eq!(results.len(), 4);
        // Drift on a single-row training slice cannot fit.
        assert!(results[0].is_failure());
        assert!(results[0].scores.values().all(Option::is_none));
        assert!(!results[1].is_failure());
        assert!(!results[2].is_failure());
        assert!(!results[3].is_failure());

        assert_eq!(execution.status.tasks_completed, 4);
        assert_eq!(execution.status.tasks_failed, 1);
    }

    #[test]
    fn dataset_is_released_after_run() {
        let coordinator = ExecutionCoordinator::default();
        let metrics = MetricSet::builtin(&["mae"]).unwrap();
        coordinator
            .run(
                "store",
                &windows(&[1]),
                &[Fold::from_ranges(0..3, 3..4)],
                dataset(4),
                "y",
                &metrics,
                Frequency::Daily,
            )
            .unwrap();

        assert!(coordinator.store().is_empty());
        let stats = coordinator.store().stats();
        assert_eq!(stats.puts, 1);
        assert_eq!(stats.hits, 1);
    }

    #[test]
    fn aborted_runs_are_marked_failed_and_release_the_dataset() {
        let coordinator = ExecutionCoordinator::default();
        let handle = coordinator.store().put_shared(dataset(4));
        let mut status = EvaluationStatus::new("aborted", 4);
        status.mark_running();

        let err = coordinator.abort(
            &mut status,
            &handle,
            gc_types::internal_error!("Failed to build worker pool: no threads"),
        );

        assert!(matches!(err, GcError::Internal(_)));
        assert_eq!(status.state, EvaluationState::Failed);
        assert!(status.error.as_deref().unwrap().contains("no threads"));
        assert!(status.finished_at.is_some());
        assert!(coordinator.store().is_empty());
    }
}
