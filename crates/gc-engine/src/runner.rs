//! Experiment files: load, resolve the worker pool, evaluate.

use gc_data::{load_source, DataSourceConfig};
use gc_optimizer::{EvaluationReport, EvaluationRequest, WorkerPoolConfig};
use gc_types::{internal_error, GcResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// How the ranking is printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Table,
    Json,
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self::Table
    }
}

/// A JSON experiment description.
///
/// ```json
/// {
///   "name": "store_sales",
///   "data": {"path": "sales.csv", "format": "csv"},
///   "search_space": {"models": [{"kind": "naive"}]},
///   "target_column": "sales",
///   "metrics": ["mae", "rmse"],
///   "eval_metric": "mae",
///   "mode": "minimize",
///   "splits": {"count": 5}
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentFile {
    #[serde(flatten)]
    pub request: EvaluationRequest,
    pub data: DataSourceConfig,
    /// Worker count; falls back to `GRIDCAST_WORKERS`, then to the request's pool.
    #[serde(default)]
    pub workers: Option<usize>,
    #[serde(default)]
    pub output: OutputFormat,
}

impl ExperimentFile {
    pub async fn from_path(path: impl AsRef<Path>) -> GcResult<Self> {
        let path = path.as_ref();
        let contents = tokio::fs::read_to_string(path).await?;
        let mut experiment: Self = serde_json::from_str(&contents)?;

        // Relative data paths are taken relative to the experiment file.
        if experiment.data.path.is_relative() {
            if let Some(parent) = path.parent() {
                experiment.data.path = parent.join(&experiment.data.path);
            }
        }
        Ok(experiment)
    }

    /// Worker pool after applying the file's and the environment's overrides.
    pub fn resolve_pool(&self) -> GcResult<WorkerPoolConfig> {
        if let Some(workers) = self.workers {
            return Ok(self.request.pool.clone().with_workers(workers));
        }
        match std::env::var(gc_optimizer::WORKERS_ENV_VAR) {
            Ok(_) => WorkerPoolConfig::from_env(),
            Err(_) => Ok(self.request.pool.clone()),
        }
    }
}

/// Load the experiment's dataset and run the evaluation off the async runtime.
pub async fn run_experiment(experiment: ExperimentFile) -> GcResult<EvaluationReport> {
    let pool = experiment.resolve_pool()?;
    let dataset = load_source(&experiment.data).await?;
    info!(
        "Loaded {} rows for experiment '{}' ({} workers)",
        dataset.len(),
        experiment.request.name,
        pool.num_workers
    );

    let request = experiment.request.with_pool(pool);
    tokio::task::spawn_blocking(move || request.run(dataset))
        .await
        .map_err(|e| internal_error!("Evaluation task aborted: {}", e))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use gc_types::{GcError, ModelKind};
    use std::io::Write;
    use tempfile::TempDir;

    fn write_csv(dir: &TempDir) {
        let mut file = std::fs::File::create(dir.path().join("sales.csv")).unwrap();
        writeln!(file, "date,sales,price").unwrap();
        for day in 1..=28 {
            writeln!(
                file,
                "2024-02-{:02},{},{}",
                day,
                100 + day * 2 + (day % 7) * 5,
                9.99
            )
            .unwrap();
        }
    }

    fn write_experiment(dir: &TempDir, body: &str) -> std::path::PathBuf {
        let path = dir.path().join("experiment.json");
        std::fs::write(&path, body).unwrap();
        path
    }

    const EXPERIMENT: &str = r#"{
        "name": "feb_sales",
        "data": {"path": "sales.csv"},
        "search_space": {"models": [
            {"kind": "naive"},
            {"kind": "drift"},
            {"kind": "window_average", "parameters": [
                {"name": "window", "type": "int_range", "low": 2, "high": 4}
            ]}
        ]},
        "target_column": "sales",
        "metrics": ["mae", "rmse"],
        "eval_metric": "rmse",
        "splits": {"count": 4},
        "workers": 2,
        "output": "json"
    }"#;

    #[tokio::test]
    async fn runs_an_experiment_file() {
        let dir = TempDir::new().unwrap();
        write_csv(&dir);
        let path = write_experiment(&dir, EXPERIMENT);

        let experiment = ExperimentFile::from_path(&path).await.unwrap();
        assert_eq!(experiment.output, OutputFormat::Json);
        assert_eq!(experiment.resolve_pool().unwrap().num_workers, 2);
        assert_eq!(experiment.data.path, dir.path().join("sales.csv"));

        let report = run_experiment(experiment).await.unwrap();
        assert_eq!(report.ranking.len(), 5);
        assert_eq!(report.status.tasks_total, 20);
        assert_eq!(report.status.name, "feb_sales");
        assert!(report.ranking.best().is_some());
        assert!(report
            .ranking
            .iter()
            .any(|e| e.configuration.kind == ModelKind::Drift));
    }

    #[tokio::test]
    async fn invalid_experiment_files_are_rejected() {
        let dir = TempDir::new().unwrap();
        write_csv(&dir);

        let path = write_experiment(&dir, r#"{"name": "broken""#);
        assert!(matches!(
            ExperimentFile::from_path(&path).await,
            Err(GcError::Serialization(_))
        ));

        assert!(matches!(
            ExperimentFile::from_path(dir.path().join("missing.json")).await,
            Err(GcError::Io(_))
        ));

        let bad_mode = EXPERIMENT.replace(r#""workers": 2"#, r#""mode": "upwards""#);
        let path = write_experiment(&dir, &bad_mode);
        assert!(ExperimentFile::from_path(&path).await.is_err());
    }

    #[tokio::test]
    async fn missing_target_column_fails_before_dispatch() {
        let dir = TempDir::new().unwrap();
        write_csv(&dir);
        let body = EXPERIMENT.replace(r#""target_column": "sales""#, r#""target_column": "units""#);
        let path = write_experiment(&dir, &body);

        let experiment = ExperimentFile::from_path(&path).await.unwrap();
        assert!(matches!(
            run_experiment(experiment).await,
            Err(GcError::Data(_))
        ));
    }
}
