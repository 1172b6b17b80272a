//! # gc-optimizer
//!
//! Exhaustive grid evaluation of forecasting configurations.
//!
//! A [`SearchSpace`] lazily expands into configurations; every configuration
//! is fitted and scored on every cross-validation [`Fold`] in parallel by the
//! [`ExecutionCoordinator`]; fold scores are averaged per configuration and
//! ranked by one metric. [`evaluate`] and [`EvaluationRequest`] are the entry
//! points.

mod coordinator;
mod evaluator;
mod experiment;
mod metrics;
mod pool;
mod ranking;
mod search;
mod split;
mod trial;

pub use coordinator::{Execution, ExecutionCoordinator};
pub use evaluator::{FoldEvaluator, MetricResult, TaskFailure};
pub use experiment::{
    evaluate, validate_name, EvaluationPlan, EvaluationReport, EvaluationRequest,
};
pub use metrics::{Metric, MetricFn, MetricSet, BUILTIN_METRICS};
pub use pool::{WorkerPoolConfig, WORKERS_ENV_VAR};
pub use ranking::{aggregate, AggregatedResult, RankedConfiguration, Ranking};
pub use search::{GridSearch, ModelGrid, ParameterDef, ParameterKind, SearchSpace};
pub use split::{Fold, SplitSpec, Splitter, TimeSeriesSplit};
pub use trial::{EvaluationId, EvaluationState, EvaluationStatus, Mode};
