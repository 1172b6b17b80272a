//! Ranking direction and evaluation run tracking.

use chrono::{DateTime, Utc};
use gc_types::SearchError;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::evaluator::MetricResult;

/// Unique evaluation run identifier.
pub type EvaluationId = Uuid;

/// Whether lower or higher scores are better.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum Mode {
    Minimize,
    Maximize,
}

impl Default for Mode {
    fn default() -> Self {
        Self::Minimize
    }
}

impl Mode {
    /// Order two scores so that the better one sorts first.
    pub fn compare(&self, a: f64, b: f64) -> Ordering {
        match self {
            Mode::Minimize => a.total_cmp(&b),
            Mode::Maximize => b.total_cmp(&a),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Minimize => "minimize",
            Mode::Maximize => "maximize",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "minimize" | "min" => Ok(Mode::Minimize),
            "maximize" | "max" => Ok(Mode::Maximize),
            _ => Err(SearchError::InvalidMode(s.to_string())),
        }
    }
}

impl TryFrom<String> for Mode {
    type Error = SearchError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Lifecycle state for an evaluation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EvaluationState {
    Pending,
    Running,
    Completed,
    Failed,
}

/// Progress of an evaluation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationStatus {
    pub id: EvaluationId,
    pub name: String,
    pub state: EvaluationState,
    pub tasks_total: usize,
    pub tasks_completed: usize,
    /// Completed tasks that produced no scores.
    pub tasks_failed: usize,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

impl EvaluationStatus {
    pub fn new(name: impl Into<String>, tasks_total: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            state: EvaluationState::Pending,
            tasks_total,
            tasks_completed: 0,
            tasks_failed: 0,
            started_at: None,
            finished_at: None,
            error: None,
        }
    }

    pub fn mark_running(&mut self) {
        self.state = EvaluationState::Running;
        self.started_at = Some(Utc::now());
    }

    pub fn mark_completed(&mut self) {
        self.state = EvaluationState::Completed;
        self.finished_at = Some(Utc::now());
    }

    pub fn mark_failed(&mut self, error: String) {
        self.state = EvaluationState::Failed;
        self.finished_at = Some(Utc::now());
        self.error = Some(error);
    }

    /// Count a finished task.
    pub fn record(&mut self, result: &MetricResult) {
        self.tasks_completed += 1;
        if result.is_failure() {
            self.tasks_failed += 1;
        }
    }

    /// Fraction of tasks finished, in [0, 1].
    pub fn progress(&self) -> f64 {
        if self.tasks_total == 0 {
            1.0
        } else {
            self.tasks_completed as f64 / self.tasks_total as f64
        }
    }

    pub fn elapsed_seconds(&self) -> Option<f64> {
        let start = self.started_at?;
        let end = self.finished_at.unwrap_or_else(Utc::now);
        Some((end - start).num_milliseconds() as f64 / 1000.0)
    }
}
