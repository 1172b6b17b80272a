use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::ModelError;

/// A concrete parameter value chosen from a search space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterValue {
    Int(i64),
    Float(f64),
    Json(serde_json::Value),
}

impl ParameterValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            Self::Json(v) => v.as_f64(),
        }
    }

    /// Non-negative integers only; floats with a fractional part are rejected.
    pub fn as_usize(&self) -> Option<usize> {
        match self {
            Self::Int(v) => usize::try_from(*v).ok(),
            Self::Float(v) if v.fract() == 0.0 && *v >= 0.0 => Some(*v as usize),
            Self::Float(_) => None,
            Self::Json(v) => v.as_u64().and_then(|u| usize::try_from(u).ok()),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Json(v) => v.as_bool(),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Json(serde_json::Value::Null))
    }
}

impl fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Float(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Json(v) => write!(f, "{v}"),
        }
    }
}

impl From<i64> for ParameterValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for ParameterValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<bool> for ParameterValue {
    fn from(v: bool) -> Self {
        Self::Json(serde_json::Value::Bool(v))
    }
}

/// Identifier of a forecasting model family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    /// Repeat the last observation.
    Naive,
    /// Repeat the last observed season.
    SeasonalNaive,
    /// Mean of the trailing window.
    WindowAverage,
    /// Random walk with drift.
    Drift,
    /// Simple exponential smoothing.
    Ses,
    /// Holt's linear trend, optionally damped.
    Holt,
}

impl ModelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelKind::Naive => "naive",
            ModelKind::SeasonalNaive => "seasonal_naive",
            ModelKind::WindowAverage => "window_average",
            ModelKind::Drift => "drift",
            ModelKind::Ses => "ses",
            ModelKind::Holt => "holt",
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelKind {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "naive" => Ok(ModelKind::Naive),
            "seasonal_naive" | "seasonalnaive" => Ok(ModelKind::SeasonalNaive),
            "window_average" | "windowaverage" => Ok(ModelKind::WindowAverage),
            "drift" | "random_walk_with_drift" => Ok(ModelKind::Drift),
            "ses" | "simple_exponential_smoothing" => Ok(ModelKind::Ses),
            "holt" => Ok(ModelKind::Holt),
            other => Err(ModelError::InvalidParameter {
                parameter: "model".to_string(),
                message: format!("unknown model kind '{}'", other),
            }),
        }
    }
}

/// One concrete model kind plus a parameter assignment.
///
/// Identity is structural: two configurations are equal when their kind and
/// their ordered parameter assignments are equal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Configuration {
    pub kind: ModelKind,
    /// Assignments in the order the parameters were declared.
    pub parameters: Vec<(String, ParameterValue)>,
}

impl Configuration {
    pub fn new(kind: ModelKind, parameters: Vec<(String, ParameterValue)>) -> Self {
        Self { kind, parameters }
    }

    /// A configuration with no parameters assigned.
    pub fn bare(kind: ModelKind) -> Self {
        Self::new(kind, Vec::new())
    }

    pub fn get(&self, name: &str) -> Option<&ParameterValue> {
        self.parameters
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }
}

impl fmt::Display for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.kind)?;
        for (i, (name, value)) in self.parameters.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{name}={value}")?;
        }
        write!(f, ")")
    }
}
