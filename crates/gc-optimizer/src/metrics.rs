//! Named accuracy metrics evaluated on held-out forecasts.
//!
//! A metric is any `Fn(actual, predicted) -> f64`. Non-finite results are
//! treated as missing by the evaluator, so metrics signal "undefined" by
//! returning NaN rather than failing.

use gc_types::SearchError;
use std::fmt;
use std::sync::Arc;

/// Signature shared by every metric function.
pub type MetricFn = Arc<dyn Fn(&[f64], &[f64]) -> f64 + Send + Sync>;

/// Names accepted by [`MetricSet::builtin`].
pub const BUILTIN_METRICS: &[&str] = &["mse", "rmse", "mae", "mape", "smape", "bias"];

/// A metric function with the name results are reported under.
#[derive(Clone)]
pub struct Metric {
    name: String,
    func: MetricFn,
}

impl Metric {
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&[f64], &[f64]) -> f64 + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            func: Arc::new(func),
        }
    }

    /// Look up a built-in metric by name (case-insensitive). Scores are
    /// reported under the name as given.
    pub fn builtin(name: &str) -> Result<Self, SearchError> {
        let func: fn(&[f64], &[f64]) -> f64 = match name.to_lowercase().as_str() {
            "mse" => mse,
            "rmse" => rmse,
            "mae" => mae,
            "mape" => mape,
            "smape" => smape,
            "bias" => bias,
            _ => return Err(SearchError::UnknownMetric(name.to_string())),
        };
        Ok(Self::new(name, func))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn compute(&self, actual: &[f64], predicted: &[f64]) -> f64 {
        (self.func)(actual, predicted)
    }
}

impl fmt::Debug for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Metric").field("name", &self.name).finish()
    }
}

/// Ordered collection of metrics; names are unique.
#[derive(Debug, Clone, Default)]
pub struct MetricSet {
    metrics: Vec<Metric>,
}

impl MetricSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set from built-in metric names.
    pub fn builtin<S: AsRef<str>>(names: &[S]) -> Result<Self, SearchError> {
        names
            .iter()
            .try_fold(Self::new(), |set, name| Ok(set.with(Metric::builtin(name.as_ref())?)))
    }

    /// Add a metric, replacing any existing metric of the same name.
    pub fn with(mut self, metric: Metric) -> Self {
        match self.metrics.iter_mut().find(|m| m.name == metric.name) {
            Some(existing) => *existing = metric,
            None => self.metrics.push(metric),
        }
        self
    }

    pub fn add<F>(self, name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&[f64], &[f64]) -> f64 + Send + Sync + 'static,
    {
        self.with(Metric::new(name, func))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.metrics.iter().any(|m| m.name == name)
    }

    pub fn names(&self) -> Vec<String> {
        self.metrics.iter().map(|m| m.name.clone()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Metric> {
        self.metrics.iter()
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }
}

/// Pairs where both sides are finite.
fn valid_pairs<'a>(
    actual: &'a [f64],
    predicted: &'a [f64],
) -> impl Iterator<Item = (f64, f64)> + 'a {
    actual
        .iter()
        .zip(predicted)
        .map(|(&a, &p)| (a, p))
        .filter(|(a, p)| a.is_finite() && p.is_finite())
}

fn mean_of(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if count == 0 {
        f64::NAN
    } else {
        sum / count as f64
    }
}

/// Mean squared error.
pub fn mse(actual: &[f64], predicted: &[f64]) -> f64 {
    mean_of(valid_pairs(actual, predicted).map(|(a, p)| (a - p).powi(2)))
}

/// Root mean squared error.
pub fn rmse(actual: &[f64], predicted: &[f64]) -> f64 {
    mse(actual, predicted).sqrt()
}

/// Mean absolute error.
pub fn mae(actual: &[f64], predicted: &[f64]) -> f64 {
    mean_of(valid_pairs(actual, predicted).map(|(a, p)| (a - p).abs()))
}

/// Mean absolute percentage error in percent. Zero actuals are skipped.
pub fn mape(actual: &[f64], predicted: &[f64]) -> f64 {
    100.0
        * mean_of(
            valid_pairs(actual, predicted)
                .filter(|(a, _)| *a != 0.0)
                .map(|(a, p)| ((a - p) / a).abs()),
        )
}

/// Symmetric MAPE in percent, bounded by 200.
pub fn smape(actual: &[f64], predicted: &[f64]) -> f64 {
    100.0
        * mean_of(valid_pairs(actual, predicted).map(|(a, p)| {
            let denom = a.abs() + p.abs();
            if denom == 0.0 {
                0.0
            } else {
                2.0 * (a - p).abs() / denom
            }
        }))
}

/// Mean signed error (`predicted - actual`); positive means over-forecasting.
pub fn bias(actual: &[f64], predicted: &[f64]) -> f64 {
    mean_of(valid_pairs(actual, predicted).map(|(a, p)| p - a))
}
