//! Search space definitions and exhaustive grid enumeration.

use gc_types::{Configuration, ModelKind, ParameterValue, SearchError};
use serde::{Deserialize, Serialize};

/// A single parameter dimension of one model kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterDef {
    /// Parameter name as understood by the model kind (e.g. "alpha").
    pub name: String,
    /// How the candidate values are produced.
    #[serde(flatten)]
    pub kind: ParameterKind,
}

/// Describes the candidate values of a parameter. Every variant expands to a
/// finite, ordered list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ParameterKind {
    /// Explicit candidate values, in declaration order.
    Choice { values: Vec<ParameterValue> },
    /// Integer range [low, high] inclusive.
    IntRange { low: i64, high: i64 },
    /// `steps` evenly spaced points over [low, high].
    FloatRange { low: f64, high: f64, steps: usize },
    /// `steps` points evenly spaced in log-space over [low, high].
    LogUniform { low: f64, high: f64, steps: usize },
}

impl ParameterDef {
    fn invalid_range(&self, message: impl Into<String>) -> SearchError {
        SearchError::InvalidRange {
            parameter: self.name.clone(),
            message: message.into(),
        }
    }

    /// Expand into the ordered list of candidate values.
    pub fn values(&self) -> Result<Vec<ParameterValue>, SearchError> {
        match &self.kind {
            ParameterKind::Choice { values } => Ok(values.clone()),
            ParameterKind::IntRange { low, high } => {
                if low > high {
                    return Err(self.invalid_range(format!("low {low} exceeds high {high}")));
                }
                Ok((*low..=*high).map(ParameterValue::Int).collect())
            }
            ParameterKind::FloatRange { low, high, steps } => {
                if low > high || !low.is_finite() || !high.is_finite() {
                    return Err(self.invalid_range(format!("bad bounds [{low}, {high}]")));
                }
                Ok(linspace(*low, *high, *steps)
                    .into_iter()
                    .map(ParameterValue::Float)
                    .collect())
            }
            ParameterKind::LogUniform { low, high, steps } => {
                if *low <= 0.0 || low > high || !high.is_finite() {
                    return Err(self.invalid_range(format!(
                        "log range needs 0 < low <= high, got [{low}, {high}]"
                    )));
                }
                Ok(linspace(low.ln(), high.ln(), *steps)
                    .into_iter()
                    .map(|v| ParameterValue::Float(v.exp()))
                    .collect())
            }
        }
    }
}

fn linspace(low: f64, high: f64, steps: usize) -> Vec<f64> {
    match steps {
        0 => Vec::new(),
        1 => vec![low],
        _ => (0..steps)
            .map(|i| {
                let t = i as f64 / (steps - 1) as f64;
                low + t * (high - low)
            })
            .collect(),
    }
}

/// The parameter grid of one model kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelGrid {
    pub kind: ModelKind,
    #[serde(default)]
    pub parameters: Vec<ParameterDef>,
}

impl ModelGrid {
    pub fn new(kind: ModelKind) -> Self {
        Self {
            kind,
            parameters: Vec::new(),
        }
    }

    pub fn add_choice<V: Into<ParameterValue>>(
        mut self,
        name: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        self.parameters.push(ParameterDef {
            name: name.into(),
            kind: ParameterKind::Choice {
                values: values.into_iter().map(Into::into).collect(),
            },
        });
        self
    }

    pub fn add_int(mut self, name: impl Into<String>, low: i64, high: i64) -> Self {
        self.parameters.push(ParameterDef {
            name: name.into(),
            kind: ParameterKind::IntRange { low, high },
        });
        self
    }

    pub fn add_float(mut self, name: impl Into<String>, low: f64, high: f64, steps: usize) -> Self {
        self.parameters.push(ParameterDef {
            name: name.into(),
            kind: ParameterKind::FloatRange { low, high, steps },
        });
        self
    }

    pub fn add_log_uniform(
        mut self,
        name: impl Into<String>,
        low: f64,
        high: f64,
        steps: usize,
    ) -> Self {
        self.parameters.push(ParameterDef {
            name: name.into(),
            kind: ParameterKind::LogUniform { low, high, steps },
        });
        self
    }

    /// Expanded axes in declaration order. Fails on empty or malformed dimensions.
    fn axes(&self) -> Result<Vec<(String, Vec<ParameterValue>)>, SearchError> {
        let mut axes: Vec<(String, Vec<ParameterValue>)> = Vec::with_capacity(self.parameters.len());
        for param in &self.parameters {
            if axes.iter().any(|(name, _)| *name == param.name) {
                return Err(SearchError::DuplicateParameter {
                    model: self.kind.to_string(),
                    parameter: param.name.clone(),
                });
            }
            let values = param.values()?;
            if values.is_empty() {
                return Err(SearchError::EmptyValues {
                    model: self.kind.to_string(),
                    parameter: param.name.clone(),
                });
            }
            axes.push((param.name.clone(), values));
        }
        Ok(axes)
    }
}

/// The full search space: an ordered list of model kinds, each with its own grid.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchSpace {
    pub models: Vec<ModelGrid>,
}

impl SearchSpace {
    pub fn new() -> Self {
        Self { models: Vec::new() }
    }

    pub fn add_model(mut self, grid: ModelGrid) -> Self {
        self.models.push(grid);
        self
    }

    /// Check the space is well formed without enumerating it.
    pub fn validate(&self) -> Result<(), SearchError> {
        if self.models.is_empty() {
            return Err(SearchError::EmptySearchSpace);
        }
        for grid in &self.models {
            grid.axes()?;
        }
        Ok(())
    }

    /// Total number of configurations: the product of the value-list lengths of
    /// each model kind, summed across kinds. Returns `None` on overflow.
    pub fn grid_size(&self) -> Result<Option<usize>, SearchError> {
        let mut total: usize = 0;
        for grid in &self.models {
            let mut per_model: usize = 1;
            for (_, values) in grid.axes()? {
                per_model = match per_model.checked_mul(values.len()) {
                    Some(n) => n,
                    None => return Ok(None),
                };
            }
            total = match total.checked_add(per_model) {
                Some(n) => n,
                None => return Ok(None),
            };
        }
        Ok(Some(total))
    }

    /// Lazy, deterministic enumeration of every configuration.
    pub fn grid(&self) -> Result<GridSearch, SearchError> {
        GridSearch::new(self)
    }
}

/// Exhaustive grid enumeration over a [`SearchSpace`].
///
/// Model kinds are visited in declaration order; within a kind, parameter
/// combinations follow lexicographic product order (the last declared
/// parameter varies fastest). Configurations are built on demand.
#[derive(Debug, Clone)]
pub struct GridSearch {
    models: Vec<(ModelKind, Vec<(String, Vec<ParameterValue>)>)>,
    model_cursor: usize,
    odometer: Vec<usize>,
}

impl GridSearch {
    pub fn new(space: &SearchSpace) -> Result<Self, SearchError> {
        space.validate()?;
        let models = space
            .models
            .iter()
            .map(|grid| Ok((grid.kind, grid.axes()?)))
            .collect::<Result<Vec<_>, SearchError>>()?;
        let odometer = vec![0; models.first().map_or(0, |(_, axes)| axes.len())];

        Ok(Self {
            models,
            model_cursor: 0,
            odometer,
        })
    }

    /// Move the odometer forward; rolls over to the next model kind when exhausted.
    fn advance(&mut self) {
        let axes = &self.models[self.model_cursor].1;
        for position in (0..axes.len()).rev() {
            self.odometer[position] += 1;
            if self.odometer[position] < axes[position].1.len() {
                return;
            }
            self.odometer[position] = 0;
        }

        self.model_cursor += 1;
        self.odometer = vec![
            0;
            self.models
                .get(self.model_cursor)
                .map_or(0, |(_, axes)| axes.len())
        ];
    }
}

impl Iterator for GridSearch {
    type Item = Configuration;

    fn next(&mut self) -> Option<Configuration> {
        let (kind, axes) = self.models.get(self.model_cursor)?;
        let parameters = axes
            .iter()
            .zip(&self.odometer)
            .map(|((name, values), &i)| (name.clone(), values[i].clone()))
            .collect();
        let configuration = Configuration::new(*kind, parameters);

        self.advance();
        Some(configuration)
    }
}
