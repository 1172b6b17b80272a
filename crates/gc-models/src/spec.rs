//! Typed model specifications built from search-space configurations.
//!
//! Every [`ModelKind`] has one [`ModelSpec`] variant holding a strongly typed
//! parameter struct. [`ModelSpec::from_configuration`] is the factory that turns
//! a loosely typed parameter assignment into that struct, rejecting unknown
//! names, wrong types, and out-of-range values.

use gc_types::{Configuration, Frequency, ModelError, ModelKind, ParameterValue};
use serde::{Deserialize, Serialize};

use crate::baseline::{Drift, Naive, SeasonalNaive, WindowAverage};
use crate::exponential::{Holt, SimpleExponentialSmoothing};
use crate::traits::{BoxedForecaster, ModelResult};

const DEFAULT_ALPHA: f64 = 0.3;
const DEFAULT_BETA: f64 = 0.1;
const DEFAULT_DAMPING: f64 = 0.98;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeasonalNaiveParams {
    pub season_length: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowAverageParams {
    pub window: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SesParams {
    pub alpha: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HoltParams {
    pub alpha: f64,
    pub beta: f64,
    /// Damping factor; `None` for the undamped method.
    pub phi: Option<f64>,
}

/// A fully resolved model kind with its typed parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelSpec {
    Naive,
    SeasonalNaive(SeasonalNaiveParams),
    WindowAverage(WindowAverageParams),
    Drift,
    Ses(SesParams),
    Holt(HoltParams),
}

impl ModelSpec {
    /// Resolve a configuration into typed parameters.
    ///
    /// `frequency` supplies the default season length for seasonal kinds.
    pub fn from_configuration(config: &Configuration, frequency: Frequency) -> ModelResult<Self> {
        let mut params = ParamReader::new(config);

        let spec = match config.kind {
            ModelKind::Naive => ModelSpec::Naive,
            ModelKind::Drift => ModelSpec::Drift,
            ModelKind::SeasonalNaive => ModelSpec::SeasonalNaive(SeasonalNaiveParams {
                season_length: params.positive_usize("season_length", frequency.season_length())?,
            }),
            ModelKind::WindowAverage => ModelSpec::WindowAverage(WindowAverageParams {
                window: params.positive_usize("window", frequency.season_length())?,
            }),
            ModelKind::Ses => ModelSpec::Ses(SesParams {
                alpha: params.unit_interval("alpha", DEFAULT_ALPHA)?,
            }),
            ModelKind::Holt => {
                let alpha = params.unit_interval("alpha", DEFAULT_ALPHA)?;
                let beta = params.unit_interval("beta", DEFAULT_BETA)?;
                let damped = params.bool("damped", false)?;
                let phi = match params.optional_unit_interval("phi")? {
                    Some(phi) => Some(phi),
                    None if damped => Some(DEFAULT_DAMPING),
                    None => None,
                };
                ModelSpec::Holt(HoltParams { alpha, beta, phi })
            }
        };

        params.finish()?;
        Ok(spec)
    }

    pub fn kind(&self) -> ModelKind {
        match self {
            ModelSpec::Naive => ModelKind::Naive,
            ModelSpec::SeasonalNaive(_) => ModelKind::SeasonalNaive,
            ModelSpec::WindowAverage(_) => ModelKind::WindowAverage,
            ModelSpec::Drift => ModelKind::Drift,
            ModelSpec::Ses(_) => ModelKind::Ses,
            ModelSpec::Holt(_) => ModelKind::Holt,
        }
    }

    /// Create a fresh, unfitted model instance.
    pub fn build(&self) -> BoxedForecaster {
        match *self {
            ModelSpec::Naive => Box::new(Naive::new()),
            ModelSpec::SeasonalNaive(p) => Box::new(SeasonalNaive::new(p.season_length)),
            ModelSpec::WindowAverage(p) => Box::new(WindowAverage::new(p.window)),
            ModelSpec::Drift => Box::new(Drift::new()),
            ModelSpec::Ses(p) => Box::new(SimpleExponentialSmoothing::new(p.alpha)),
            ModelSpec::Holt(p) => match p.phi {
                Some(phi) => Box::new(Holt::damped(p.alpha, p.beta, phi)),
                None => Box::new(Holt::new(p.alpha, p.beta)),
            },
        }
    }
}

/// Reads typed parameters out of a configuration and tracks which names were consumed.
struct ParamReader<'a> {
    config: &'a Configuration,
    consumed: Vec<&'a str>,
}

impl<'a> ParamReader<'a> {
    fn new(config: &'a Configuration) -> Self {
        Self {
            config,
            consumed: Vec::new(),
        }
    }

    fn take(&mut self, name: &'a str) -> Option<&'a ParameterValue> {
        self.consumed.push(name);
        self.config.get(name).filter(|v| !v.is_null())
    }

    fn invalid(name: &str, message: impl Into<String>) -> ModelError {
        ModelError::InvalidParameter {
            parameter: name.to_string(),
            message: message.into(),
        }
    }

    fn positive_usize(&mut self, name: &'a str, default: usize) -> ModelResult<usize> {
        let value = match self.take(name) {
            Some(v) => v
                .as_usize()
                .ok_or_else(|| Self::invalid(name, format!("expected a non-negative integer, got {v}")))?,
            None => default,
        };
        if value == 0 {
            return Err(Self::invalid(name, "must be at least 1"));
        }
        Ok(value)
    }

    fn optional_unit_interval(&mut self, name: &'a str) -> ModelResult<Option<f64>> {
        match self.take(name) {
            Some(v) => {
                let x = v
                    .as_f64()
                    .ok_or_else(|| Self::invalid(name, format!("expected a number, got {v}")))?;
                if x > 0.0 && x <= 1.0 {
                    Ok(Some(x))
                } else {
                    Err(Self::invalid(name, format!("must lie in (0, 1], got {x}")))
                }
            }
            None => Ok(None),
        }
    }

    fn unit_interval(&mut self, name: &'a str, default: f64) -> ModelResult<f64> {
        Ok(self.optional_unit_interval(name)?.unwrap_or(default))
    }

    fn bool(&mut self, name: &'a str, default: bool) -> ModelResult<bool> {
        match self.take(name) {
            Some(v) => v
                .as_bool()
                .ok_or_else(|| Self::invalid(name, format!("expected a boolean, got {v}"))),
            None => Ok(default),
        }
    }

    /// Fail on any assigned parameter the model kind does not define.
    fn finish(self) -> ModelResult<()> {
        match self
            .config
            .parameters
            .iter()
            .find(|(name, _)| !self.consumed.contains(&name.as_str()))
        {
            Some((name, _)) => Err(ModelError::UnknownParameter {
                model: self.config.kind.to_string(),
                parameter: name.clone(),
            }),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(kind: ModelKind, params: Vec<(&str, ParameterValue)>) -> Configuration {
        Configuration::new(
            kind,
            params.into_iter().map(|(n, v)| (n.to_string(), v)).collect(),
        )
    }

    #[test]
    fn bare_configurations_use_defaults() {
        let spec =
            ModelSpec::from_configuration(&Configuration::bare(ModelKind::SeasonalNaive), Frequency::Monthly)
                .unwrap();
        assert_eq!(
            spec,
            ModelSpec::SeasonalNaive(SeasonalNaiveParams { season_length: 12 })
        );

        let spec =
            ModelSpec::from_configuration(&Configuration::bare(ModelKind::Holt), Frequency::Daily).unwrap();
        assert_eq!(
            spec,
            ModelSpec::Holt(HoltParams {
                alpha: DEFAULT_ALPHA,
                beta: DEFAULT_BETA,
                phi: None
            })
        );
    }

    #[test]
    fn typed_parameters_are_read() {
        let cfg = config(
            ModelKind::Holt,
            vec![
                ("alpha", ParameterValue::Float(0.8)),
                ("beta", ParameterValue::Int(1)),
                ("damped", true.into()),
            ],
        );
        let spec = ModelSpec::from_configuration(&cfg, Frequency::Daily).unwrap();
        assert_eq!(
            spec,
            ModelSpec::Holt(HoltParams {
                alpha: 0.8,
                beta: 1.0,
                phi: Some(DEFAULT_DAMPING)
            })
        );
        assert_eq!(spec.kind(), ModelKind::Holt);
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        let cfg = config(ModelKind::Ses, vec![("alpha", ParameterValue::Float(1.5))]);
        assert!(matches!(
            ModelSpec::from_configuration(&cfg, Frequency::Daily),
            Err(ModelError::InvalidParameter { .. })
        ));

        let cfg = config(ModelKind::WindowAverage, vec![("window", ParameterValue::Int(0))]);
        assert!(ModelSpec::from_configuration(&cfg, Frequency::Daily).is_err());

        let cfg = config(ModelKind::WindowAverage, vec![("window", ParameterValue::Float(2.5))]);
        assert!(ModelSpec::from_configuration(&cfg, Frequency::Daily).is_err());
    }

    #[test]
    fn unknown_parameters_are_rejected() {
        let cfg = config(ModelKind::Naive, vec![("alpha", ParameterValue::Float(0.5))]);
        assert_eq!(
            ModelSpec::from_configuration(&cfg, Frequency::Daily),
            Err(ModelError::UnknownParameter {
                model: "naive".to_string(),
                parameter: "alpha".to_string()
            })
        );
    }

    #[test]
    fn null_means_default() {
        let cfg = config(
            ModelKind::Ses,
            vec![("alpha", ParameterValue::Json(serde_json::Value::Null))],
        );
        let spec = ModelSpec::from_configuration(&cfg, Frequency::Daily).unwrap();
        assert_eq!(spec, ModelSpec::Ses(SesParams { alpha: DEFAULT_ALPHA }));
    }

    #[test]
    fn built_models_fit_and_forecast() {
        let history: Vec<f64> = (1..=30).map(|i| i as f64).collect();
        let specs = [
            ModelSpec::Naive,
            ModelSpec::SeasonalNaive(SeasonalNaiveParams { season_length: 7 }),
            ModelSpec::WindowAverage(WindowAverageParams { window: 3 }),
            ModelSpec::Drift,
            ModelSpec::Ses(SesParams { alpha: 0.4 }),
            ModelSpec::Holt(HoltParams {
                alpha: 0.4,
                beta: 0.2,
                phi: Some(0.9),
            }),
        ];

        for spec in &specs {
            let mut model = spec.build();
            assert!(!model.is_fitted());
            model.fit(&history).unwrap();
            assert_eq!(model.forecast(5).unwrap().len(), 5, "{}", model.name());
        }
    }

    #[test]
    fn spec_serializes_with_kind_tag() {
        let spec = ModelSpec::WindowAverage(WindowAverageParams { window: 4 });
        let json = serde_json::to_value(&spec).unwrap();
        assert_eq!(json, serde_json::json!({"kind": "window_average", "window": 4}));
    }
}
