//! # gc-models
//!
//! Forecasting model kinds for GridCast.
//!
//! Each model kind implements [`Forecaster`]; [`ModelSpec`] is the factory that
//! maps a search-space [`gc_types::Configuration`] to a typed, fresh model
//! instance.

pub mod baseline;
pub mod exponential;
mod spec;
mod traits;

pub use spec::{HoltParams, ModelSpec, SeasonalNaiveParams, SesParams, WindowAverageParams};
pub use traits::{BoxedForecaster, Forecaster, ModelResult};
