//! Baseline forecasters: naive, seasonal naive, window average, and drift.

use gc_types::ModelError;

use crate::traits::{check_forecast, check_history, Forecaster, ModelResult};

/// Repeats the last observed value.
#[derive(Debug, Clone, Default)]
pub struct Naive {
    last_value: Option<f64>,
}

impl Naive {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Forecaster for Naive {
    fn fit(&mut self, history: &[f64]) -> ModelResult<()> {
        check_history(history, 1)?;
        self.last_value = history.last().copied();
        Ok(())
    }

    fn forecast(&self, horizon: usize) -> ModelResult<Vec<f64>> {
        let last = self.last_value.ok_or(ModelError::NotFitted)?;
        Ok(vec![last; horizon])
    }

    fn name(&self) -> &str {
        "Naive"
    }

    fn is_fitted(&self) -> bool {
        self.last_value.is_some()
    }
}

/// Repeats the last full season.
#[derive(Debug, Clone)]
pub struct SeasonalNaive {
    season_length: usize,
    last_season: Option<Vec<f64>>,
}

impl SeasonalNaive {
    pub fn new(season_length: usize) -> Self {
        Self {
            season_length,
            last_season: None,
        }
    }
}

impl Forecaster for SeasonalNaive {
    fn fit(&mut self, history: &[f64]) -> ModelResult<()> {
        check_history(history, self.season_length)?;
        self.last_season = Some(history[history.len() - self.season_length..].to_vec());
        Ok(())
    }

    fn forecast(&self, horizon: usize) -> ModelResult<Vec<f64>> {
        let season = self.last_season.as_ref().ok_or(ModelError::NotFitted)?;
        Ok((0..horizon).map(|h| season[h % season.len()]).collect())
    }

    fn name(&self) -> &str {
        "SeasonalNaive"
    }

    fn is_fitted(&self) -> bool {
        self.last_season.is_some()
    }
}

/// Mean of the trailing `window` observations.
#[derive(Debug, Clone)]
pub struct WindowAverage {
    window: usize,
    mean: Option<f64>,
}

impl WindowAverage {
    pub fn new(window: usize) -> Self {
        Self { window, mean: None }
    }
}

impl Forecaster for WindowAverage {
    fn fit(&mut self, history: &[f64]) -> ModelResult<()> {
        check_history(history, self.window)?;
        let tail = &history[history.len() - self.window..];
        self.mean = Some(tail.iter().sum::<f64>() / tail.len() as f64);
        Ok(())
    }

    fn forecast(&self, horizon: usize) -> ModelResult<Vec<f64>> {
        let mean = self.mean.ok_or(ModelError::NotFitted)?;
        Ok(vec![mean; horizon])
    }

    fn name(&self) -> &str {
        "WindowAverage"
    }

    fn is_fitted(&self) -> bool {
        self.mean.is_some()
    }
}

/// Random walk with drift: extends the line through the first and last points.
#[derive(Debug, Clone, Default)]
pub struct Drift {
    state: Option<(f64, f64)>, // (last value, slope)
}

impl Drift {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Forecaster for Drift {
    fn fit(&mut self, history: &[f64]) -> ModelResult<()> {
        check_history(history, 2)?;
        let first = history[0];
        let last = history[history.len() - 1];
        let slope = (last - first) / (history.len() - 1) as f64;
        self.state = Some((last, slope));
        Ok(())
    }

    fn forecast(&self, horizon: usize) -> ModelResult<Vec<f64>> {
        let (last, slope) = self.state.ok_or(ModelError::NotFitted)?;
        check_forecast((1..=horizon).map(|h| last + slope * h as f64).collect())
    }

    fn name(&self) -> &str {
        "Drift"
    }

    fn is_fitted(&self) -> bool {
        self.state.is_some()
    }
}
