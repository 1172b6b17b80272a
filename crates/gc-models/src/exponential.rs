//! Exponential smoothing forecasters.

use gc_types::ModelError;

use crate::traits::{check_forecast, check_history, Forecaster, ModelResult};

/// Simple exponential smoothing.
///
/// `level_t = α × y_t + (1-α) × level_{t-1}`, forecasts are flat at the final level.
#[derive(Debug, Clone)]
pub struct SimpleExponentialSmoothing {
    alpha: f64,
    level: Option<f64>,
}

impl SimpleExponentialSmoothing {
    pub fn new(alpha: f64) -> Self {
        Self { alpha, level: None }
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }
}

impl Forecaster for SimpleExponentialSmoothing {
    fn fit(&mut self, history: &[f64]) -> ModelResult<()> {
        check_history(history, 1)?;
        let level = history[1..]
            .iter()
            .fold(history[0], |level, &y| self.alpha * y + (1.0 - self.alpha) * level);
        self.level = Some(level);
        Ok(())
    }

    fn forecast(&self, horizon: usize) -> ModelResult<Vec<f64>> {
        let level = self.level.ok_or(ModelError::NotFitted)?;
        check_forecast(vec![level; horizon])
    }

    fn name(&self) -> &str {
        "SES"
    }

    fn is_fitted(&self) -> bool {
        self.level.is_some()
    }
}

/// Holt's linear trend method with optional damping.
///
/// ```text
/// level_t = α y_t + (1-α)(level_{t-1} + φ trend_{t-1})
/// trend_t = β (level_t - level_{t-1}) + (1-β) φ trend_{t-1}
/// ŷ_{n+h} = level_n + (φ + φ² + … + φʰ) trend_n
/// ```
///
/// `φ = 1` gives the undamped method.
#[derive(Debug, Clone)]
pub struct Holt {
    alpha: f64,
    beta: f64,
    phi: f64,
    state: Option<(f64, f64)>, // (level, trend)
}

impl Holt {
    pub fn new(alpha: f64, beta: f64) -> Self {
        Self::damped(alpha, beta, 1.0)
    }

    pub fn damped(alpha: f64, beta: f64, phi: f64) -> Self {
        Self {
            alpha,
            beta,
            phi,
            state: None,
        }
    }
}

impl Forecaster for Holt {
    fn fit(&mut self, history: &[f64]) -> ModelResult<()> {
        check_history(history, 2)?;

        let mut level = history[0];
        let mut trend = history[1] - history[0];
        for &y in &history[1..] {
            let previous = level;
            level = self.alpha * y + (1.0 - self.alpha) * (previous + self.phi * trend);
            trend = self.beta * (level - previous) + (1.0 - self.beta) * self.phi * trend;
        }

        if !level.is_finite() || !trend.is_finite() {
            return Err(ModelError::Numerical {
                message: "Holt state diverged during fitting".to_string(),
            });
        }
        self.state = Some((level, trend));
        Ok(())
    }

    fn forecast(&self, horizon: usize) -> ModelResult<Vec<f64>> {
        let (level, trend) = self.state.ok_or(ModelError::NotFitted)?;

        let mut damping = 0.0;
        let mut phi_power = 1.0;
        let values = (0..horizon)
            .map(|_| {
                phi_power *= self.phi;
                damping += phi_power;
                level + damping * trend
            })
            .collect();
        check_forecast(values)
    }

    fn name(&self) -> &str {
        "Holt"
    }

    fn is_fitted(&self) -> bool {
        self.state.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ses_level_recursion() {
        let mut model = SimpleExponentialSmoothing::new(0.5);
        model.fit(&[2.0, 4.0, 8.0]).unwrap();
        // 2 -> 3 -> 5.5
        assert_eq!(model.forecast(2).unwrap(), vec![5.5, 5.5]);
        assert_eq!(model.alpha(), 0.5);
    }

    #[test]
    fn ses_alpha_one_is_naive() {
        let mut model = SimpleExponentialSmoothing::new(1.0);
        model.fit(&[3.0, 1.0, 7.0]).unwrap();
        assert_eq!(model.forecast(1).unwrap(), vec![7.0]);
    }

    #[test]
    fn holt_tracks_linear_series_exactly() {
        let mut model = Holt::new(0.3, 0.2);
        model.fit(&[1.0, 2.0, 3.0, 4.0]).unwrap();
        let forecast = model.forecast(2).unwrap();
        assert!((forecast[0] - 5.0).abs() < 1e-12);
        assert!((forecast[1] - 6.0).abs() < 1e-12);
    }

    #[test]
    fn damped_trend_flattens() {
        let mut model = Holt::damped(0.5, 0.5, 0.5);
        model.fit(&[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        let f = model.forecast(4).unwrap();
        let steps: Vec<f64> = f.windows(2).map(|w| w[1] - w[0]).collect();
        assert!(steps.windows(2).all(|s| s[1] < s[0]));
    }

    #[test]
    fn holt_needs_two_points() {
        let mut model = Holt::new(0.5, 0.5);
        assert_eq!(
            model.fit(&[1.0]),
            Err(ModelError::InsufficientData { needed: 2, got: 1 })
        );
        assert_eq!(model.forecast(1), Err(ModelError::NotFitted));
    }
}
