//! Forecaster trait defining the common interface for all model kinds.

use gc_types::ModelError;

/// Result type alias for model operations.
pub type ModelResult<T> = std::result::Result<T, ModelError>;

/// Common interface for all forecasting models.
///
/// Instances are created per task by [`crate::ModelSpec::build`], fitted on one
/// training slice, and dropped after forecasting. Fitted state never leaves the
/// task that owns the model.
pub trait Forecaster: Send {
    /// Fit the model to the training values (oldest first).
    fn fit(&mut self, history: &[f64]) -> ModelResult<()>;

    /// Produce exactly `horizon` point forecasts.
    fn forecast(&self, horizon: usize) -> ModelResult<Vec<f64>>;

    /// Get the model name.
    fn name(&self) -> &str;

    /// Check if the model has been fitted.
    fn is_fitted(&self) -> bool;
}

/// Type alias for boxed forecaster trait objects.
pub type BoxedForecaster = Box<dyn Forecaster>;

/// Reject empty, short, or non-finite training data.
pub(crate) fn check_history(history: &[f64], needed: usize) -> ModelResult<()> {
    if history.len() < needed {
        return Err(ModelError::InsufficientData {
            needed,
            got: history.len(),
        });
    }
    if history.iter().any(|v| !v.is_finite()) {
        return Err(ModelError::Numerical {
            message: "training data contains missing or non-finite values".to_string(),
        });
    }
    Ok(())
}

/// Fail when a model produced non-finite forecasts.
pub(crate) fn check_forecast(values: Vec<f64>) -> ModelResult<Vec<f64>> {
    if values.iter().all(|v| v.is_finite()) {
        Ok(values)
    } else {
        Err(ModelError::Numerical {
            message: "forecast diverged to a non-finite value".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_checks() {
        assert!(check_history(&[1.0, 2.0], 2).is_ok());
        assert_eq!(
            check_history(&[1.0], 2),
            Err(ModelError::InsufficientData { needed: 2, got: 1 })
        );
        assert!(matches!(
            check_history(&[1.0, f64::NAN], 1),
            Err(ModelError::Numerical { .. })
        ));
    }

    #[test]
    fn forecast_checks() {
        assert_eq!(check_forecast(vec![1.0]).unwrap(), vec![1.0]);
        assert!(check_forecast(vec![1.0, f64::INFINITY]).is_err());
    }
}
