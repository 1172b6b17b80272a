use thiserror::Error;

/// Main error type for the GridCast system
#[derive(Error, Debug)]
pub enum GcError {
    #[error("Data error: {0}")]
    Data(#[from] DataError),

    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    #[error("Search error: {0}")]
    Search(#[from] SearchError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Data-related errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DataError {
    #[error("Data source not found: {0}")]
    SourceNotFound(String),

    #[error("Column not found: {column}")]
    ColumnNotFound { column: String },

    #[error("Series not found: {series_id}")]
    SeriesNotFound { series_id: String },

    #[error("Row index {index} out of bounds for dataset of length {len}")]
    IndexOutOfBounds { index: usize, len: usize },

    #[error("Column length mismatch: column {column} has {got} rows, expected {expected}")]
    LengthMismatch {
        column: String,
        expected: usize,
        got: usize,
    },

    #[error("Timestamps not ordered for series {series_id} at row {row}")]
    UnorderedTimestamps { series_id: String, row: usize },

    #[error("Invalid data format: {message}")]
    InvalidFormat { message: String },

    #[error("Data loading failed: {message}")]
    LoadingFailed { message: String },

    #[error("Data parsing error: {message}")]
    ParseError { message: String },

    #[error("Dataset not found in store: {id}")]
    NotInStore { id: String },
}

/// Model construction, fitting, and forecasting errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("Unknown parameter '{parameter}' for model {model}")]
    UnknownParameter { model: String, parameter: String },

    #[error("Invalid parameter '{parameter}': {message}")]
    InvalidParameter { parameter: String, message: String },

    #[error("Insufficient data: need at least {needed} observations, got {got}")]
    InsufficientData { needed: usize, got: usize },

    #[error("Model must be fitted before forecasting")]
    NotFitted,

    #[error("Numerical failure: {message}")]
    Numerical { message: String },
}

/// Construction-time contract violations detected before any task runs
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SearchError {
    #[error("Search space is empty")]
    EmptySearchSpace,

    #[error("Parameter '{parameter}' of model {model} has no candidate values")]
    EmptyValues { model: String, parameter: String },

    #[error("Parameter '{parameter}' declared twice for model {model}")]
    DuplicateParameter { model: String, parameter: String },

    #[error("Invalid range for parameter '{parameter}': {message}")]
    InvalidRange { parameter: String, message: String },

    #[error("No metrics requested")]
    NoMetrics,

    #[error("Evaluation metric '{metric}' is not among the requested metrics {available:?}")]
    UnknownEvalMetric {
        metric: String,
        available: Vec<String>,
    },

    #[error("Unknown metric: {0}")]
    UnknownMetric(String),

    #[error("Invalid mode '{0}': expected 'minimize' or 'maximize'")]
    InvalidMode(String),

    #[error("Invalid fold {fold}: {message}")]
    InvalidFold { fold: usize, message: String },

    #[error("Cannot produce {splits} splits from {samples} samples")]
    TooFewSamples { splits: usize, samples: usize },

    #[error("Invalid experiment name '{0}'")]
    InvalidName(String),

    #[error("Result count mismatch: expected {expected}, got {got}")]
    ResultCountMismatch { expected: usize, got: usize },
}

/// Result type alias for GridCast operations
pub type GcResult<T> = Result<T, GcError>;

/// Macro for creating internal errors
#[macro_export]
macro_rules! internal_error {
    ($($arg:tt)*) => {
        $crate::GcError::Internal(format!($($arg)*))
    };
}

/// Macro for creating configuration errors
#[macro_export]
macro_rules! config_error {
    ($($arg:tt)*) => {
        $crate::GcError::Config(format!($($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = SearchError::UnknownEvalMetric {
            metric: "mase".to_string(),
            available: vec!["mae".to_string(), "mse".to_string()],
        };

        assert!(error.to_string().contains("mase"));
        assert!(error.to_string().contains("mae"));

        let error = ModelError::InsufficientData { needed: 2, got: 1 };
        assert_eq!(
            error.to_string(),
            "Insufficient data: need at least 2 observations, got 1"
        );
    }

    #[test]
    fn test_error_conversion() {
        let search_error = SearchError::InvalidMode("sideways".to_string());
        let gc_error: GcError = search_error.into();

        match gc_error {
            GcError::Search(SearchError::InvalidMode(mode)) => assert_eq!(mode, "sideways"),
            other => panic!("Expected Search error, got {other:?}"),
        }
    }

    #[test]
    fn test_macros() {
        let internal_err = internal_error!("Something went wrong");
        assert!(matches!(internal_err, GcError::Internal(_)));
        let config_err = config_error!("Missing required field: {}", "target_column");
        assert!(config_err.to_string().contains("target_column"));
    }
}
