//! Cross-validation folds over the rows of a dataset.

use gc_types::SearchError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A train/test partition expressed as row indices into the dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fold {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

impl Fold {
    pub fn new(train: Vec<usize>, test: Vec<usize>) -> Self {
        Self { train, test }
    }

    /// Contiguous fold from half-open ranges.
    pub fn from_ranges(train: std::ops::Range<usize>, test: std::ops::Range<usize>) -> Self {
        Self::new(train.collect(), test.collect())
    }

    /// Check the fold against a dataset of `len` rows.
    ///
    /// Test indices must be non-empty, every index must be in bounds, and the
    /// two sides must be disjoint. An empty training side is allowed; models
    /// report it as a fit failure.
    pub fn validate(&self, position: usize, len: usize) -> Result<(), SearchError> {
        let invalid = |message: String| SearchError::InvalidFold {
            fold: position,
            message,
        };

        if self.test.is_empty() {
            return Err(invalid("test indices are empty".to_string()));
        }
        if let Some(&index) = self.train.iter().chain(&self.test).find(|&&i| i >= len) {
            return Err(invalid(format!(
                "row index {index} out of bounds for {len} rows"
            )));
        }

        let train: HashSet<usize> = self.train.iter().copied().collect();
        if let Some(index) = self.test.iter().find(|i| train.contains(i)) {
            return Err(invalid(format!("row {index} is in both train and test")));
        }
        Ok(())
    }
}

/// Produces folds for a dataset of a given length.
pub trait Splitter {
    fn split(&self, n_samples: usize) -> Result<Vec<Fold>, SearchError>;
}

/// Expanding-window time series splits.
///
/// Test windows of `test_size` rows are laid end to end at the tail of the
/// data; each training window covers everything before its test window minus
/// `gap` rows, optionally capped at `max_train_size` most recent rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesSplit {
    pub n_splits: usize,
    /// Defaults to `n_samples / (n_splits + 1)`.
    #[serde(default)]
    pub test_size: Option<usize>,
    #[serde(default)]
    pub gap: usize,
    #[serde(default)]
    pub max_train_size: Option<usize>,
}

impl TimeSeriesSplit {
    pub fn new(n_splits: usize) -> Self {
        Self {
            n_splits,
            test_size: None,
            gap: 0,
            max_train_size: None,
        }
    }

    pub fn with_test_size(mut self, test_size: usize) -> Self {
        self.test_size = Some(test_size);
        self
    }

    pub fn with_gap(mut self, gap: usize) -> Self {
        self.gap = gap;
        self
    }

    pub fn with_max_train_size(mut self, max_train_size: usize) -> Self {
        self.max_train_size = Some(max_train_size);
        self
    }
}

impl Default for TimeSeriesSplit {
    fn default() -> Self {
        Self::new(5)
    }
}

impl Splitter for TimeSeriesSplit {
    fn split(&self, n_samples: usize) -> Result<Vec<Fold>, SearchError> {
        let too_few = SearchError::TooFewSamples {
            splits: self.n_splits,
            samples: n_samples,
        };
        if self.n_splits == 0 || self.n_splits >= n_samples {
            return Err(too_few);
        }

        let test_size = match (self.test_size, self.n_splits.checked_add(1)) {
            (Some(size), _) => size,
            (None, Some(parts)) => n_samples / parts,
            (None, None) => return Err(too_few),
        };
        if test_size == 0 {
            return Err(too_few);
        }

        let needed = test_size
            .checked_mul(self.n_splits)
            .and_then(|t| t.checked_add(self.gap));
        let first_test = match needed {
            Some(needed) if needed < n_samples => n_samples - test_size * self.n_splits,
            _ => return Err(too_few),
        };

        Ok((0..self.n_splits)
            .map(|k| {
                let test_start = first_test + k * test_size;
                let train_end = test_start - self.gap;
                let train_start = match self.max_train_size {
                    Some(max) if max < train_end => train_end - max,
                    _ => 0,
                };
                Fold::from_ranges(train_start..train_end, test_start..test_start + test_size)
            })
            .collect())
    }
}

/// How the folds of an evaluation are obtained.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitSpec {
    /// `k` expanding-window splits with default sizing.
    Count(usize),
    /// A fully parameterized time series splitter.
    TimeSeries(TimeSeriesSplit),
    /// Precomputed folds used as given.
    Explicit(Vec<Fold>),
}

impl SplitSpec {
    /// Resolve into concrete folds for a dataset of `n_samples` rows.
    pub fn resolve(&self, n_samples: usize) -> Result<Vec<Fold>, SearchError> {
        let folds = match self {
            SplitSpec::Count(k) => TimeSeriesSplit::new(*k).split(n_samples)?,
            SplitSpec::TimeSeries(splitter) => splitter.split(n_samples)?,
            SplitSpec::Explicit(folds) => {
                if folds.is_empty() {
                    return Err(SearchError::TooFewSamples {
                        splits: 0,
                        samples: n_samples,
                    });
                }
                folds.clone()
            }
        };

        for (position, fold) in folds.iter().enumerate() {
            fold.validate(position, n_samples)?;
        }
        Ok(folds)
    }
}

impl Default for SplitSpec {
    fn default() -> Self {
        SplitSpec::Count(5)
    }
}
