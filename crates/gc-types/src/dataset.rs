use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::errors::DataError;

/// Sampling frequency of a series.
///
/// Model kinds that need a seasonal period fall back to [`Frequency::season_length`]
/// when the configuration does not pin one explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Hourly,
    Daily,
    Weekly,
    Monthly,
    Quarterly,
    Yearly,
}

impl Frequency {
    /// Number of observations in one natural seasonal cycle.
    pub fn season_length(&self) -> usize {
        match self {
            Frequency::Hourly => 24,
            Frequency::Daily => 7,
            Frequency::Weekly => 52,
            Frequency::Monthly => 12,
            Frequency::Quarterly => 4,
            Frequency::Yearly => 1,
        }
    }
}

impl Default for Frequency {
    fn default() -> Self {
        Self::Daily
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Frequency::Hourly => "hourly",
            Frequency::Daily => "daily",
            Frequency::Weekly => "weekly",
            Frequency::Monthly => "monthly",
            Frequency::Quarterly => "quarterly",
            Frequency::Yearly => "yearly",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for Frequency {
    type Err = DataError;

    /// Accepts the long names as well as the pandas-style aliases (`H`, `D`, `W`, `M`, `Q`, `Y`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "hourly" | "h" => Ok(Frequency::Hourly),
            "daily" | "d" => Ok(Frequency::Daily),
            "weekly" | "w" => Ok(Frequency::Weekly),
            "monthly" | "m" | "ms" => Ok(Frequency::Monthly),
            "quarterly" | "q" | "qs" => Ok(Frequency::Quarterly),
            "yearly" | "y" | "a" => Ok(Frequency::Yearly),
            other => Err(DataError::ParseError {
                message: format!("Unknown frequency: {}", other),
            }),
        }
    }
}

/// A named numeric column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub values: Vec<f64>,
}

/// Ordered, fixed-length table of observations.
///
/// Stored column-wise: one series identifier and one timestamp per row, plus
/// any number of named `f64` columns (the target and extra regressors). A
/// dataset is never mutated once an evaluation run has started; workers share
/// it behind an `Arc`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    series_ids: Vec<String>,
    timestamps: Vec<DateTime<Utc>>,
    columns: Vec<Column>,
}

impl Dataset {
    pub fn new(series_ids: Vec<String>, timestamps: Vec<DateTime<Utc>>) -> Result<Self, DataError> {
        if series_ids.len() != timestamps.len() {
            return Err(DataError::LengthMismatch {
                column: "timestamp".to_string(),
                expected: series_ids.len(),
                got: timestamps.len(),
            });
        }

        Ok(Self {
            series_ids,
            timestamps,
            columns: Vec::new(),
        })
    }

    /// Convenience constructor for a single series with one numeric column.
    pub fn single_series(
        series_id: &str,
        timestamps: Vec<DateTime<Utc>>,
        column: &str,
        values: Vec<f64>,
    ) -> Result<Self, DataError> {
        let series_ids = vec![series_id.to_string(); timestamps.len()];
        Self::new(series_ids, timestamps)?.with_column(column, values)
    }

    /// Attach (or replace) a numeric column.
    pub fn with_column(mut self, name: &str, values: Vec<f64>) -> Result<Self, DataError> {
        if values.len() != self.len() {
            return Err(DataError::LengthMismatch {
                column: name.to_string(),
                expected: self.len(),
                got: values.len(),
            });
        }

        let column = Column {
            name: name.to_string(),
            values,
        };
        match self.columns.iter_mut().find(|c| c.name == name) {
            Some(existing) => *existing = column,
            None => self.columns.push(column),
        }
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.series_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series_ids.is_empty()
    }

    pub fn series_ids(&self) -> &[String] {
        &self.series_ids
    }

    pub fn timestamps(&self) -> &[DateTime<Utc>] {
        &self.timestamps
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    pub fn column(&self, name: &str) -> Result<&[f64], DataError> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.values.as_slice())
            .ok_or_else(|| DataError::ColumnNotFound {
                column: name.to_string(),
            })
    }

    /// Gather the values of `column` at the given row indices, in index order.
    pub fn select(&self, indices: &[usize], column: &str) -> Result<Vec<f64>, DataError> {
        let values = self.column(column)?;
        indices
            .iter()
            .map(|&i| {
                values.get(i).copied().ok_or(DataError::IndexOutOfBounds {
                    index: i,
                    len: values.len(),
                })
            })
            .collect()
    }

    /// Distinct series identifiers in order of first appearance.
    pub fn distinct_series(&self) -> Vec<&str> {
        let mut seen = Vec::new();
        for id in &self.series_ids {
            if !seen.contains(&id.as_str()) {
                seen.push(id.as_str());
            }
        }
        seen
    }

    /// Restrict the dataset to the rows of a single series, preserving row order.
    pub fn filter_series(&self, series_id: &str) -> Result<Self, DataError> {
        let rows: Vec<usize> = self
            .series_ids
            .iter()
            .enumerate()
            .filter(|(_, id)| id.as_str() == series_id)
            .map(|(i, _)| i)
            .collect();

        if rows.is_empty() {
            return Err(DataError::SeriesNotFound {
                series_id: series_id.to_string(),
            });
        }

        Ok(Self {
            series_ids: rows.iter().map(|&i| self.series_ids[i].clone()).collect(),
            timestamps: rows.iter().map(|&i| self.timestamps[i]).collect(),
            columns: self
                .columns
                .iter()
                .map(|c| Column {
                    name: c.name.clone(),
                    values: rows.iter().map(|&i| c.values[i]).collect(),
                })
                .collect(),
        })
    }

    /// Check the provider contract: equal column lengths and timestamps
    /// non-decreasing within each series.
    pub fn validate(&self) -> Result<(), DataError> {
        let n = self.len();
        if self.timestamps.len() != n {
            return Err(DataError::LengthMismatch {
                column: "timestamp".to_string(),
                expected: n,
                got: self.timestamps.len(),
            });
        }
        for column in &self.columns {
            if column.values.len() != n {
                return Err(DataError::LengthMismatch {
                    column: column.name.clone(),
                    expected: n,
                    got: column.values.len(),
                });
            }
        }

        let mut last_seen: HashMap<&str, DateTime<Utc>> = HashMap::new();
        for (row, (id, ts)) in self.series_ids.iter().zip(&self.timestamps).enumerate() {
            if let Some(previous) = last_seen.insert(id.as_str(), *ts) {
                if *ts < previous {
                    return Err(DataError::UnorderedTimestamps {
                        series_id: id.clone(),
                        row,
                    });
                }
            }
        }

        Ok(())
    }
}
