use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::loaders::ColumnMapping;
use crate::providers::{CsvDatasetProvider, DatasetProvider, ParquetDatasetProvider};

/// Data source configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSourceConfig {
    pub path: PathBuf,
    #[serde(default)]
    pub format: DataFormat,
    #[serde(default)]
    pub columns: ColumnMapping,
    /// Restrict the dataset to one series before evaluation.
    #[serde(default)]
    pub series: Option<String>,
}

/// File formats supported by the bundled providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataFormat {
    Csv,
    Parquet,
}

impl Default for DataFormat {
    fn default() -> Self {
        Self::Csv
    }
}

impl DataSourceConfig {
    pub fn csv(path: &str) -> Self {
        Self {
            path: PathBuf::from(path),
            format: DataFormat::Csv,
            columns: ColumnMapping::default(),
            series: None,
        }
    }

    pub fn parquet(path: &str) -> Self {
        Self {
            path: PathBuf::from(path),
            format: DataFormat::Parquet,
            columns: ColumnMapping::default(),
            series: None,
        }
    }

    pub fn with_columns(mut self, columns: ColumnMapping) -> Self {
        self.columns = columns;
        self
    }

    pub fn with_series(mut self, series_id: &str) -> Self {
        self.series = Some(series_id.to_string());
        self
    }

    /// Build the provider matching this source's format.
    pub fn provider(&self) -> Box<dyn DatasetProvider> {
        match self.format {
            DataFormat::Csv => Box::new(
                CsvDatasetProvider::new(&self.path).with_columns(self.columns.clone()),
            ),
            DataFormat::Parquet => Box::new(
                ParquetDatasetProvider::new(&self.path).with_columns(self.columns.clone()),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_with_defaults() {
        let json = r#"{"path": "data/sales.csv", "series": "store_7"}"#;
        let config: DataSourceConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.format, DataFormat::Csv);
        assert_eq!(config.columns, ColumnMapping::default());
        assert_eq!(config.series.as_deref(), Some("store_7"));
    }

    #[test]
    fn provider_matches_format() {
        let csv = DataSourceConfig::csv("a.csv").provider();
        assert_eq!(csv.name(), "CSV Provider");
        let parquet = DataSourceConfig::parquet("a.parquet")
            .with_series("x")
            .provider();
        assert_eq!(parquet.name(), "Parquet Provider");
    }
}
