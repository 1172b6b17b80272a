use std::path::{Path, PathBuf};

use async_trait::async_trait;
use gc_types::{Dataset, GcResult};

use crate::loaders::{BatchLoader, ColumnMapping};

/// Trait for dataset providers (CSV, Parquet, in-memory, ...)
#[async_trait]
pub trait DatasetProvider: Send + Sync + std::fmt::Debug {
    /// Load the full, ordered observation table.
    async fn load(&self) -> GcResult<Dataset>;

    /// Load only the rows of one series.
    async fn load_series(&self, series_id: &str) -> GcResult<Dataset> {
        let dataset = self.load().await?;
        Ok(dataset.filter_series(series_id)?)
    }

    /// Get provider name
    fn name(&self) -> &str;
}

/// CSV data provider for a single local file
#[derive(Debug)]
pub struct CsvDatasetProvider {
    pub path: PathBuf,
    pub columns: ColumnMapping,
    loader: BatchLoader,
}

impl CsvDatasetProvider {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            columns: ColumnMapping::default(),
            loader: BatchLoader::new(),
        }
    }

    pub fn with_columns(mut self, columns: ColumnMapping) -> Self {
        self.columns = columns;
        self
    }
}

#[async_trait]
impl DatasetProvider for CsvDatasetProvider {
    async fn load(&self) -> GcResult<Dataset> {
        self.loader.load_csv_file(&self.path, &self.columns).await
    }

    fn name(&self) -> &str {
        "CSV Provider"
    }
}

/// Parquet data provider for a single local file
#[derive(Debug)]
pub struct ParquetDatasetProvider {
    pub path: PathBuf,
    pub columns: ColumnMapping,
    loader: BatchLoader,
}

impl ParquetDatasetProvider {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            columns: ColumnMapping::default(),
            loader: BatchLoader::new(),
        }
    }

    pub fn with_columns(mut self, columns: ColumnMapping) -> Self {
        self.columns = columns;
        self
    }
}

#[async_trait]
impl DatasetProvider for ParquetDatasetProvider {
    async fn load(&self) -> GcResult<Dataset> {
        self.loader.load_parquet_file(&self.path, &self.columns).await
    }

    fn name(&self) -> &str {
        "Parquet Provider"
    }
}

/// Provider over a dataset that is already in memory
#[derive(Debug, Clone)]
pub struct InMemoryProvider {
    dataset: Dataset,
}

impl InMemoryProvider {
    pub fn new(dataset: Dataset) -> Self {
        Self { dataset }
    }
}

#[async_trait]
impl DatasetProvider for InMemoryProvider {
    async fn load(&self) -> GcResult<Dataset> {
        self.dataset.validate()?;
        Ok(self.dataset.clone())
    }

    fn name(&self) -> &str {
        "In-Memory Provider"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use gc_types::{DataError, GcError};
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn in_memory_provider_filters_series() {
        let ts: Vec<_> = (0..2)
            .map(|d| Utc.with_ymd_and_hms(2024, 3, 1 + d, 0, 0, 0).unwrap())
            .collect();
        let ids = vec!["a".to_string(), "a".to_string(), "b".to_string(), "b".to_string()];
        let timestamps = ts.iter().chain(ts.iter()).copied().collect();
        let ds = Dataset::new(ids, timestamps)
            .unwrap()
            .with_column("y", vec![1.0, 2.0, 3.0, 4.0])
            .unwrap();

        let provider = InMemoryProvider::new(ds);
        assert_eq!(provider.load().await.unwrap().len(), 4);

        let b = provider.load_series("b").await.unwrap();
        assert_eq!(b.column("y").unwrap(), &[3.0, 4.0]);

        let err = provider.load_series("z").await.unwrap_err();
        assert!(matches!(err, GcError::Data(DataError::SeriesNotFound { .. })));
    }

    #[tokio::test]
    async fn csv_provider_uses_mapping() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "store,week,sales").unwrap();
        writeln!(temp_file, "n1,2024-01-01,5").unwrap();
        writeln!(temp_file, "n1,2024-01-08,6").unwrap();
        temp_file.flush().unwrap();

        let provider = CsvDatasetProvider::new(temp_file.path())
            .with_columns(ColumnMapping::new("store", "week"));
        let ds = provider.load().await.unwrap();
        assert_eq!(provider.name(), "CSV Provider");
        assert_eq!(ds.series_ids(), &["n1".to_string(), "n1".to_string()]);
        assert_eq!(ds.column("sales").unwrap(), &[5.0, 6.0]);
    }

    #[tokio::test]
    async fn in_memory_provider_rejects_unordered_data() {
        let ts = vec![
            Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        ];
        let ds = Dataset::single_series("s", ts, "y", vec![1.0, 2.0]).unwrap();
        let result = InMemoryProvider::new(ds).load().await;
        assert!(matches!(
            result,
            Err(GcError::Data(DataError::UnorderedTimestamps { .. }))
        ));
    }
}
