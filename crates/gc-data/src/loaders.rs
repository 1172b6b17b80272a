use std::fs;
use std::path::Path;

use arrow::array::{Array, ArrayRef, Float64Array, StringArray, TimestampNanosecondArray};
use arrow::compute::cast;
use arrow::datatypes::{DataType, TimeUnit};
use arrow::record_batch::RecordBatch;
use chrono::{DateTime, NaiveDateTime, Utc};
use gc_types::{DataError, Dataset, GcResult};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde::{Deserialize, Serialize};

/// Series id assigned to every row when the source has no series column.
pub const DEFAULT_SERIES_ID: &str = "series_0";

const TIMESTAMP_ALIASES: &[&str] = &["timestamp", "ds", "date", "datetime", "time"];
const SERIES_ALIASES: &[&str] = &["series_id", "unique_id", "id", "series", "item_id"];

/// Which source columns hold the series id, the timestamp, and the numeric values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnMapping {
    /// Series identifier column. Detected from common names when unset; if no
    /// such column exists, all rows belong to [`DEFAULT_SERIES_ID`].
    #[serde(default)]
    pub series_column: Option<String>,
    /// Timestamp column. Detected from common names when unset.
    #[serde(default)]
    pub timestamp_column: Option<String>,
    /// Numeric columns to read. When unset, every remaining column with at
    /// least one numeric cell is read.
    #[serde(default)]
    pub value_columns: Option<Vec<String>>,
}

impl ColumnMapping {
    pub fn new(series_column: &str, timestamp_column: &str) -> Self {
        Self {
            series_column: Some(series_column.to_string()),
            timestamp_column: Some(timestamp_column.to_string()),
            value_columns: None,
        }
    }

    pub fn with_value_columns(mut self, columns: &[&str]) -> Self {
        self.value_columns = Some(columns.iter().map(|c| c.to_string()).collect());
        self
    }

    /// Resolve the mapping against a header row.
    fn resolve(&self, headers: &[&str]) -> GcResult<ResolvedColumns> {
        let find = |name: &str| headers.iter().position(|h| *h == name);
        let find_alias = |aliases: &[&str]| {
            headers
                .iter()
                .position(|h| aliases.contains(&h.to_lowercase().as_str()))
        };

        let timestamp_idx = match &self.timestamp_column {
            Some(name) => find(name).ok_or_else(|| DataError::ColumnNotFound {
                column: name.clone(),
            })?,
            None => find_alias(TIMESTAMP_ALIASES).ok_or_else(|| DataError::ParseError {
                message: "Could not find timestamp column in headers".to_string(),
            })?,
        };

        let series_idx = match &self.series_column {
            Some(name) => Some(find(name).ok_or_else(|| DataError::ColumnNotFound {
                column: name.clone(),
            })?),
            None => find_alias(SERIES_ALIASES),
        };

        let values = match &self.value_columns {
            Some(names) => names
                .iter()
                .map(|name| {
                    find(name)
                        .map(|idx| (idx, name.clone()))
                        .ok_or_else(|| DataError::ColumnNotFound {
                            column: name.clone(),
                        })
                })
                .collect::<Result<Vec<_>, _>>()?,
            None => headers
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != timestamp_idx && Some(*i) != series_idx)
                .map(|(i, h)| (i, h.to_string()))
                .collect(),
        };

        Ok(ResolvedColumns {
            series_idx,
            timestamp_idx,
            values,
        })
    }
}

#[derive(Debug)]
struct ResolvedColumns {
    series_idx: Option<usize>,
    timestamp_idx: usize,
    values: Vec<(usize, String)>,
}

/// Column-wise accumulator shared by the CSV and Parquet readers.
#[derive(Debug, Default)]
struct DatasetAccumulator {
    series_ids: Vec<String>,
    timestamps: Vec<DateTime<Utc>>,
    columns: Vec<(String, Vec<f64>)>,
}

impl DatasetAccumulator {
    fn with_columns(names: impl IntoIterator<Item = String>) -> Self {
        Self {
            columns: names.into_iter().map(|n| (n, Vec::new())).collect(),
            ..Default::default()
        }
    }

    fn push(&mut self, series_id: String, timestamp: DateTime<Utc>, values: Vec<f64>) {
        self.series_ids.push(series_id);
        self.timestamps.push(timestamp);
        for ((_, column), value) in self.columns.iter_mut().zip(values) {
            column.push(value);
        }
    }

    fn finish(self) -> GcResult<Dataset> {
        let mut dataset = Dataset::new(self.series_ids, self.timestamps)?;
        for (name, values) in self.columns {
            dataset = dataset.with_column(&name, values)?;
        }
        dataset.validate()?;
        Ok(dataset)
    }
}

/// Batch data loader for tabular observation files
#[derive(Debug)]
pub struct BatchLoader {
    batch_size: usize,
}

impl BatchLoader {
    pub fn new() -> Self {
        Self {
            batch_size: 8192, // Parquet rows per record batch
        }
    }

    pub fn with_batch_size(batch_size: usize) -> Self {
        Self { batch_size }
    }

    /// Load a dataset from a CSV file with a header row.
    ///
    /// Empty numeric cells become `NaN`; records whose timestamp or numeric
    /// cells cannot be parsed are skipped with a warning. Without explicit
    /// value columns, columns holding no numeric cell at all are ignored.
    pub async fn load_csv_file<P: AsRef<Path>>(
        &self,
        file_path: P,
        mapping: &ColumnMapping,
    ) -> GcResult<Dataset> {
        use csv::ReaderBuilder;

        let path = file_path.as_ref();
        tracing::info!("Loading CSV data from: {}", path.display());

        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_path(path)
            .map_err(|e| DataError::LoadingFailed {
                message: format!("Failed to open CSV file {}: {}", path.display(), e),
            })?;

        let headers = rdr
            .headers()
            .map_err(|e| DataError::LoadingFailed {
                message: format!("Failed to read CSV headers: {}", e),
            })?
            .clone();
        tracing::debug!("CSV headers: {:?}", headers);

        let header_names: Vec<&str> = headers.iter().collect();
        let mut resolved = mapping.resolve(&header_names)?;

        let records = rdr
            .records()
            .enumerate()
            .map(|(line_num, result)| {
                result.map_err(|e| DataError::LoadingFailed {
                    message: format!("Failed to read CSV record at line {}: {}", line_num + 2, e),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        // Without an explicit value list, drop text columns: those with no numeric cell.
        if mapping.value_columns.is_none() {
            resolved.values.retain(|(idx, name)| {
                let numeric = records
                    .iter()
                    .filter_map(|record| record.get(*idx))
                    .any(|cell| !cell.is_empty() && cell.parse::<f64>().is_ok());
                if !numeric {
                    tracing::debug!("Ignoring non-numeric CSV column '{}'", name);
                }
                numeric
            });
        }

        let mut acc =
            DatasetAccumulator::with_columns(resolved.values.iter().map(|(_, n)| n.clone()));

        for (line_num, record) in records.iter().enumerate() {
            match Self::parse_csv_record(record, &resolved) {
                Ok((series_id, timestamp, values)) => acc.push(series_id, timestamp, values),
                Err(e) => {
                    tracing::warn!("Skipping invalid record at line {}: {}", line_num + 2, e);
                    continue;
                }
            }
        }

        let dataset = acc.finish()?;
        tracing::info!(
            "Loaded {} rows ({} series) from CSV file",
            dataset.len(),
            dataset.distinct_series().len()
        );
        Ok(dataset)
    }

    fn parse_csv_record(
        record: &csv::StringRecord,
        columns: &ResolvedColumns,
    ) -> Result<(String, DateTime<Utc>, Vec<f64>), DataError> {
        let series_id = match columns.series_idx {
            Some(idx) => record.get(idx).unwrap_or("").to_string(),
            None => DEFAULT_SERIES_ID.to_string(),
        };
        if series_id.is_empty() {
            return Err(DataError::ParseError {
                message: "Empty series id".to_string(),
            });
        }

        let timestamp = parse_timestamp(record.get(columns.timestamp_idx).unwrap_or(""))?;

        let values = columns
            .values
            .iter()
            .map(|(idx, name)| parse_value(record.get(*idx).unwrap_or(""), name))
            .collect::<Result<Vec<_>, _>>()?;

        Ok((series_id, timestamp, values))
    }

    /// Load a dataset from a Parquet file using Arrow record batches.
    ///
    /// Timestamp columns may be any Arrow timestamp or date type; numeric
    /// columns are cast to `Float64` and nulls become `NaN`.
    pub async fn load_parquet_file<P: AsRef<Path>>(
        &self,
        file_path: P,
        mapping: &ColumnMapping,
    ) -> GcResult<Dataset> {
        let path = file_path.as_ref();
        tracing::info!("Loading Parquet data from: {}", path.display());

        if !path.exists() {
            return Err(DataError::SourceNotFound(path.display().to_string()).into());
        }

        let file = fs::File::open(path)?;
        let builder = ParquetRecordBatchReaderBuilder::try_new(file).map_err(|e| {
            DataError::LoadingFailed {
                message: format!(
                    "Failed to create Parquet reader for {}: {}",
                    path.display(),
                    e
                ),
            }
        })?;

        let header_names: Vec<String> = builder
            .schema()
            .fields()
            .iter()
            .map(|f| f.name().clone())
            .collect();
        let header_refs: Vec<&str> = header_names.iter().map(String::as_str).collect();
        let mut resolved = mapping.resolve(&header_refs)?;

        // Without an explicit value list, silently drop columns that are not numeric.
        if mapping.value_columns.is_none() {
            let schema = builder.schema().clone();
            resolved
                .values
                .retain(|(idx, _)| schema.field(*idx).data_type().is_numeric());
        }

        let reader = builder
            .with_batch_size(self.batch_size)
            .build()
            .map_err(|e| DataError::LoadingFailed {
                message: format!("Failed to build Parquet reader: {}", e),
            })?;

        let mut acc =
            DatasetAccumulator::with_columns(resolved.values.iter().map(|(_, n)| n.clone()));

        for batch_result in reader {
            let batch = batch_result.map_err(|e| DataError::LoadingFailed {
                message: format!("Failed to read Parquet batch: {}", e),
            })?;
            Self::append_record_batch(&batch, &resolved, &mut acc)?;
        }

        let dataset = acc.finish()?;
        tracing::info!(
            "Loaded {} rows ({} series) from Parquet file: {}",
            dataset.len(),
            dataset.distinct_series().len(),
            path.display()
        );
        Ok(dataset)
    }

    fn append_record_batch(
        batch: &RecordBatch,
        columns: &ResolvedColumns,
        acc: &mut DatasetAccumulator,
    ) -> GcResult<()> {
        let cast_column = |idx: usize, to: &DataType| -> Result<ArrayRef, DataError> {
            cast(batch.column(idx), to).map_err(|e| DataError::InvalidFormat {
                message: format!("Cannot read column {} as {}: {}", idx, to, e),
            })
        };

        let ts_array = cast_column(
            columns.timestamp_idx,
            &DataType::Timestamp(TimeUnit::Nanosecond, None),
        )?;
        let timestamps = ts_array
            .as_any()
            .downcast_ref::<TimestampNanosecondArray>()
            .ok_or_else(|| DataError::InvalidFormat {
                message: "Invalid timestamp column in Parquet file".to_string(),
            })?;

        let series_array = columns
            .series_idx
            .map(|idx| cast_column(idx, &DataType::Utf8))
            .transpose()?;
        let series = match &series_array {
            Some(array) => Some(array.as_any().downcast_ref::<StringArray>().ok_or_else(
                || DataError::InvalidFormat {
                    message: "Invalid series column in Parquet file".to_string(),
                },
            )?),
            None => None,
        };

        let value_arrays = columns
            .values
            .iter()
            .map(|(idx, _)| cast_column(*idx, &DataType::Float64))
            .collect::<Result<Vec<_>, _>>()?;
        let values = value_arrays
            .iter()
            .map(|array| {
                array
                    .as_any()
                    .downcast_ref::<Float64Array>()
                    .ok_or_else(|| DataError::InvalidFormat {
                        message: "Invalid numeric column in Parquet file".to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        for i in 0..batch.num_rows() {
            if timestamps.is_null(i) || series.map_or(false, |s| s.is_null(i)) {
                tracing::warn!("Skipping Parquet row {} with null timestamp or series id", i);
                continue;
            }

            let nanos = timestamps.value(i);
            let Some(timestamp) = DateTime::from_timestamp(
                nanos.div_euclid(1_000_000_000),
                nanos.rem_euclid(1_000_000_000) as u32,
            ) else {
                tracing::warn!("Skipping Parquet row {} with out-of-range timestamp", i);
                continue;
            };

            let series_id = series
                .map(|s| s.value(i).to_string())
                .unwrap_or_else(|| DEFAULT_SERIES_ID.to_string());

            let row = values
                .iter()
                .map(|column| {
                    if column.is_null(i) {
                        f64::NAN
                    } else {
                        column.value(i)
                    }
                })
                .collect();

            acc.push(series_id, timestamp, row);
        }

        Ok(())
    }
}

impl Default for BatchLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse a timestamp string into `DateTime<Utc>`.
pub fn parse_timestamp(timestamp_str: &str) -> Result<DateTime<Utc>, DataError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(timestamp_str) {
        return Ok(dt.with_timezone(&Utc));
    }

    // Date-only values land at midnight UTC
    if let Ok(naive_date) = chrono::NaiveDate::parse_from_str(timestamp_str, "%Y-%m-%d") {
        if let Some(naive_dt) = naive_date.and_hms_opt(0, 0, 0) {
            return Ok(DateTime::<Utc>::from_naive_utc_and_offset(naive_dt, Utc));
        }
    }

    let formats = [
        "%Y-%m-%d %H:%M:%S", // 2023-01-01 10:30:00
        "%Y/%m/%d %H:%M:%S", // 2023/01/01 10:30:00
        "%m/%d/%Y %H:%M:%S", // 01/01/2023 10:30:00
        "%Y-%m-%dT%H:%M:%S", // 2023-01-01T10:30:00
    ];

    for format in &formats {
        if let Ok(naive_dt) = NaiveDateTime::parse_from_str(timestamp_str, format) {
            return Ok(DateTime::<Utc>::from_naive_utc_and_offset(naive_dt, Utc));
        }
    }

    for format in ["%Y/%m/%d", "%m/%d/%Y"] {
        if let Ok(date) = chrono::NaiveDate::parse_from_str(timestamp_str, format) {
            if let Some(naive_dt) = date.and_hms_opt(0, 0, 0) {
                return Ok(DateTime::<Utc>::from_naive_utc_and_offset(naive_dt, Utc));
            }
        }
    }

    // Unix seconds
    if let Ok(timestamp) = timestamp_str.parse::<i64>() {
        if let Some(dt) = DateTime::from_timestamp(timestamp, 0) {
            return Ok(dt);
        }
    }

    Err(DataError::ParseError {
        message: format!("Could not parse timestamp: {}", timestamp_str),
    })
}

fn parse_value(value_str: &str, field_name: &str) -> Result<f64, DataError> {
    if value_str.is_empty() || value_str.eq_ignore_ascii_case("nan") {
        return Ok(f64::NAN);
    }

    value_str.parse::<f64>().map_err(|e| DataError::ParseError {
        message: format!(
            "Could not parse {} value '{}': {}",
            field_name, value_str, e
        ),
    })
}
