use crate::analysis::stats;
use crate::data::frame::{self, display_value};
use crate::error::{OlistError, Result};
use crate::types::ColumnKind;
use polars::prelude::*;
use std::path::Path;
use super::types::{ColumnStats, DataPreview, DatasetSummary};

pub struct CsvConnector;

impl CsvConnector {
    /// Load CSV file into DataFrame
    pub fn load<P: AsRef<Path>>(path: P) -> Result<DataFrame> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(OlistError::FileNotFound(path.display().to_string()));
        }

        // Infer over the whole file: Olist columns hold late-appearing blanks and decimals.
        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(None)
            .try_into_reader_with_file_path(Some(path.to_path_buf()))?
            .finish()
            .map_err(|e| OlistError::DataLoading(format!("Failed to read CSV {}: {}", path.display(), e)))?;

        Ok(df)
    }

    pub fn summarize(name: &str, df: &DataFrame) -> DatasetSummary {
        DatasetSummary {
            name: name.to_string(),
            num_rows: df.height(),
            num_columns: df.width(),
            memory_mb: frame::memory_mb(df),
        }
    }

    /// Create a preview of the first `num_rows` rows plus per-column stats
    pub fn create_preview(name: &str, df: &DataFrame, num_rows: usize) -> Result<DataPreview> {
        let summary = Self::summarize(name, df);
        let columns = frame::column_names(df);

        let num_preview_rows = num_rows.min(df.height());
        let mut first_rows = Vec::with_capacity(num_preview_rows);
        for i in 0..num_preview_rows {
            let mut row = Vec::with_capacity(df.width());
            for column in df.get_columns() {
                let value = column.as_materialized_series().get(i)?;
                let rendered = match value {
                    AnyValue::Float64(v) => format!("{:.4}", v),
                    AnyValue::Float32(v) => format!("{:.4}", v),
                    other => display_value(&other),
                };
                row.push(rendered);
            }
            first_rows.push(row);
        }

        let mut column_stats = Vec::with_capacity(df.width());
        for column in df.get_columns() {
            let (min, max, mean) = if ColumnKind::of(column.dtype()).is_numeric() {
                let values = frame::present_values(column)?;
                (
                    values.iter().copied().reduce(f64::min),
                    values.iter().copied().reduce(f64::max),
                    stats::mean(&values),
                )
            } else {
                (None, None, None)
            };

            column_stats.push(ColumnStats {
                name: column.name().to_string(),
                dtype: format!("{:?}", column.dtype()),
                null_count: column.null_count(),
                min,
                max,
                mean,
            });
        }

        Ok(DataPreview {
            summary,
            columns,
            first_rows,
            column_stats,
        })
    }
}
