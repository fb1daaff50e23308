//! Small frame-to-frame helpers used before analysis. None of them modify their input.

use crate::data::convert::to_datetime;
use crate::data::frame;
use crate::error::{OlistError, Result};
use crate::types::ColumnKind;
use polars::prelude::*;

/// Lowercase every column name and replace spaces with underscores.
pub fn normalize_column_names(df: &DataFrame) -> Result<DataFrame> {
    let mut out = df.clone();
    let names: Vec<String> = frame::column_names(df)
        .iter()
        .map(|name| name.to_lowercase().replace(' ', "_"))
        .collect();
    out.set_column_names(names.iter().map(|n| n.as_str()))?;
    Ok(out)
}

/// Lenient datetime conversion of the listed columns; absent columns are ignored.
pub fn parse_dates(df: &DataFrame, columns: &[String]) -> Result<DataFrame> {
    let mut out = df.clone();
    for name in columns {
        if !frame::has_column(&out, name) {
            continue;
        }
        let parsed = to_datetime(out.column(name)?.as_materialized_series())?;
        out.with_column(parsed)?;
    }
    Ok(out)
}

/// Add `{prefix}_year`, `_month`, `_day`, `_dayofweek` (Monday = 0) and `_quarter`.
pub fn extract_date_features(df: &DataFrame, column: &str, prefix: Option<&str>) -> Result<DataFrame> {
    if !frame::has_column(df, column) {
        return Err(OlistError::ColumnNotFound(column.to_string()));
    }

    let source = match frame::column_kind(df, column)? {
        ColumnKind::Timestamp => df.clone(),
        ColumnKind::Text => parse_dates(df, &[column.to_string()])?,
        other => {
            return Err(OlistError::Conversion(format!(
                "'{}' is {}, expected a datetime column",
                column, other
            )))
        }
    };

    let prefix = prefix.unwrap_or(column);
    let date = || col(column).dt();
    let out = source
        .lazy()
        .with_columns([
            date().year().alias(format!("{}_year", prefix)),
            date().month().alias(format!("{}_month", prefix)),
            date().day().alias(format!("{}_day", prefix)),
            (date().weekday() - lit(1)).alias(format!("{}_dayofweek", prefix)),
            date().quarter().alias(format!("{}_quarter", prefix)),
        ])
        .collect()?;
    Ok(out)
}
