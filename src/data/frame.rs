//! Column-level helpers shared by the validator, cleaner and analyzer.

use crate::error::{OlistError, Result};
use crate::types::ColumnKind;
use polars::prelude::*;

pub fn column_kind(df: &DataFrame, name: &str) -> Result<ColumnKind> {
    Ok(ColumnKind::of(df.column(name)?.dtype()))
}

pub fn has_column(df: &DataFrame, name: &str) -> bool {
    df.get_column_names().iter().any(|c| c.as_str() == name)
}

pub fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names().iter().map(|c| c.to_string()).collect()
}

/// Fail with `ColumnNotFound` on the first name absent from the table.
pub fn require_columns(df: &DataFrame, names: &[String]) -> Result<()> {
    for name in names {
        if !has_column(df, name) {
            return Err(OlistError::ColumnNotFound(name.clone()));
        }
    }
    Ok(())
}

/// Fraction of null cells; 0 for an empty table.
pub fn null_ratio(column: &Column, height: usize) -> f64 {
    if height == 0 {
        return 0.0;
    }
    column.null_count() as f64 / height as f64
}

/// Numeric view of a column with nulls (and NaN) as `None`.
pub fn numeric_values(column: &Column) -> Result<Vec<Option<f64>>> {
    let cast = column.cast(&DataType::Float64)?;
    let values = cast
        .as_materialized_series()
        .f64()?
        .into_iter()
        .map(|v| v.filter(|x| !x.is_nan()))
        .collect();
    Ok(values)
}

/// Non-null values of a numeric column.
pub fn present_values(column: &Column) -> Result<Vec<f64>> {
    Ok(numeric_values(column)?.into_iter().flatten().collect())
}

/// Human-readable rendering of a cell. Floats keep every significant digit.
pub fn display_value(value: &AnyValue) -> String {
    match value {
        AnyValue::Null => "null".to_string(),
        AnyValue::String(s) => s.to_string(),
        AnyValue::StringOwned(s) => s.to_string(),
        AnyValue::Float64(v) => v.to_string(),
        AnyValue::Float32(v) => v.to_string(),
        other => format!("{}", other),
    }
}

/// First occurrence of each distinct row over `subset` (all columns when `None`), in table order.
pub fn distinct_rows(df: &DataFrame, subset: Option<&[String]>) -> Result<DataFrame> {
    if let Some(names) = subset {
        require_columns(df, names)?;
    }
    if df.width() == 0 || df.height() == 0 || subset.is_some_and(|names| names.is_empty()) {
        return Ok(df.clone());
    }
    Ok(df.unique_stable(subset, UniqueKeepStrategy::First, None)?)
}

/// Non-null values with their counts, in order of first appearance.
pub fn value_frequencies(column: &Column) -> Result<Vec<(String, usize)>> {
    let present = column.drop_nulls();
    if present.len() == 0 {
        return Ok(Vec::new());
    }

    let values = present.as_materialized_series().clone();
    let frame = DataFrame::new(vec![present])?;
    let grouped = frame.group_by_stable([values.name().clone()])?;

    let counts = grouped
        .get_groups()
        .iter()
        .map(|group| {
            let first = values.get(group.first() as usize)?;
            Ok((display_value(&first), group.len()))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(counts)
}

/// Distinct non-null values.
pub fn distinct_count(column: &Column) -> Result<usize> {
    Ok(column.drop_nulls().n_unique()?)
}

/// Rows that repeat an earlier row.
pub fn duplicate_count(df: &DataFrame, subset: Option<&[String]>) -> Result<usize> {
    Ok(df.height() - distinct_rows(df, subset)?.height())
}

/// True for every non-null cell whose value appears more than once.
pub fn repeated_values_mask(column: &Column) -> Result<BooleanChunked> {
    let repeated = DataFrame::new(vec![column.clone()])?.is_duplicated()?;
    let present = column.as_materialized_series().is_not_null();
    Ok(&repeated & &present)
}

/// Rows with no null cell in any column.
pub fn complete_rows_mask(df: &DataFrame) -> BooleanChunked {
    let mut mask = vec![true; df.height()];
    for column in df.get_columns() {
        if column.null_count() == 0 {
            continue;
        }
        let not_null = column.as_materialized_series().is_not_null();
        for (keep, present) in mask.iter_mut().zip(not_null.into_iter()) {
            *keep = *keep && present.unwrap_or(false);
        }
    }
    BooleanChunked::from_slice("complete".into(), &mask)
}

/// Memory footprint in megabytes, rounded to two decimals.
pub fn memory_mb(df: &DataFrame) -> f64 {
    let mb = df.estimated_size() as f64 / (1024.0 * 1024.0);
    (mb * 100.0).round() / 100.0
}
