//! Conversion between polars columns and SQLite values.

use crate::error::{OlistError, Result};
use crate::types::ColumnKind;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use polars::prelude::*;
use rusqlite::types::{Value, ValueRef};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Declared SQLite type for a column of `dtype`.
pub fn sql_type(dtype: &DataType) -> &'static str {
    match ColumnKind::of(dtype) {
        ColumnKind::Integer | ColumnKind::Boolean => "INTEGER",
        ColumnKind::Float => "REAL",
        ColumnKind::Text | ColumnKind::Timestamp | ColumnKind::Other => "TEXT",
    }
}

pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn timestamp_text(value: i64, unit: TimeUnit) -> Option<String> {
    let dt: Option<DateTime<Utc>> = match unit {
        TimeUnit::Milliseconds => DateTime::from_timestamp_millis(value),
        TimeUnit::Microseconds => DateTime::from_timestamp_micros(value),
        TimeUnit::Nanoseconds => Some(DateTime::from_timestamp_nanos(value)),
    };
    dt.map(|dt| dt.format(TIMESTAMP_FORMAT).to_string())
}

/// SQLite values of one column, top to bottom.
pub fn column_values(column: &Column) -> Result<Vec<Value>> {
    let series = column.as_materialized_series();

    let values = match series.dtype() {
        DataType::Boolean => series
            .bool()?
            .into_iter()
            .map(|v| v.map_or(Value::Null, |b| Value::Integer(b as i64)))
            .collect(),
        DataType::Datetime(unit, _) => {
            let unit = *unit;
            series
                .cast(&DataType::Int64)?
                .i64()?
                .into_iter()
                .map(|v| match v.and_then(|v| timestamp_text(v, unit)) {
                    Some(text) => Value::Text(text),
                    None => Value::Null,
                })
                .collect()
        }
        DataType::Date => {
            let epoch = NaiveDate::from_ymd_opt(1970, 1, 1)
                .ok_or_else(|| OlistError::Conversion("invalid epoch".to_string()))?;
            series
                .cast(&DataType::Int32)?
                .i32()?
                .into_iter()
                .map(|v| match v {
                    Some(days) => Value::Text((epoch + Duration::days(days as i64)).format("%Y-%m-%d").to_string()),
                    None => Value::Null,
                })
                .collect()
        }
        dtype => match ColumnKind::of(dtype) {
            ColumnKind::Integer => series
                .cast(&DataType::Int64)?
                .i64()?
                .into_iter()
                .map(|v| v.map_or(Value::Null, Value::Integer))
                .collect(),
            ColumnKind::Float => series
                .cast(&DataType::Float64)?
                .f64()?
                .into_iter()
                .map(|v| match v {
                    Some(x) if !x.is_nan() => Value::Real(x),
                    _ => Value::Null,
                })
                .collect(),
            _ => series
                .cast(&DataType::String)?
                .str()?
                .into_iter()
                .map(|v| v.map_or(Value::Null, |s| Value::Text(s.to_string())))
                .collect(),
        },
    };

    Ok(values)
}

pub fn owned_value(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Integer(i),
        ValueRef::Real(f) => Value::Real(f),
        ValueRef::Text(t) => Value::Text(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Value::Blob(b.to_vec()),
    }
}

/// Build a column from stored values: all-integer → Int64, numeric → Float64, otherwise String.
pub fn values_to_column(name: &str, values: Vec<Value>) -> Column {
    let all_integer = values
        .iter()
        .all(|v| matches!(v, Value::Null | Value::Integer(_)));
    let all_numeric = values
        .iter()
        .all(|v| matches!(v, Value::Null | Value::Integer(_) | Value::Real(_)));
    let any_present = values.iter().any(|v| !matches!(v, Value::Null));

    let series = if any_present && all_integer {
        let data: Vec<Option<i64>> = values
            .iter()
            .map(|v| match v {
                Value::Integer(i) => Some(*i),
                _ => None,
            })
            .collect();
        Series::new(name.into(), data)
    } else if any_present && all_numeric {
        let data: Vec<Option<f64>> = values
            .iter()
            .map(|v| match v {
                Value::Integer(i) => Some(*i as f64),
                Value::Real(f) => Some(*f),
                _ => None,
            })
            .collect();
        Series::new(name.into(), data)
    } else {
        let data: Vec<Option<String>> = values
            .into_iter()
            .map(|v| match v {
                Value::Null => None,
                Value::Integer(i) => Some(i.to_string()),
                Value::Real(f) => Some(f.to_string()),
                Value::Text(t) => Some(t),
                Value::Blob(b) => Some(String::from_utf8_lossy(&b).into_owned()),
            })
            .collect();
        Series::new(name.into(), data)
    };

    series.into_column()
}
