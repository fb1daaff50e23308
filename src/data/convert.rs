use crate::error::{OlistError, Result};
use chrono::{NaiveDate, NaiveDateTime};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Target of a column conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetType {
    #[serde(alias = "datetime64", alias = "datetime64[ns]", alias = "timestamp")]
    Datetime,
    Date,
    #[serde(alias = "int64", alias = "integer")]
    Int,
    #[serde(alias = "float64")]
    Float,
    #[serde(alias = "str", alias = "object")]
    String,
    #[serde(alias = "boolean")]
    Bool,
    Category,
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Datetime => "datetime",
            Self::Date => "date",
            Self::Int => "int",
            Self::Float => "float",
            Self::String => "string",
            Self::Bool => "bool",
            Self::Category => "category",
        };
        f.write_str(name)
    }
}

impl FromStr for TargetType {
    type Err = OlistError;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.to_lowercase();
        if lower.starts_with("datetime") || lower == "timestamp" {
            return Ok(Self::Datetime);
        }
        match lower.as_str() {
            "date" => Ok(Self::Date),
            "int" | "int64" | "int32" | "integer" => Ok(Self::Int),
            "float" | "float64" | "float32" => Ok(Self::Float),
            "string" | "str" | "object" => Ok(Self::String),
            "bool" | "boolean" => Ok(Self::Bool),
            "category" => Ok(Self::Category),
            other => Err(OlistError::Conversion(format!("Unknown target type '{}'", other))),
        }
    }
}

const DATETIME_FORMATS: [&str; 6] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%d/%m/%Y %H:%M",
];

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%d/%m/%Y", "%Y/%m/%d"];

/// Parse a timestamp in any of the accepted layouts; `None` when none matches.
pub fn parse_datetime_lenient(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Some(dt);
        }
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(text, format) {
            return date.and_hms_opt(0, 0, 0);
        }
    }
    None
}

/// Lenient datetime conversion: unparseable cells become null.
pub fn to_datetime(series: &Series) -> Result<Series> {
    match series.dtype() {
        DataType::Datetime(_, _) => Ok(series.clone()),
        DataType::String => {
            let millis = series
                .str()?
                .into_iter()
                .map(|v| v.and_then(parse_datetime_lenient).map(|dt| dt.and_utc().timestamp_millis()));
            let parsed = Int64Chunked::from_iter_options(series.name().clone(), millis)
                .into_datetime(TimeUnit::Milliseconds, None)
                .into_series();
            Ok(parsed)
        }
        _ => Ok(series.cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?),
    }
}

fn to_date(series: &Series) -> Result<Series> {
    match series.dtype() {
        DataType::Date => Ok(series.clone()),
        DataType::String => {
            let epoch = NaiveDate::from_ymd_opt(1970, 1, 1)
                .ok_or_else(|| OlistError::Conversion("invalid epoch".to_string()))?;
            let days = series.str()?.into_iter().map(|v| {
                v.and_then(parse_datetime_lenient)
                    .map(|dt| (dt.date() - epoch).num_days() as i32)
            });
            Ok(Int32Chunked::from_iter_options(series.name().clone(), days)
                .into_date()
                .into_series())
        }
        _ => Ok(series.cast(&DataType::Date)?),
    }
}

fn to_bool(series: &Series) -> Result<Series> {
    if series.dtype() != &DataType::String {
        return Ok(series.strict_cast(&DataType::Boolean)?);
    }
    let mut values = Vec::with_capacity(series.len());
    for value in series.str()?.into_iter() {
        let parsed = match value.map(|v| v.trim().to_lowercase()) {
            None => None,
            Some(v) => match v.as_str() {
                "true" | "1" | "yes" | "t" => Some(true),
                "false" | "0" | "no" | "f" => Some(false),
                _ => {
                    return Err(OlistError::Conversion(format!(
                        "cannot interpret '{}' as bool",
                        v
                    )))
                }
            },
        };
        values.push(parsed);
    }
    Ok(Series::new(series.name().clone(), values))
}

/// Convert one column. Errors only for strict (non-temporal) conversions.
pub fn convert_column(series: &Series, target: TargetType) -> Result<Series> {
    match target {
        TargetType::Datetime => to_datetime(series),
        TargetType::Date => to_date(series),
        TargetType::Int => Ok(series.strict_cast(&DataType::Int64)?),
        TargetType::Float => Ok(series.strict_cast(&DataType::Float64)?),
        TargetType::String | TargetType::Category => Ok(series.cast(&DataType::String)?),
        TargetType::Bool => to_bool(series),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_layouts() {
        assert!(parse_datetime_lenient("2017-10-02 10:56:33").is_some());
        assert!(parse_datetime_lenient("2017-10-02").is_some());
        assert!(parse_datetime_lenient("02/10/2017 10:56").is_some());
        assert!(parse_datetime_lenient("not a date").is_none());
        assert!(parse_datetime_lenient("").is_none());
    }

    #[test]
    fn test_to_datetime_is_lenient() {
        let s = Series::new("ts".into(), &[Some("2018-01-01 00:00:00"), Some("garbage"), None]);
        let converted = convert_column(&s, TargetType::Datetime).unwrap();

        assert!(matches!(converted.dtype(), DataType::Datetime(_, _)));
        assert_eq!(converted.null_count(), 2);
        assert_eq!(converted.len(), 3);
    }

    #[test]
    fn test_strict_int_conversion_fails() {
        let s = Series::new("qty".into(), &["1", "2.5", "x"]);
        assert!(convert_column(&s, TargetType::Int).is_err());

        let ok = Series::new("qty".into(), &["1", "2"]);
        let converted = convert_column(&ok, TargetType::Int).unwrap();
        assert_eq!(converted.dtype(), &DataType::Int64);
    }

    #[test]
    fn test_target_type_from_str() {
        assert_eq!("datetime64[ns]".parse::<TargetType>().unwrap(), TargetType::Datetime);
        assert_eq!("float64".parse::<TargetType>().unwrap(), TargetType::Float);
        assert!("complex".parse::<TargetType>().is_err());
    }

    #[test]
    fn test_to_bool() {
        let s = Series::new("flag".into(), &[Some("yes"), Some("0"), None]);
        let converted = convert_column(&s, TargetType::Bool).unwrap();
        assert_eq!(converted.dtype(), &DataType::Boolean);

        let bad = Series::new("flag".into(), &["maybe"]);
        assert!(convert_column(&bad, TargetType::Bool).is_err());
    }
}
