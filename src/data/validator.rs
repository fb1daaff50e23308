use crate::data::frame::{self, display_value};
use crate::data::schema::TableSchema;
use crate::error::Result;
use polars::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;

/// Point-in-time quality snapshot of one table.
#[derive(Debug, Clone, Serialize)]
pub struct QualityReport {
    pub name: String,
    /// (rows, columns)
    pub shape: (usize, usize),
    pub memory_mb: f64,
    /// Null ratio of every column that has at least one null.
    pub missing_values: BTreeMap<String, f64>,
    pub duplicates: usize,
    /// dtype name -> number of columns with that dtype
    pub dtypes: BTreeMap<String, usize>,
    pub issues: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ColumnTypeInfo {
    pub column: String,
    pub dtype: String,
    pub example: Option<String>,
}

pub struct DataValidator<'a> {
    df: &'a DataFrame,
    name: String,
    issues: Vec<String>,
}

impl<'a> DataValidator<'a> {
    pub fn new(df: &'a DataFrame, name: &str) -> Self {
        Self {
            df,
            name: name.to_string(),
            issues: Vec::new(),
        }
    }

    pub fn issues(&self) -> &[String] {
        &self.issues
    }

    /// Null ratios of columns with any nulls; flags columns above `threshold`.
    pub fn check_missing_values(&mut self, threshold: f64) -> BTreeMap<String, f64> {
        let height = self.df.height();
        let mut ratios = BTreeMap::new();
        let mut problematic = 0;

        for column in self.df.get_columns() {
            let ratio = frame::null_ratio(column, height);
            if ratio > threshold {
                problematic += 1;
            }
            if ratio > 0.0 {
                ratios.insert(column.name().to_string(), ratio);
            }
        }

        if problematic > 0 {
            self.issues.push(format!(
                "{} columns with >{}% missing values",
                problematic,
                threshold * 100.0
            ));
        }

        ratios
    }

    pub fn check_duplicates(&mut self, subset: Option<&[String]>) -> Result<usize> {
        let duplicates = frame::duplicate_count(self.df, subset)?;
        if duplicates > 0 {
            self.issues.push(format!("{} duplicate rows detected", duplicates));
        }
        Ok(duplicates)
    }

    pub fn check_data_types(&self) -> Result<Vec<ColumnTypeInfo>> {
        let mut info = Vec::with_capacity(self.df.width());
        for column in self.df.get_columns() {
            let example = if self.df.height() > 0 {
                Some(display_value(&column.as_materialized_series().get(0)?))
            } else {
                None
            };
            info.push(ColumnTypeInfo {
                column: column.name().to_string(),
                dtype: column.dtype().to_string(),
                example,
            });
        }
        Ok(info)
    }

    /// Full quality report; uses `missing_threshold` for the null-ratio flag.
    pub fn generate_report_with(&mut self, missing_threshold: f64) -> Result<QualityReport> {
        let missing_values = self.check_missing_values(missing_threshold);
        let duplicates = self.check_duplicates(None)?;

        let mut dtypes = BTreeMap::new();
        for column in self.df.get_columns() {
            *dtypes.entry(column.dtype().to_string()).or_insert(0) += 1;
        }

        Ok(QualityReport {
            name: self.name.clone(),
            shape: self.df.shape(),
            memory_mb: frame::memory_mb(self.df),
            missing_values,
            duplicates,
            dtypes,
            issues: self.issues.clone(),
        })
    }

    pub fn generate_report(&mut self) -> Result<QualityReport> {
        self.generate_report_with(0.1)
    }

    /// Check the table against a column contract. Violations never escape as errors.
    pub fn validate_with_schema(&mut self, schema: &TableSchema) -> bool {
        match schema.check(self.df) {
            Ok(violations) if violations.is_empty() => true,
            Ok(violations) => {
                self.issues.push(format!("Schema errors: {} violations", violations.len()));
                log::warn!("Validation errors for {}:", self.name);
                for violation in violations.iter().take(20) {
                    log::warn!("  {}", violation);
                }
                if violations.len() > 20 {
                    log::warn!("  ... {} more", violations.len() - 20);
                }
                false
            }
            Err(e) => {
                self.issues.push(format!("Schema errors: check aborted ({})", e));
                log::warn!("Schema check for {} aborted: {}", self.name, e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::schema::get_schema;
    use polars::df;

    fn sample() -> DataFrame {
        df! {
            "order_id" => &["a", "b", "b", "c"],
            "status" => &[Some("delivered"), None, None, Some("shipped")],
            "price" => &[Some(10.0), Some(12.0), Some(12.0), None],
        }
        .unwrap()
    }

    #[test]
    fn test_report_counts() {
        let df = sample();
        let mut validator = DataValidator::new(&df, "orders");
        let report = validator.generate_report().unwrap();

        assert_eq!(report.shape, (4, 3));
        assert_eq!(report.duplicates, 1);
        assert_eq!(report.missing_values.get("status"), Some(&0.5));
        assert_eq!(report.missing_values.get("price"), Some(&0.25));
        assert!(!report.missing_values.contains_key("order_id"));
        assert_eq!(report.dtypes.values().sum::<usize>(), 3);
        assert_eq!(report.issues.len(), 2);
        assert!(report.issues[0].starts_with("2 columns"));
    }

    #[test]
    fn test_report_is_snapshot() {
        let df = sample();
        let mut validator = DataValidator::new(&df, "orders");
        let first = validator.generate_report().unwrap();
        let second = validator.generate_report().unwrap();

        assert_eq!(first.issues.len(), 2);
        assert_eq!(second.issues.len(), 4);
    }

    #[test]
    fn test_empty_table_has_no_ratio() {
        let df = df! { "a" => Vec::<i64>::new() }.unwrap();
        let mut validator = DataValidator::new(&df, "empty");
        assert!(validator.check_missing_values(0.1).is_empty());
        assert!(validator.issues().is_empty());
    }

    #[test]
    fn test_schema_failure_is_reported_not_raised() {
        let df = sample();
        let mut validator = DataValidator::new(&df, "orders");
        let schema = get_schema("olist_orders_dataset").unwrap();

        assert!(!validator.validate_with_schema(&schema));
        assert!(validator.issues()[0].starts_with("Schema errors:"));
    }

    #[test]
    fn test_check_data_types_example() {
        let df = sample();
        let validator = DataValidator::new(&df, "orders");
        let info = validator.check_data_types().unwrap();
        assert_eq!(info[0].example.as_deref(), Some("a"));
        assert_eq!(info[2].column, "price");
    }
}
