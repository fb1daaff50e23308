use crate::analysis::stats;
use crate::data::frame::{self, display_value};
use crate::error::{OlistError, Result};
use crate::types::ColumnKind;
use polars::prelude::*;
use serde::Serialize;

/// Below this many distinct values a text column counts as categorical.
const CATEGORICAL_MAX_DISTINCT: usize = 50;

#[derive(Debug, Clone, Serialize)]
pub struct NumericSummary {
    pub column: String,
    pub count: usize,
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    pub q25: Option<f64>,
    pub median: Option<f64>,
    pub q75: Option<f64>,
    pub max: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ColumnInfo {
    pub column: String,
    pub dtype: String,
    pub non_null: usize,
    pub null: usize,
    pub null_pct: f64,
    pub distinct: usize,
    pub example: Option<String>,
}

/// Role buckets; every column lands in exactly one.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ColumnPatterns {
    pub identifiers: Vec<String>,
    pub datetimes: Vec<String>,
    pub numeric: Vec<String>,
    pub categorical: Vec<String>,
    pub text: Vec<String>,
}

impl ColumnPatterns {
    pub fn total(&self) -> usize {
        self.identifiers.len()
            + self.datetimes.len()
            + self.numeric.len()
            + self.categorical.len()
            + self.text.len()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueFrequency {
    pub value: String,
    pub count: usize,
    pub percentage: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CorrelationMatrix {
    pub columns: Vec<String>,
    /// Row-major; `None` where a column is constant or has < 2 paired values.
    pub values: Vec<Vec<Option<f64>>>,
}

impl CorrelationMatrix {
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.columns.iter().position(|c| c == a)?;
        let j = self.columns.iter().position(|c| c == b)?;
        self.values[i][j]
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PreprocessingSuggestions {
    pub missing_values: Vec<String>,
    pub duplicates: Vec<String>,
    pub type_conversion: Vec<String>,
    pub outliers: Vec<String>,
    pub normalization: Vec<String>,
}

impl PreprocessingSuggestions {
    pub fn is_empty(&self) -> bool {
        self.buckets().iter().all(|(_, items)| items.is_empty())
    }

    pub fn buckets(&self) -> [(&'static str, &[String]); 5] {
        [
            ("missing_values", &self.missing_values),
            ("duplicates", &self.duplicates),
            ("type_conversion", &self.type_conversion),
            ("outliers", &self.outliers),
            ("normalization", &self.normalization),
        ]
    }
}

pub struct DescriptiveAnalysis<'a> {
    df: &'a DataFrame,
    name: String,
}

impl<'a> DescriptiveAnalysis<'a> {
    pub fn new(df: &'a DataFrame, name: &str) -> Self {
        Self {
            df,
            name: name.to_string(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn numeric_columns(&self) -> Vec<&Column> {
        self.df
            .get_columns()
            .iter()
            .filter(|c| ColumnKind::of(c.dtype()).is_numeric())
            .collect()
    }

    pub fn basic_stats(&self) -> Result<Vec<NumericSummary>> {
        let mut summaries = Vec::new();
        for column in self.numeric_columns() {
            let values = stats::sorted(&frame::present_values(column)?);
            summaries.push(NumericSummary {
                column: column.name().to_string(),
                count: values.len(),
                mean: stats::mean(&values),
                std: stats::std_dev(&values, 1),
                min: values.first().copied(),
                q25: stats::quantile_sorted(&values, 0.25),
                median: stats::quantile_sorted(&values, 0.5),
                q75: stats::quantile_sorted(&values, 0.75),
                max: values.last().copied(),
            });
        }
        Ok(summaries)
    }

    pub fn column_info(&self) -> Result<Vec<ColumnInfo>> {
        let height = self.df.height();
        let mut info = Vec::with_capacity(self.df.width());

        for column in self.df.get_columns() {
            let null = column.null_count();
            let null_pct = (frame::null_ratio(column, height) * 10_000.0).round() / 100.0;
            let example = if height > 0 {
                Some(display_value(&column.as_materialized_series().get(0)?))
            } else {
                None
            };

            info.push(ColumnInfo {
                column: column.name().to_string(),
                dtype: column.dtype().to_string(),
                non_null: height - null,
                null,
                null_pct,
                distinct: frame::distinct_count(column)?,
                example,
            });
        }
        Ok(info)
    }

    /// Classify each column by name first, then by dtype, then by cardinality.
    pub fn detect_patterns(&self) -> Result<ColumnPatterns> {
        let mut patterns = ColumnPatterns::default();

        for column in self.df.get_columns() {
            let name = column.name().to_string();
            let lower = name.to_lowercase();

            if lower.contains("id") || lower.ends_with("_key") {
                patterns.identifiers.push(name);
            } else if lower.contains("date") || lower.contains("time") || lower.contains("timestamp") {
                patterns.datetimes.push(name);
            } else if ColumnKind::of(column.dtype()).is_numeric() {
                patterns.numeric.push(name);
            } else if frame::distinct_count(column)? < CATEGORICAL_MAX_DISTINCT {
                patterns.categorical.push(name);
            } else {
                patterns.text.push(name);
            }
        }

        Ok(patterns)
    }

    fn frequencies(&self, column: &str) -> Result<(Vec<(String, usize)>, usize)> {
        if !frame::has_column(self.df, column) {
            return Err(OlistError::ColumnNotFound(column.to_string()));
        }
        let mut counts = frame::value_frequencies(self.df.column(column)?)?;
        let total = counts.iter().map(|(_, n)| n).sum();
        // Stable: equal counts keep encounter order.
        counts.sort_by(|a, b| b.1.cmp(&a.1));
        Ok((counts, total))
    }

    pub fn get_top_values(&self, column: &str, top_n: usize) -> Result<Vec<ValueFrequency>> {
        let (counts, total) = self.frequencies(column)?;
        Ok(counts
            .into_iter()
            .take(top_n)
            .map(|(value, count)| frequency(value, count, total))
            .collect())
    }

    /// Like `get_top_values`, with the remaining values folded into `(other)`.
    pub fn value_distribution(&self, column: &str, max_categories: usize) -> Result<Vec<ValueFrequency>> {
        let (counts, total) = self.frequencies(column)?;
        if counts.len() <= max_categories {
            return Ok(counts
                .into_iter()
                .map(|(value, count)| frequency(value, count, total))
                .collect());
        }

        let keep = max_categories.saturating_sub(1);
        let other: usize = counts[keep..].iter().map(|(_, n)| n).sum();
        let mut distribution: Vec<ValueFrequency> = counts
            .into_iter()
            .take(keep)
            .map(|(value, count)| frequency(value, count, total))
            .collect();
        distribution.push(frequency("(other)".to_string(), other, total));
        Ok(distribution)
    }

    pub fn correlation_matrix(&self) -> Result<CorrelationMatrix> {
        let numeric = self.numeric_columns();
        if numeric.is_empty() {
            return Ok(CorrelationMatrix::default());
        }

        let columns: Vec<String> = numeric.iter().map(|c| c.name().to_string()).collect();
        let values: Vec<Vec<Option<f64>>> = numeric
            .iter()
            .map(|c| frame::numeric_values(c))
            .collect::<Result<_>>()?;

        let n = values.len();
        let mut matrix = vec![vec![None; n]; n];
        for i in 0..n {
            for j in i..n {
                let r = stats::pearson(&values[i], &values[j]);
                matrix[i][j] = r;
                matrix[j][i] = r;
            }
        }

        Ok(CorrelationMatrix { columns, values: matrix })
    }

    pub fn suggest_preprocessing(&self) -> Result<PreprocessingSuggestions> {
        let mut suggestions = PreprocessingSuggestions::default();
        let height = self.df.height();

        for column in self.df.get_columns() {
            let ratio = frame::null_ratio(column, height);
            let pct = ratio * 100.0;
            if ratio > 0.5 {
                suggestions
                    .missing_values
                    .push(format!("'{}': {:.1}% missing, consider dropping the column", column.name(), pct));
            } else if ratio > 0.05 {
                suggestions
                    .missing_values
                    .push(format!("'{}': {:.1}% missing, consider imputation", column.name(), pct));
            }
        }

        let duplicates = frame::duplicate_count(self.df, None)?;
        if duplicates > 0 {
            suggestions
                .duplicates
                .push(format!("{} duplicate rows, consider removing them", duplicates));
        }

        for column in self.df.get_columns() {
            let name = column.name().to_string();
            let lower = name.to_lowercase();

            match ColumnKind::of(column.dtype()) {
                ColumnKind::Text => {
                    if lower.contains("date") || lower.contains("time") {
                        suggestions
                            .type_conversion
                            .push(format!("'{}': convert to datetime", name));
                    } else if lower.contains("price") || lower.contains("amount") || lower.contains("value") {
                        suggestions
                            .type_conversion
                            .push(format!("'{}': convert to numeric", name));
                    }
                }
                ColumnKind::Integer | ColumnKind::Float => {
                    let values = frame::present_values(column)?;
                    if let Some((lower, upper)) = stats::iqr_bounds(&values, 1.5) {
                        let outside = values.iter().filter(|x| **x < lower || **x > upper).count();
                        let ratio = outside as f64 / values.len() as f64;
                        if ratio > 0.05 {
                            suggestions.outliers.push(format!(
                                "'{}': {:.1}% outliers (IQR), review before modelling",
                                name,
                                ratio * 100.0
                            ));
                        }
                    }

                    if let (Some(mean), Some(std)) = (stats::mean(&values), stats::std_dev(&values, 1)) {
                        if std > 2.0 * mean {
                            suggestions.normalization.push(format!(
                                "'{}': high spread (std {:.2} > 2 x mean {:.2}), consider normalization",
                                name, std, mean
                            ));
                        }
                    }
                }
                _ => {}
            }
        }

        log::debug!(
            "{}: {} preprocessing suggestions",
            self.name,
            suggestions.buckets().iter().map(|(_, items)| items.len()).sum::<usize>()
        );
        Ok(suggestions)
    }
}

fn frequency(value: String, count: usize, total: usize) -> ValueFrequency {
    let percentage = if total == 0 {
        0.0
    } else {
        count as f64 / total as f64 * 100.0
    };
    ValueFrequency { value, count, percentage }
}
