//! Cleaning pipeline.
//!
//! A [`CleaningPipeline`] is a list of [`CleaningStep`] descriptors. Running it
//! against a table clones the input once, applies each step in order and
//! returns the cleaned table together with a [`CleaningLog`] of what changed.
//! The input table is never modified.

use crate::analysis::stats;
use crate::data::convert::{convert_column, TargetType};
use crate::data::frame;
use crate::error::{OlistError, Result};
use crate::types::ColumnKind;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutlierMethod {
    #[default]
    Iqr,
    ZScore,
}

impl fmt::Display for OutlierMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Iqr => f.write_str("iqr"),
            Self::ZScore => f.write_str("zscore"),
        }
    }
}

impl std::str::FromStr for OutlierMethod {
    type Err = OlistError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "iqr" => Ok(Self::Iqr),
            "zscore" | "z-score" => Ok(Self::ZScore),
            other => Err(OlistError::Configuration(format!("Unknown outlier method '{}'", other))),
        }
    }
}

/// Literal used to fill nulls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FillValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl FillValue {
    fn to_series(&self, name: PlSmallStr) -> Series {
        match self {
            Self::Bool(v) => Series::new(name, &[*v]),
            Self::Int(v) => Series::new(name, &[*v]),
            Self::Float(v) => Series::new(name, &[*v]),
            Self::Text(v) => Series::new(name, &[v.as_str()]),
        }
    }

    /// `series` with its nulls replaced. Fails when the value does not fit the column's dtype.
    fn fill(&self, series: &Series) -> Result<Series> {
        let value = self.to_series(series.name().clone()).strict_cast(series.dtype())?;
        let value = value.new_from_index(0, series.len());
        Ok(series.zip_with(&series.is_not_null(), &value)?)
    }
}

fn default_missing_threshold() -> f64 {
    0.5
}

fn default_outlier_threshold() -> f64 {
    3.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum MissingStrategy {
    /// Drop columns above `threshold` null ratio, then rows with any null.
    Drop {
        #[serde(default = "default_missing_threshold")]
        threshold: f64,
    },
    Fill {
        values: BTreeMap<String, FillValue>,
    },
    None,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum CleaningStep {
    RemoveDuplicates {
        #[serde(default)]
        subset: Option<Vec<String>>,
    },
    HandleMissing {
        strategy: MissingStrategy,
    },
    ConvertTypes {
        mapping: BTreeMap<String, TargetType>,
    },
    RemoveOutliers {
        columns: Vec<String>,
        #[serde(default)]
        method: OutlierMethod,
        #[serde(default = "default_outlier_threshold")]
        threshold: f64,
    },
}

impl CleaningStep {
    pub fn name(&self) -> &'static str {
        match self {
            Self::RemoveDuplicates { .. } => "remove_duplicates",
            Self::HandleMissing { .. } => "handle_missing",
            Self::ConvertTypes { .. } => "convert_types",
            Self::RemoveOutliers { .. } => "remove_outliers",
        }
    }

    fn apply(&self, df: DataFrame, log: &mut CleaningLog) -> Result<DataFrame> {
        match self {
            Self::RemoveDuplicates { subset } => remove_duplicates(df, subset.as_deref(), log),
            Self::HandleMissing { strategy } => handle_missing_values(df, strategy, log),
            Self::ConvertTypes { mapping } => Ok(convert_dtypes(df, mapping, log)),
            Self::RemoveOutliers { columns, method, threshold } => {
                remove_outliers(df, columns, *method, *threshold, log)
            }
        }
    }
}

/// Ordered record of what a pipeline run did.
#[derive(Debug, Clone, Serialize)]
pub struct CleaningLog {
    pub name: String,
    pub original_shape: (usize, usize),
    pub current_shape: (usize, usize),
    entries: Vec<String>,
}

impl CleaningLog {
    fn new(name: &str, shape: (usize, usize)) -> Self {
        Self {
            name: name.to_string(),
            original_shape: shape,
            current_shape: shape,
            entries: Vec::new(),
        }
    }

    fn push(&mut self, entry: String) {
        log::debug!("[{}] {}", self.name, entry);
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }
}

impl fmt::Display for CleaningLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(60);
        writeln!(f, "{}", rule)?;
        writeln!(f, "Cleaning summary: {}", self.name)?;
        writeln!(f, "{}", rule)?;
        writeln!(f, "Original shape: {:?}", self.original_shape)?;
        writeln!(f, "Final shape:    {:?}", self.current_shape)?;
        writeln!(f)?;
        writeln!(f, "Operations:")?;
        for (i, entry) in self.entries.iter().enumerate() {
            writeln!(f, "  {}. {}", i + 1, entry)?;
        }
        write!(f, "{}", rule)
    }
}

/// Cleaned table plus its log.
#[derive(Debug, Clone)]
pub struct CleaningOutcome {
    data: DataFrame,
    log: CleaningLog,
}

impl CleaningOutcome {
    pub fn cleaned_data(&self) -> &DataFrame {
        &self.data
    }

    pub fn into_data(self) -> DataFrame {
        self.data
    }

    pub fn log(&self) -> &CleaningLog {
        &self.log
    }

    /// Post-condition check: an empty result fails, losing >90% of rows only warns.
    pub fn validate(&mut self) -> bool {
        if self.data.height() == 0 || self.data.width() == 0 {
            self.log.push("ERROR: table is empty after cleaning".to_string());
            log::warn!("{}: table is empty after cleaning", self.log.name);
            return false;
        }

        let original_rows = self.log.original_shape.0;
        if (self.data.height() as f64) < original_rows as f64 * 0.1 {
            self.log.push(format!(
                "WARNING: >90% of rows removed ({} -> {})",
                original_rows,
                self.data.height()
            ));
            log::warn!(
                "{}: more than 90% of rows removed ({} -> {})",
                self.log.name,
                original_rows,
                self.data.height()
            );
        }

        true
    }

    pub fn summary(&self) -> String {
        self.log.to_string()
    }

    pub fn print_summary(&self) {
        log::info!("\n{}", self.log);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CleaningPipeline {
    pub steps: Vec<CleaningStep>,
}

impl CleaningPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn step(mut self, step: CleaningStep) -> Self {
        self.steps.push(step);
        self
    }

    pub fn remove_duplicates(self, subset: Option<Vec<String>>) -> Self {
        self.step(CleaningStep::RemoveDuplicates { subset })
    }

    pub fn handle_missing_values(self, strategy: MissingStrategy) -> Self {
        self.step(CleaningStep::HandleMissing { strategy })
    }

    pub fn drop_missing(self, threshold: f64) -> Self {
        self.handle_missing_values(MissingStrategy::Drop { threshold })
    }

    pub fn fill_missing(self, values: BTreeMap<String, FillValue>) -> Self {
        self.handle_missing_values(MissingStrategy::Fill { values })
    }

    pub fn convert_dtypes(self, mapping: BTreeMap<String, TargetType>) -> Self {
        self.step(CleaningStep::ConvertTypes { mapping })
    }

    pub fn remove_outliers(self, columns: Vec<String>, method: OutlierMethod, threshold: f64) -> Self {
        self.step(CleaningStep::RemoveOutliers { columns, method, threshold })
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    pub fn run(&self, df: &DataFrame, name: &str) -> Result<CleaningOutcome> {
        let mut log = CleaningLog::new(name, df.shape());
        let mut data = df.clone();

        for step in &self.steps {
            data = step.apply(data, &mut log)?;
            log.current_shape = data.shape();
            log::debug!("[{}] {} -> {:?}", name, step.name(), log.current_shape);
        }

        Ok(CleaningOutcome { data, log })
    }
}

fn remove_duplicates(df: DataFrame, subset: Option<&[String]>, log: &mut CleaningLog) -> Result<DataFrame> {
    let before = df.height();
    let out = frame::distinct_rows(&df, subset)?;
    let removed = before - out.height();

    if removed > 0 {
        let columns = match subset {
            Some(names) => names.join(", "),
            None => "all columns".to_string(),
        };
        log.push(format!("Removed {} duplicate rows (columns: {})", removed, columns));
    }

    Ok(out)
}

fn handle_missing_values(df: DataFrame, strategy: &MissingStrategy, log: &mut CleaningLog) -> Result<DataFrame> {
    match strategy {
        MissingStrategy::None => Ok(df),
        MissingStrategy::Drop { threshold } => {
            let height = df.height();
            let to_drop: Vec<String> = df
                .get_columns()
                .iter()
                .filter(|c| frame::null_ratio(c, height) > *threshold)
                .map(|c| c.name().to_string())
                .collect();

            let mut out = df;
            if !to_drop.is_empty() {
                for name in &to_drop {
                    out = out.drop(name)?;
                }
                log.push(format!(
                    "Dropped {} columns with >{}% missing values ({})",
                    to_drop.len(),
                    threshold * 100.0,
                    to_drop.join(", ")
                ));
            }

            if out.width() == 0 {
                return Ok(out);
            }

            let before = out.height();
            let mask = frame::complete_rows_mask(&out);
            out = out.filter(&mask)?;
            let removed = before - out.height();
            if removed > 0 {
                log.push(format!("Dropped {} rows with missing values", removed));
            }
            Ok(out)
        }
        MissingStrategy::Fill { values } => {
            let mut out = df;
            let mut filled = 0;
            for (name, value) in values {
                if !frame::has_column(&out, name) {
                    continue;
                }
                let series = out.column(name)?.as_materialized_series().clone();
                let nulls = series.null_count();
                if nulls == 0 {
                    continue;
                }
                match value.fill(&series) {
                    Ok(series) => {
                        out.with_column(series)?;
                        filled += nulls;
                    }
                    Err(e) => log.push(format!("Error filling '{}': {}", name, e)),
                }
            }

            if filled > 0 {
                log.push(format!("Filled {} missing values", filled));
            }
            Ok(out)
        }
    }
}

fn convert_dtypes(df: DataFrame, mapping: &BTreeMap<String, TargetType>, log: &mut CleaningLog) -> DataFrame {
    let mut out = df;
    for (name, target) in mapping {
        let converted = match out.column(name) {
            Ok(column) => convert_column(column.as_materialized_series(), *target),
            Err(_) => continue,
        };

        let applied = converted.and_then(|series| {
            out.with_column(series)?;
            Ok(())
        });
        match applied {
            Ok(()) => log.push(format!("Converted '{}' to {}", name, target)),
            Err(e) => log.push(format!("Error converting '{}': {}", name, e)),
        }
    }
    out
}

/// Keep mask for one column. Null cells are kept and excluded from the statistics.
fn outlier_keep_mask(values: &[Option<f64>], method: OutlierMethod, threshold: f64) -> Option<Vec<bool>> {
    let present: Vec<f64> = values.iter().flatten().copied().collect();
    match method {
        OutlierMethod::Iqr => {
            let (lower, upper) = stats::iqr_bounds(&present, threshold)?;
            Some(
                values
                    .iter()
                    .map(|v| v.map_or(true, |x| x >= lower && x <= upper))
                    .collect(),
            )
        }
        OutlierMethod::ZScore => {
            let mean = stats::mean(&present)?;
            let std = stats::std_dev(&present, 0)?;
            if std == 0.0 {
                return None;
            }
            Some(
                values
                    .iter()
                    .map(|v| v.map_or(true, |x| ((x - mean) / std).abs() <= threshold))
                    .collect(),
            )
        }
    }
}

fn remove_outliers(
    df: DataFrame,
    columns: &[String],
    method: OutlierMethod,
    threshold: f64,
    log: &mut CleaningLog,
) -> Result<DataFrame> {
    let before = df.height();
    let mut out = df;

    for name in columns {
        let numeric = frame::has_column(&out, name) && frame::column_kind(&out, name)?.is_numeric();
        if !numeric {
            log::debug!("[{}] outliers: skipping non-numeric or absent column '{}'", log.name, name);
            continue;
        }

        let values = frame::numeric_values(out.column(name)?)?;
        if let Some(keep) = outlier_keep_mask(&values, method, threshold) {
            let mask = BooleanChunked::from_slice("keep".into(), &keep);
            out = out.filter(&mask)?;
        }
    }

    let removed = before - out.height();
    if removed > 0 {
        log.push(format!("Removed {} outliers (method: {})", removed, method));
    }

    Ok(out)
}

/// Apply the ordinary bronze-to-silver cleaning: dedup, then drop sparse columns and incomplete rows.
pub fn default_pipeline(missing_threshold: f64) -> CleaningPipeline {
    CleaningPipeline::new()
        .remove_duplicates(None)
        .drop_missing(missing_threshold)
}

/// Column kinds are preserved by every step except an explicit conversion.
pub fn column_kinds(df: &DataFrame) -> Vec<(String, ColumnKind)> {
    df.get_columns()
        .iter()
        .map(|c| (c.name().to_string(), ColumnKind::of(c.dtype())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::df;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_iqr_removes_price_outlier() {
        let df = df! {
            "order_id" => &["A", "B", "C", "D"],
            "price" => &[10.0, 12.0, 1000.0, 11.0],
        }
        .unwrap();

        let outcome = CleaningPipeline::new()
            .remove_outliers(strings(&["price"]), OutlierMethod::Iqr, 1.5)
            .run(&df, "items")
            .unwrap();

        let ids: Vec<Option<&str>> = outcome.cleaned_data().column("order_id").unwrap().str().unwrap().into_iter().collect();
        assert_eq!(ids, vec![Some("A"), Some("B"), Some("D")]);
        assert_eq!(outcome.log().entries(), &["Removed 1 outliers (method: iqr)".to_string()]);
    }

    #[test]
    fn test_iqr_survivors_inside_bounds() {
        let prices = vec![5.0, 7.0, 8.0, 8.5, 9.0, 9.5, 10.0, 40.0, -30.0, 11.0];
        let df = df! { "price" => &prices }.unwrap();
        let (lower, upper) = stats::iqr_bounds(&prices, 1.5).unwrap();

        let outcome = CleaningPipeline::new()
            .remove_outliers(strings(&["price"]), OutlierMethod::Iqr, 1.5)
            .run(&df, "items")
            .unwrap();

        let kept = frame::present_values(outcome.cleaned_data().column("price").unwrap()).unwrap();
        assert!(kept.iter().all(|x| *x >= lower && *x <= upper));
        let removed: Vec<f64> = prices.iter().copied().filter(|p| !kept.contains(p)).collect();
        assert_eq!(removed, vec![40.0, -30.0]);
        assert!(removed.iter().all(|x| *x < lower || *x > upper));
    }

    #[test]
    fn test_sparse_column_dropped_before_rows() {
        let x: Vec<Option<i64>> = (0..10).map(|i| if i < 6 { None } else { Some(i) }).collect();
        let y: Vec<Option<f64>> = (0..10).map(|i| if i == 9 { None } else { Some(i as f64) }).collect();
        let df = df! {
            "id" => &(0..10).collect::<Vec<i64>>(),
            "x" => &x,
            "y" => &y,
        }
        .unwrap();

        let outcome = CleaningPipeline::new().drop_missing(0.5).run(&df, "t").unwrap();

        let data = outcome.cleaned_data();
        assert!(!frame::has_column(data, "x"));
        assert_eq!(data.height(), 9);
        let entries = outcome.log().entries();
        assert_eq!(entries.len(), 2);
        assert!(entries[0].starts_with("Dropped 1 columns"));
        assert_eq!(entries[1], "Dropped 1 rows with missing values");
    }

    #[test]
    fn test_retained_columns_within_threshold() {
        let df = df! {
            "a" => &[Some(1), None, None, Some(4)],
            "b" => &[Some(1), None, Some(3), Some(4)],
            "c" => &[None, None, None, Some(4)],
        }
        .unwrap();

        let theta = 0.3;
        let outcome = CleaningPipeline::new().drop_missing(theta).run(&df, "t").unwrap();
        for name in frame::column_names(outcome.cleaned_data()) {
            let ratio = frame::null_ratio(df.column(&name).unwrap(), df.height());
            assert!(ratio <= theta);
        }
        assert_eq!(frame::column_names(outcome.cleaned_data()), vec!["b".to_string()]);
    }

    #[test]
    fn test_subset_dedup_keeps_first() {
        let df = df! {
            "zip" => &[96230i64, 96230, 1001],
            "lat" => &[-33.53, -33.53, -23.5],
            "lng" => &[-53.35, -53.35, -46.6],
            "city" => &["chui", "chuí", "sao paulo"],
        }
        .unwrap();

        let outcome = CleaningPipeline::new()
            .remove_duplicates(Some(strings(&["zip", "lat", "lng"])))
            .run(&df, "geolocation")
            .unwrap();

        let data = outcome.cleaned_data();
        assert_eq!(data.height(), 2);
        assert_eq!(data.column("city").unwrap().str().unwrap().get(0), Some("chui"));
        assert_eq!(
            outcome.log().entries()[0],
            "Removed 1 duplicate rows (columns: zip, lat, lng)"
        );
    }

    #[test]
    fn test_remove_duplicates_idempotent() {
        let df = df! {
            "a" => &[1, 1, 2, 2, 3],
            "b" => &["x", "x", "y", "z", "x"],
        }
        .unwrap();

        let once = CleaningPipeline::new().remove_duplicates(None).run(&df, "t").unwrap();
        let twice = CleaningPipeline::new()
            .remove_duplicates(None)
            .remove_duplicates(None)
            .run(&df, "t")
            .unwrap();

        assert!(once.cleaned_data().equals_missing(twice.cleaned_data()));
        assert_eq!(once.cleaned_data().height(), 4);
        assert_eq!(twice.log().entries().len(), 1);
    }

    #[test]
    fn test_conversion_failure_is_logged_and_skipped() {
        let df = df! {
            "qty" => &["1", "two", "3"],
            "when" => &["2018-01-01 10:00:00", "bad", "2018-02-01 10:00:00"],
        }
        .unwrap();

        let mapping = BTreeMap::from([
            ("qty".to_string(), TargetType::Int),
            ("when".to_string(), TargetType::Datetime),
            ("absent".to_string(), TargetType::Float),
        ]);
        let outcome = CleaningPipeline::new().convert_dtypes(mapping).run(&df, "t").unwrap();

        let data = outcome.cleaned_data();
        assert_eq!(data.column("qty").unwrap().dtype(), &DataType::String);
        assert!(matches!(data.column("when").unwrap().dtype(), DataType::Datetime(_, _)));
        assert_eq!(data.column("when").unwrap().null_count(), 1);

        let entries = outcome.log().entries();
        assert_eq!(entries.len(), 2);
        assert!(entries[0].starts_with("Error converting 'qty'"));
        assert_eq!(entries[1], "Converted 'when' to datetime");
    }

    #[test]
    fn test_zscore_keeps_null_rows() {
        let mut values: Vec<Option<f64>> = vec![Some(10.0); 20];
        values.push(Some(500.0));
        values.push(None);
        let df = df! { "v" => &values }.unwrap();

        let outcome = CleaningPipeline::new()
            .remove_outliers(strings(&["v"]), OutlierMethod::ZScore, 3.0)
            .run(&df, "t")
            .unwrap();

        let data = outcome.cleaned_data();
        assert_eq!(data.height(), 21);
        assert_eq!(data.column("v").unwrap().null_count(), 1);
    }

    #[test]
    fn test_outliers_skip_text_and_absent_columns() {
        let df = df! { "name" => &["a", "b"] }.unwrap();
        let outcome = CleaningPipeline::new()
            .remove_outliers(strings(&["name", "missing"]), OutlierMethod::Iqr, 1.5)
            .run(&df, "t")
            .unwrap();
        assert_eq!(outcome.cleaned_data().height(), 2);
        assert!(outcome.log().entries().is_empty());
    }

    #[test]
    fn test_fill_counts_missing_cells() {
        let df = df! {
            "score" => &[Some(1i64), None, None],
            "title" => &[None, Some("ok"), None],
        }
        .unwrap();

        let values = BTreeMap::from([
            ("score".to_string(), FillValue::Int(0)),
            ("title".to_string(), FillValue::Text("none".to_string())),
        ]);
        let outcome = CleaningPipeline::new().fill_missing(values).run(&df, "t").unwrap();

        let data = outcome.cleaned_data();
        assert_eq!(data.column("score").unwrap().null_count(), 0);
        assert_eq!(data.column("score").unwrap().dtype(), &DataType::Int64);
        assert_eq!(data.column("title").unwrap().null_count(), 0);
        assert_eq!(outcome.log().entries(), &["Filled 4 missing values".to_string()]);
    }

    #[test]
    fn test_fill_with_mismatched_value_is_skipped() {
        let df = df! {
            "score" => &[Some(1i64), None, None],
            "comment" => &[None, Some("ok"), Some("fine")],
        }
        .unwrap();

        let values = BTreeMap::from([
            ("comment".to_string(), FillValue::Text("none".to_string())),
            ("score".to_string(), FillValue::Text("unknown".to_string())),
        ]);
        let outcome = CleaningPipeline::new().fill_missing(values).run(&df, "reviews").unwrap();

        let data = outcome.cleaned_data();
        assert_eq!(data.column("score").unwrap().null_count(), 2);
        assert_eq!(data.column("score").unwrap().dtype(), &DataType::Int64);
        assert_eq!(data.column("comment").unwrap().null_count(), 0);

        let entries = outcome.log().entries();
        assert_eq!(entries.len(), 2);
        assert!(entries[0].starts_with("Error filling 'score':"));
        assert_eq!(entries[1], "Filled 1 missing values");
    }

    #[test]
    fn test_geolocation_dedup_keeps_close_coordinates() {
        let df = df! {
            "geolocation_zip_code_prefix" => &[96230i64, 96230, 96230],
            "geolocation_lat" => &[-33.5289478, -33.5289478111, -33.5289478],
            "geolocation_lng" => &[-53.3535214, -53.3535214, -53.3535214],
            "geolocation_city" => &["chui", "chui", "chuí"],
        }
        .unwrap();
        let subset = vec![
            "geolocation_zip_code_prefix".to_string(),
            "geolocation_lat".to_string(),
            "geolocation_lng".to_string(),
        ];

        let outcome = CleaningPipeline::new()
            .remove_duplicates(Some(subset))
            .run(&df, "geolocation")
            .unwrap();

        let data = outcome.cleaned_data();
        assert_eq!(data.height(), 2);
        let cities: Vec<Option<&str>> = data.column("geolocation_city").unwrap().str().unwrap().into_iter().collect();
        assert_eq!(cities, vec![Some("chui"), Some("chui")]);
        assert_eq!(
            outcome.log().entries(),
            &["Removed 1 duplicate rows (columns: geolocation_zip_code_prefix, geolocation_lat, geolocation_lng)".to_string()]
        );
    }

    #[test]
    fn test_validate_empty_and_heavy_loss() {
        let df = df! { "a" => &[Some(1), None] }.unwrap();
        let mut emptied = CleaningPipeline::new().drop_missing(0.5).run(&df.clear(), "t").unwrap();
        assert!(!emptied.validate());
        assert!(emptied.log().entries().last().unwrap().starts_with("ERROR"));

        let many = df! { "v" => &(0..20).map(|i| if i == 0 { Some(i) } else { None }).collect::<Vec<Option<i64>>>() }.unwrap();
        let mut heavy = CleaningPipeline::new().drop_missing(1.0).run(&many, "t").unwrap();
        assert!(heavy.validate());
        assert!(heavy.log().entries().last().unwrap().starts_with("WARNING"));
    }

    #[test]
    fn test_input_is_not_mutated() {
        let df = df! {
            "a" => &[Some(1), Some(1), None],
        }
        .unwrap();
        let snapshot = df.clone();

        let _ = default_pipeline(0.5).run(&df, "t").unwrap();
        assert!(df.equals_missing(&snapshot));
    }

    #[test]
    fn test_pipeline_from_toml() {
        let pipeline = CleaningPipeline::from_toml_str(
            r#"
            [[steps]]
            op = "remove_duplicates"
            subset = ["geolocation_zip_code_prefix"]

            [[steps]]
            op = "handle_missing"
            strategy = { kind = "drop" }

            [[steps]]
            op = "convert_types"
            mapping = { order_purchase_timestamp = "datetime64" }

            [[steps]]
            op = "remove_outliers"
            columns = ["price"]
            "#,
        )
        .unwrap();

        assert_eq!(pipeline.steps.len(), 4);
        assert_eq!(
            pipeline.steps[1],
            CleaningStep::HandleMissing { strategy: MissingStrategy::Drop { threshold: 0.5 } }
        );
        assert_eq!(
            pipeline.steps[3],
            CleaningStep::RemoveOutliers {
                columns: strings(&["price"]),
                method: OutlierMethod::Iqr,
                threshold: 3.0,
            }
        );
    }

    #[test]
    fn test_kinds_preserved_without_conversion() {
        let df = df! {
            "a" => &[Some(1i64), Some(1), Some(300)],
            "b" => &[Some(1.0), Some(1.0), None],
        }
        .unwrap();
        let outcome = CleaningPipeline::new()
            .remove_duplicates(None)
            .fill_missing(BTreeMap::from([("b".to_string(), FillValue::Int(0))]))
            .remove_outliers(strings(&["a"]), OutlierMethod::Iqr, 1.5)
            .run(&df, "t")
            .unwrap();
        assert_eq!(column_kinds(&df), column_kinds(outcome.cleaned_data()));
    }
}
