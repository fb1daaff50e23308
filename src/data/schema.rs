//! Declarative column contracts and the checker that evaluates them.
//!
//! A [`TableSchema`] is plain data: it can be built in code (see
//! [`olist_schemas`]) or loaded from TOML. Checking a table never fails on a
//! violation; violations are returned as values.

use crate::data::frame::{self, display_value};
use crate::error::{OlistError, Result};
use crate::types::ColumnKind;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSchema {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub columns: Vec<ColumnContract>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnContract {
    pub name: String,
    pub kind: ColumnKind,
    #[serde(default)]
    pub nullable: bool,
    #[serde(default)]
    pub unique: bool,
    #[serde(default)]
    pub checks: Vec<Check>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Check {
    IsIn { values: Vec<String> },
    InRange { min: f64, max: f64 },
    GreaterThan { value: f64 },
    GreaterOrEqual { value: f64 },
    StrLength { length: usize },
}

impl Check {
    fn describe(&self) -> String {
        match self {
            Self::IsIn { values } => format!("isin({})", values.join(", ")),
            Self::InRange { min, max } => format!("in_range({}, {})", min, max),
            Self::GreaterThan { value } => format!("greater_than({})", value),
            Self::GreaterOrEqual { value } => format!("greater_than_or_equal_to({})", value),
            Self::StrLength { length } => format!("str_length({})", length),
        }
    }

    fn accepts_number(&self, x: f64) -> bool {
        match self {
            Self::InRange { min, max } => x >= *min && x <= *max,
            Self::GreaterThan { value } => x > *value,
            Self::GreaterOrEqual { value } => x >= *value,
            _ => true,
        }
    }
}

/// One failed cell or column-level failure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchemaViolation {
    pub column: String,
    pub check: String,
    pub row: Option<usize>,
    pub value: Option<String>,
}

impl fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.column, self.check)?;
        if let Some(row) = self.row {
            write!(f, " (row {}", row)?;
            if let Some(value) = &self.value {
                write!(f, ", value {:?}", value)?;
            }
            write!(f, ")")?;
        }
        Ok(())
    }
}

impl ColumnContract {
    pub fn new(name: &str, kind: ColumnKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            nullable: false,
            unique: false,
            checks: Vec::new(),
        }
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn check(mut self, check: Check) -> Self {
        self.checks.push(check);
        self
    }

    fn violation(&self, check: impl Into<String>, row: Option<usize>, value: Option<String>) -> SchemaViolation {
        SchemaViolation {
            column: self.name.clone(),
            check: check.into(),
            row,
            value,
        }
    }

    fn evaluate(&self, column: &Column, out: &mut Vec<SchemaViolation>) -> Result<()> {
        let actual = ColumnKind::of(column.dtype());
        if actual != self.kind {
            out.push(self.violation(
                format!("dtype('{}')", self.kind),
                None,
                Some(format!("{:?}", column.dtype())),
            ));
        }

        let series = column.as_materialized_series();

        if !self.nullable && series.null_count() > 0 {
            let not_null = series.is_not_null();
            for (row, present) in not_null.into_iter().enumerate() {
                if present != Some(true) {
                    out.push(self.violation("not_nullable", Some(row), None));
                }
            }
        }

        let rendered: Vec<Option<String>> = (0..series.len())
            .map(|i| {
                series
                    .get(i)
                    .map(|v| (!v.is_null()).then(|| display_value(&v)))
            })
            .collect::<PolarsResult<_>>()?;

        if self.unique {
            let repeated = frame::repeated_values_mask(column)?;
            for (row, flagged) in repeated.into_iter().enumerate() {
                if flagged == Some(true) {
                    out.push(self.violation("field_uniqueness", Some(row), rendered[row].clone()));
                }
            }
        }

        for check in &self.checks {
            match check {
                Check::IsIn { values } => {
                    for (row, value) in rendered.iter().enumerate() {
                        if let Some(v) = value {
                            if !values.contains(v) {
                                out.push(self.violation(check.describe(), Some(row), Some(v.clone())));
                            }
                        }
                    }
                }
                Check::StrLength { length } => {
                    if actual != ColumnKind::Text {
                        out.push(self.violation(check.describe(), None, Some("column is not text".to_string())));
                        continue;
                    }
                    for (row, value) in rendered.iter().enumerate() {
                        if let Some(v) = value {
                            if v.chars().count() != *length {
                                out.push(self.violation(check.describe(), Some(row), Some(v.clone())));
                            }
                        }
                    }
                }
                Check::InRange { .. } | Check::GreaterThan { .. } | Check::GreaterOrEqual { .. } => {
                    if !actual.is_numeric() {
                        out.push(self.violation(check.describe(), None, Some("column is not numeric".to_string())));
                        continue;
                    }
                    for (row, value) in frame::numeric_values(column)?.into_iter().enumerate() {
                        if let Some(x) = value {
                            if !check.accepts_number(x) {
                                out.push(self.violation(check.describe(), Some(row), Some(x.to_string())));
                            }
                        }
                    }
                }
            }
        }

        Ok(())
    }
}

impl TableSchema {
    pub fn new(name: &str, columns: Vec<ColumnContract>) -> Self {
        Self {
            name: name.to_string(),
            description: None,
            columns,
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    /// Every violation of the contract. Extra table columns are allowed.
    pub fn check(&self, df: &DataFrame) -> Result<Vec<SchemaViolation>> {
        let mut violations = Vec::new();
        for contract in &self.columns {
            if !frame::has_column(df, &contract.name) {
                violations.push(contract.violation("column_in_dataframe", None, None));
                continue;
            }
            contract.evaluate(df.column(&contract.name)?, &mut violations)?;
        }
        Ok(violations)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(OlistError::FileNotFound(path.display().to_string()));
        }
        Self::from_toml_str(&std::fs::read_to_string(path)?)
    }
}

const ORDER_STATUSES: [&str; 8] = [
    "delivered", "shipped", "processing", "canceled", "invoiced", "created", "approved", "unavailable",
];
const PAYMENT_TYPES: [&str; 5] = ["credit_card", "boleto", "voucher", "debit_card", "not_defined"];

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

/// Contracts for the eight Olist tables, keyed by dataset file stem.
pub fn olist_schemas() -> BTreeMap<String, TableSchema> {
    use ColumnKind::*;

    let orders = TableSchema::new("orders", vec![
        ColumnContract::new("order_id", Text).unique(),
        ColumnContract::new("customer_id", Text),
        ColumnContract::new("order_status", Text).check(Check::IsIn { values: strings(&ORDER_STATUSES) }),
        ColumnContract::new("order_purchase_timestamp", Timestamp),
        ColumnContract::new("order_approved_at", Timestamp).nullable(),
        ColumnContract::new("order_delivered_carrier_date", Timestamp).nullable(),
        ColumnContract::new("order_delivered_customer_date", Timestamp).nullable(),
        ColumnContract::new("order_estimated_delivery_date", Timestamp).nullable(),
    ])
    .with_description("Olist orders");

    let customers = TableSchema::new("customers", vec![
        ColumnContract::new("customer_id", Text).unique(),
        ColumnContract::new("customer_unique_id", Text),
        ColumnContract::new("customer_zip_code_prefix", Text).check(Check::StrLength { length: 5 }),
        ColumnContract::new("customer_city", Text),
        ColumnContract::new("customer_state", Text).check(Check::StrLength { length: 2 }),
    ]);

    let order_items = TableSchema::new("order_items", vec![
        ColumnContract::new("order_id", Text),
        ColumnContract::new("order_item_id", Integer).check(Check::GreaterOrEqual { value: 1.0 }),
        ColumnContract::new("product_id", Text),
        ColumnContract::new("seller_id", Text),
        ColumnContract::new("shipping_limit_date", Timestamp),
        ColumnContract::new("price", Float).check(Check::GreaterOrEqual { value: 0.0 }),
        ColumnContract::new("freight_value", Float).check(Check::GreaterOrEqual { value: 0.0 }),
    ]);

    let payments = TableSchema::new("payments", vec![
        ColumnContract::new("order_id", Text),
        ColumnContract::new("payment_sequential", Integer).check(Check::GreaterOrEqual { value: 1.0 }),
        ColumnContract::new("payment_type", Text).check(Check::IsIn { values: strings(&PAYMENT_TYPES) }),
        ColumnContract::new("payment_installments", Integer).check(Check::InRange { min: 0.0, max: 24.0 }),
        ColumnContract::new("payment_value", Float).check(Check::GreaterOrEqual { value: 0.0 }),
    ]);

    let reviews = TableSchema::new("reviews", vec![
        ColumnContract::new("review_id", Text).unique(),
        ColumnContract::new("order_id", Text),
        ColumnContract::new("review_score", Integer).check(Check::InRange { min: 1.0, max: 5.0 }),
        ColumnContract::new("review_comment_title", Text).nullable(),
        ColumnContract::new("review_comment_message", Text).nullable(),
        ColumnContract::new("review_creation_date", Timestamp),
        ColumnContract::new("review_answer_timestamp", Timestamp),
    ]);

    let positive = |name: &str| ColumnContract::new(name, Float).nullable().check(Check::GreaterThan { value: 0.0 });
    let products = TableSchema::new("products", vec![
        ColumnContract::new("product_id", Text).unique(),
        ColumnContract::new("product_category_name", Text).nullable(),
        positive("product_name_length"),
        positive("product_description_length"),
        ColumnContract::new("product_photos_qty", Float).nullable().check(Check::GreaterOrEqual { value: 0.0 }),
        positive("product_weight_g"),
        positive("product_length_cm"),
        positive("product_height_cm"),
        positive("product_width_cm"),
    ]);

    let sellers = TableSchema::new("sellers", vec![
        ColumnContract::new("seller_id", Text).unique(),
        ColumnContract::new("seller_zip_code_prefix", Text).check(Check::StrLength { length: 5 }),
        ColumnContract::new("seller_city", Text),
        ColumnContract::new("seller_state", Text).check(Check::StrLength { length: 2 }),
    ]);

    let geolocation = TableSchema::new("geolocation", vec![
        ColumnContract::new("geolocation_zip_code_prefix", Text).check(Check::StrLength { length: 5 }),
        ColumnContract::new("geolocation_lat", Float).check(Check::InRange { min: -90.0, max: 90.0 }),
        ColumnContract::new("geolocation_lng", Float).check(Check::InRange { min: -180.0, max: 180.0 }),
        ColumnContract::new("geolocation_city", Text),
        ColumnContract::new("geolocation_state", Text).check(Check::StrLength { length: 2 }),
    ]);

    BTreeMap::from([
        ("olist_orders_dataset".to_string(), orders),
        ("olist_customers_dataset".to_string(), customers),
        ("olist_order_items_dataset".to_string(), order_items),
        ("olist_order_payments_dataset".to_string(), payments),
        ("olist_order_reviews_dataset".to_string(), reviews),
        ("olist_products_dataset".to_string(), products),
        ("olist_sellers_dataset".to_string(), sellers),
        ("olist_geolocation_dataset".to_string(), geolocation),
    ])
}

/// Built-in contract for a dataset file stem.
pub fn get_schema(dataset_name: &str) -> Result<TableSchema> {
    let mut schemas = olist_schemas();
    schemas.remove(dataset_name).ok_or_else(|| OlistError::SchemaNotFound {
        name: dataset_name.to_string(),
        available: schemas.keys().cloned().collect::<Vec<_>>().join(", "),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::df;

    fn payments_schema() -> TableSchema {
        get_schema("olist_order_payments_dataset").unwrap()
    }

    #[test]
    fn test_unique_contract_compares_typed_values() {
        let schema = TableSchema::new("points", vec![
            ColumnContract::new("lat", ColumnKind::Float).nullable().unique(),
        ]);
        let df = df! {
            "lat" => &[Some(-23.5456212811), Some(-23.5456213999), None, None],
        }
        .unwrap();
        assert!(schema.check(&df).unwrap().is_empty());

        let repeated = df! { "lat" => &[Some(-23.5456212811), None, Some(-23.5456212811)] }.unwrap();
        let violations = schema.check(&repeated).unwrap();
        let rows: Vec<Option<usize>> = violations.iter().map(|v| v.row).collect();
        assert_eq!(rows, vec![Some(0), Some(2)]);
        assert!(violations.iter().all(|v| v.check == "field_uniqueness"));
        assert_eq!(violations[0].value.as_deref(), Some("-23.5456212811"));
    }

    #[test]
    fn test_valid_payments() {
        let df = df! {
            "order_id" => &["o1", "o2"],
            "payment_sequential" => &[1i64, 1],
            "payment_type" => &["boleto", "credit_card"],
            "payment_installments" => &[1i64, 10],
            "payment_value" => &[10.5, 99.0],
        }
        .unwrap();

        assert!(payments_schema().check(&df).unwrap().is_empty());
    }

    #[test]
    fn test_violations_are_counted_per_cell() {
        let df = df! {
            "order_id" => &[Some("o1"), None],
            "payment_sequential" => &[0i64, 1],
            "payment_type" => &["pix", "boleto"],
            "payment_installments" => &[1i64, 30],
            "payment_value" => &[10.5, 99.0],
        }
        .unwrap();

        let violations = payments_schema().check(&df).unwrap();
        // null order_id, sequential < 1, unknown type, installments > 24
        assert_eq!(violations.len(), 4);
        assert!(violations.iter().any(|v| v.check == "not_nullable" && v.row == Some(1)));
        assert!(violations.iter().any(|v| v.value.as_deref() == Some("pix")));
    }

    #[test]
    fn test_missing_column_and_dtype() {
        let df = df! {
            "seller_id" => &["s1", "s1"],
            "seller_zip_code_prefix" => &[13023i64, 4195],
            "seller_city" => &["campinas", "sao paulo"],
        }
        .unwrap();

        let violations = get_schema("olist_sellers_dataset").unwrap().check(&df).unwrap();
        let checks: Vec<&str> = violations.iter().map(|v| v.check.as_str()).collect();
        assert!(checks.contains(&"column_in_dataframe"));
        assert!(checks.contains(&"dtype('text')"));
        assert_eq!(checks.iter().filter(|c| **c == "field_uniqueness").count(), 2);
    }

    #[test]
    fn test_unknown_schema() {
        let err = get_schema("olist_unknown").unwrap_err();
        assert!(matches!(err, OlistError::SchemaNotFound { .. }));
    }

    #[test]
    fn test_schema_from_toml() {
        let schema = TableSchema::from_toml_str(
            r#"
            name = "scores"

            [[columns]]
            name = "score"
            kind = "integer"
            checks = [{ type = "in_range", min = 1.0, max = 5.0 }]

            [[columns]]
            name = "comment"
            kind = "text"
            nullable = true
            "#,
        )
        .unwrap();

        assert_eq!(schema.columns.len(), 2);
        assert_eq!(schema.columns[0].checks, vec![Check::InRange { min: 1.0, max: 5.0 }]);
        assert!(schema.columns[1].nullable);

        let df = df! {
            "score" => &[1i64, 6],
            "comment" => &[None::<&str>, Some("bom")],
        }
        .unwrap();
        assert_eq!(schema.check(&df).unwrap().len(), 1);
    }
}
