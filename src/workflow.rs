//! End-to-end operations: raw files to bronze, schema validation, bronze to silver.

use crate::config::{AppConfig, CleaningConfig};
use crate::data::cleaner::default_pipeline;
use crate::data::schema::{olist_schemas, TableSchema};
use crate::data::{DataValidator, OlistDataLoader};
use crate::database::{silver_indexes, Database};
use crate::error::Result;
use crate::types::{IfExists, Layer};
use polars::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, Serialize)]
pub struct ValidationSummary {
    pub dataset: String,
    /// `None` when no contract exists for the table.
    pub schema_valid: Option<bool>,
    pub duplicates: usize,
    pub missing_columns: usize,
    pub issues: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProcessSummary {
    pub table: String,
    pub rows_before: usize,
    pub rows_after: usize,
    pub columns_before: usize,
    pub columns_after: usize,
    pub operations: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SilverReport {
    pub tables: Vec<ProcessSummary>,
    pub indexes: usize,
}

pub fn load_tables(config: &AppConfig) -> Result<BTreeMap<String, DataFrame>> {
    let mut loader = OlistDataLoader::from_dir(&config.dataset.raw_dir);
    loader.load_all()?;
    Ok(loader.into_tables())
}

/// Load every CSV file and persist it unchanged in the bronze layer.
pub fn load_to_bronze(config: &AppConfig, db: &mut Database) -> Result<usize> {
    let tables = load_tables(config)?;
    log::info!("{} files loaded in memory", tables.len());
    db.write_many(&tables, Layer::Bronze, IfExists::Replace)
}

/// Built-in contracts, overridden by any `*.toml` contract found in `dir`.
pub fn load_schemas(dir: &Path) -> Result<BTreeMap<String, TableSchema>> {
    let mut schemas = olist_schemas();
    if !dir.is_dir() {
        return Ok(schemas);
    }

    let mut paths: Vec<_> = std::fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<_>>()?;
    paths.sort();

    for path in paths {
        if path.extension().map_or(false, |ext| ext == "toml") {
            let schema = TableSchema::from_toml_file(&path)?;
            log::debug!("Schema '{}' loaded from {}", schema.name, path.display());
            schemas.insert(schema.name.clone(), schema);
        }
    }
    Ok(schemas)
}

pub fn validate_tables(
    tables: &BTreeMap<String, DataFrame>,
    schemas: &BTreeMap<String, TableSchema>,
    missing_threshold: f64,
) -> Result<Vec<ValidationSummary>> {
    let mut results = Vec::with_capacity(tables.len());

    for (name, df) in tables {
        let mut validator = DataValidator::new(df, name);
        let schema_valid = match schemas.get(name) {
            Some(schema) => {
                log::info!(
                    "{}: {} columns expected, {} rows x {} columns found",
                    name,
                    schema.columns.len(),
                    df.height(),
                    df.width()
                );
                let valid = validator.validate_with_schema(schema);
                if valid {
                    log::info!("{}: schema validation passed", name);
                } else {
                    log::warn!("{}: schema validation failed", name);
                }
                Some(valid)
            }
            None => {
                log::warn!("No schema defined for {}, basic validation only", name);
                None
            }
        };

        let report = validator.generate_report_with(missing_threshold)?;
        results.push(ValidationSummary {
            dataset: name.clone(),
            schema_valid,
            duplicates: report.duplicates,
            missing_columns: report.missing_values.len(),
            issues: report.issues.len(),
        });
    }

    let valid = results.iter().filter(|r| r.schema_valid == Some(true)).count();
    log::info!("{}/{} datasets valid against their schemas", valid, results.len());
    Ok(results)
}

/// Clean every bronze table, write the results to silver and build the silver indexes.
pub fn bronze_to_silver(db: &mut Database, cleaning: &CleaningConfig) -> Result<SilverReport> {
    let bronze = db.list_tables(Some(Layer::Bronze))?;
    if bronze.is_empty() {
        log::warn!("No bronze tables found; run the load step first");
        return Ok(SilverReport {
            tables: Vec::new(),
            indexes: 0,
        });
    }
    log::info!("{} bronze tables found", bronze.len());

    let pipeline = default_pipeline(cleaning.missing_threshold);
    let mut cleaned = BTreeMap::new();
    let mut summaries = Vec::with_capacity(bronze.len());

    for full_name in &bronze {
        let Some(name) = Layer::Bronze.strip(full_name) else {
            continue;
        };
        let df = db.read_table(name, Layer::Bronze)?;
        log::info!("{}: {} rows read from bronze", name, df.height());

        let report = DataValidator::new(&df, name).generate_report()?;
        log::info!(
            "{}: {} columns with missing values, {} duplicates",
            name,
            report.missing_values.len(),
            report.duplicates
        );

        let mut outcome = pipeline.run(&df, name)?;
        if !outcome.validate() {
            log::warn!("{}: cleaning left no data", name);
        }
        outcome.print_summary();

        let steps = outcome.log();
        summaries.push(ProcessSummary {
            table: name.to_string(),
            rows_before: steps.original_shape.0,
            rows_after: steps.current_shape.0,
            columns_before: steps.original_shape.1,
            columns_after: steps.current_shape.1,
            operations: steps.entries().to_vec(),
        });
        cleaned.insert(name.to_string(), outcome.into_data());
    }

    // A table cleaned down to zero columns cannot be stored.
    cleaned.retain(|name, df: &mut DataFrame| {
        if df.width() == 0 {
            log::warn!("{}: no columns left, not written to silver", name);
        }
        df.width() > 0
    });

    db.write_many(&cleaned, Layer::Silver, IfExists::Replace)?;
    let indexes = db.create_indexes(&silver_indexes())?;

    Ok(SilverReport {
        tables: summaries,
        indexes,
    })
}
