use super::connection::Database;
use super::exercises::render_for_layer;
use super::values::{owned_value, values_to_column};
use crate::error::Result;
use crate::types::Layer;
use polars::prelude::*;
use serde::Serialize;
use std::time::Instant;

/// One row of `EXPLAIN QUERY PLAN`.
#[derive(Debug, Clone, Serialize)]
pub struct PlanStep {
    pub id: i64,
    pub parent: i64,
    pub detail: String,
}

impl PlanStep {
    pub fn uses_index(&self) -> bool {
        self.detail.contains("USING INDEX") || self.detail.contains("USING COVERING INDEX")
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TimedQuery {
    pub layer: Layer,
    pub sql: String,
    pub rows: usize,
    pub elapsed_ms: f64,
}

/// Same query timed against bronze and silver.
#[derive(Debug, Clone, Serialize)]
pub struct LayerComparison {
    pub bronze: TimedQuery,
    pub silver: TimedQuery,
    /// (bronze - silver) / bronze, in percent.
    pub gain_pct: Option<f64>,
    pub speedup: Option<f64>,
}

impl Database {
    /// Run arbitrary SQL and collect the result set into a frame.
    pub fn query(&self, sql: &str) -> Result<DataFrame> {
        let mut stmt = self.conn.prepare(sql)?;
        let names: Vec<String> = stmt.column_names().iter().map(|n| n.to_string()).collect();
        let mut columns: Vec<Vec<rusqlite::types::Value>> = vec![Vec::new(); names.len()];

        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            for (i, column) in columns.iter_mut().enumerate() {
                column.push(owned_value(row.get_ref(i)?));
            }
        }

        let columns: Vec<Column> = names
            .iter()
            .zip(columns)
            .map(|(name, values)| values_to_column(name, values))
            .collect();
        Ok(DataFrame::new(columns)?)
    }

    pub fn explain_query_plan(&self, sql: &str) -> Result<Vec<PlanStep>> {
        let trimmed = sql.trim_start();
        let statement = if trimmed.to_uppercase().starts_with("EXPLAIN QUERY PLAN") {
            trimmed.to_string()
        } else {
            format!("EXPLAIN QUERY PLAN {}", trimmed)
        };

        let mut stmt = self.conn.prepare(&statement)?;
        let steps = stmt
            .query_map([], |row| {
                Ok(PlanStep {
                    id: row.get(0)?,
                    parent: row.get(1)?,
                    detail: row.get(3)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(steps)
    }

    fn timed(&self, layer: Layer, sql: String) -> Result<TimedQuery> {
        let start = Instant::now();
        let result = self.query(&sql)?;
        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
        log::debug!("{} query: {} rows in {:.3} ms", layer, result.height(), elapsed_ms);
        Ok(TimedQuery {
            layer,
            sql,
            rows: result.height(),
            elapsed_ms,
        })
    }

    /// Time `template` (with `{layer}` placeholders) on bronze, then on silver.
    pub fn compare_layers(&self, template: &str) -> Result<LayerComparison> {
        let bronze = self.timed(Layer::Bronze, render_for_layer(template, Layer::Bronze))?;
        let silver = self.timed(Layer::Silver, render_for_layer(template, Layer::Silver))?;

        let gain_pct = (bronze.elapsed_ms > 0.0)
            .then(|| (bronze.elapsed_ms - silver.elapsed_ms) / bronze.elapsed_ms * 100.0);
        let speedup = (silver.elapsed_ms > 0.0).then(|| bronze.elapsed_ms / silver.elapsed_ms);

        log::info!(
            "Bronze {:.3} ms, Silver {:.3} ms{}",
            bronze.elapsed_ms,
            silver.elapsed_ms,
            gain_pct.map(|g| format!(" (gain {:.1}%)", g)).unwrap_or_default()
        );

        Ok(LayerComparison {
            bronze,
            silver,
            gain_pct,
            speedup,
        })
    }
}
