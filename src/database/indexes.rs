use super::connection::Database;
use super::values::quote_ident;
use crate::error::Result;
use crate::types::Layer;
use serde::Serialize;

/// Secondary index on one column of a layer table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexSpec {
    pub layer: Layer,
    pub table: String,
    /// Short table label used in the index name, e.g. `items`.
    pub table_short: String,
    pub column: String,
    /// Column label used in the index name; the column itself when absent.
    pub label: Option<String>,
}

impl IndexSpec {
    pub fn new(layer: Layer, table: &str, table_short: &str, column: &str) -> Self {
        Self {
            layer,
            table: table.to_string(),
            table_short: table_short.to_string(),
            column: column.to_string(),
            label: None,
        }
    }

    pub fn labelled(mut self, label: &str) -> Self {
        self.label = Some(label.to_string());
        self
    }

    pub fn name(&self) -> String {
        let label = self.label.as_deref().unwrap_or(&self.column);
        format!("idx_{}_{}_{}", self.layer, self.table_short, label)
    }

    pub fn table_name(&self) -> String {
        self.layer.table_name(&self.table)
    }

    pub fn sql(&self) -> String {
        format!(
            "CREATE INDEX IF NOT EXISTS {} ON {}({})",
            quote_ident(&self.name()),
            quote_ident(&self.table_name()),
            quote_ident(&self.column)
        )
    }
}

/// The twelve join and lookup indexes built after the silver load.
pub fn silver_indexes() -> Vec<IndexSpec> {
    let layer = Layer::Silver;
    let mut specs = vec![
        IndexSpec::new(layer, "olist_orders_dataset", "orders", "order_id"),
        IndexSpec::new(layer, "olist_orders_dataset", "orders", "customer_id"),
        IndexSpec::new(layer, "olist_orders_dataset", "orders", "order_delivered_customer_date")
            .labelled("delivered_date"),
        IndexSpec::new(layer, "olist_orders_dataset", "orders", "order_estimated_delivery_date")
            .labelled("estimated_date"),
    ];
    specs.extend(
        [
            ("olist_order_items_dataset", "items", "order_id"),
            ("olist_order_items_dataset", "items", "product_id"),
            ("olist_order_items_dataset", "items", "seller_id"),
            ("olist_customers_dataset", "customers", "customer_id"),
            ("olist_products_dataset", "products", "product_id"),
            ("olist_sellers_dataset", "sellers", "seller_id"),
            ("olist_order_payments_dataset", "payments", "order_id"),
            ("olist_order_reviews_dataset", "reviews", "order_id"),
        ]
        .into_iter()
        .map(|(table, short, column)| IndexSpec::new(layer, table, short, column)),
    );
    specs
}

impl Database {
    pub fn create_index(&self, spec: &IndexSpec) -> Result<()> {
        self.conn.execute(&spec.sql(), [])?;
        log::debug!("Index {} on {}({})", spec.name(), spec.table_name(), spec.column);
        Ok(())
    }

    /// Create every index whose table and column exist; returns how many were created or already present.
    pub fn create_indexes(&self, specs: &[IndexSpec]) -> Result<usize> {
        let mut created = 0;
        for spec in specs {
            let table = spec.table_name();
            if !self.table_exists(&table)? {
                log::warn!("Skipping index {}: table {} not found", spec.name(), table);
                continue;
            }
            if !self.table_columns(&table)?.contains(&spec.column) {
                log::warn!("Skipping index {}: column {} not in {}", spec.name(), spec.column, table);
                continue;
            }
            self.create_index(spec)?;
            created += 1;
        }
        log::info!("{} indexes created", created);
        Ok(created)
    }

    /// Explicitly created indexes, optionally for one table.
    pub fn list_indexes(&self, table: Option<&str>) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT name, tbl_name FROM sqlite_master \
             WHERE type = 'index' AND name NOT LIKE 'sqlite_autoindex%' ORDER BY name",
        )?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(rows
            .into_iter()
            .filter(|(_, tbl)| table.map_or(true, |t| t == tbl))
            .map(|(name, _)| name)
            .collect())
    }
}
