use super::connection::Database;
use super::values::{column_values, quote_ident, sql_type};
use crate::error::{OlistError, Result};
use crate::types::{IfExists, Layer};
use polars::prelude::*;
use rusqlite::params_from_iter;
use std::collections::BTreeMap;

impl Database {
    pub fn table_exists(&self, table: &str) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [table],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Persist `df` as `{layer}_{name}`. Returns the number of rows written.
    pub fn write(&mut self, df: &DataFrame, name: &str, layer: Layer, if_exists: IfExists) -> Result<usize> {
        let table = layer.table_name(name);
        if df.width() == 0 {
            return Err(OlistError::Validation(format!("'{}' has no columns to persist", table)));
        }

        let exists = self.table_exists(&table)?;
        let quoted = quote_ident(&table);

        let columns: Vec<_> = df.get_columns().iter().collect();
        let column_list = columns
            .iter()
            .map(|c| quote_ident(c.name()))
            .collect::<Vec<_>>()
            .join(", ");
        let definitions = columns
            .iter()
            .map(|c| format!("{} {}", quote_ident(c.name()), sql_type(c.dtype())))
            .collect::<Vec<_>>()
            .join(", ");
        let placeholders = vec!["?"; columns.len()].join(", ");

        let values = columns
            .iter()
            .map(|c| column_values(c))
            .collect::<Result<Vec<_>>>()?;

        let tx = self.conn.transaction()?;
        match if_exists {
            IfExists::Fail if exists => return Err(OlistError::TableExists(table)),
            IfExists::Replace => {
                tx.execute(&format!("DROP TABLE IF EXISTS {}", quoted), [])?;
            }
            _ => {}
        }
        tx.execute(&format!("CREATE TABLE IF NOT EXISTS {} ({})", quoted, definitions), [])?;

        {
            let mut insert = tx.prepare(&format!(
                "INSERT INTO {} ({}) VALUES ({})",
                quoted, column_list, placeholders
            ))?;
            for row in 0..df.height() {
                insert.execute(params_from_iter(values.iter().map(|column| &column[row])))?;
            }
        }
        tx.commit()?;

        log::info!(
            "Table '{}' written ({} rows) [layer: {}]",
            table,
            df.height(),
            layer.as_str().to_uppercase()
        );
        Ok(df.height())
    }

    /// Write each table in turn. Not atomic: a failure leaves earlier tables persisted.
    pub fn write_many(
        &mut self,
        tables: &BTreeMap<String, DataFrame>,
        layer: Layer,
        if_exists: IfExists,
    ) -> Result<usize> {
        log::info!(
            "Writing {} tables to layer {}",
            tables.len(),
            layer.as_str().to_uppercase()
        );
        for (name, df) in tables {
            self.write(df, name, layer, if_exists)?;
        }
        log::info!("{} tables written to {}", tables.len(), layer.as_str().to_uppercase());
        Ok(tables.len())
    }

    /// Table names, optionally restricted to one layer prefix.
    pub fn list_tables(&self, layer: Option<Layer>) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(match layer {
            Some(layer) => names
                .into_iter()
                .filter(|name| layer.strip(name).is_some())
                .collect(),
            None => names,
        })
    }

    pub fn read_table(&self, name: &str, layer: Layer) -> Result<DataFrame> {
        let table = layer.table_name(name);
        if !self.table_exists(&table)? {
            return Err(OlistError::TableNotFound(table));
        }
        self.query(&format!("SELECT * FROM {}", quote_ident(&table)))
    }

    /// Column names of a stored table, in declaration order.
    pub fn table_columns(&self, table: &str) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare(&format!("PRAGMA table_info({})", quote_ident(table)))?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(1))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(names)
    }

    pub fn row_count(&self, table: &str) -> Result<usize> {
        if !self.table_exists(table)? {
            return Err(OlistError::TableNotFound(table.to_string()));
        }
        let count: i64 = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {}", quote_ident(table)), [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::df;

    fn customers() -> DataFrame {
        df! {
            "customer_id" => &["c1", "c2"],
            "customer_zip_code_prefix" => &[1001i64, 2002],
        }
        .unwrap()
    }

    #[test]
    fn test_fail_policy_on_existing_table() {
        let mut db = Database::in_memory().unwrap();
        db.write(&customers(), "customers", Layer::Bronze, IfExists::Fail).unwrap();

        let second = db.write(&customers(), "customers", Layer::Bronze, IfExists::Fail);
        assert!(matches!(second, Err(OlistError::TableExists(ref t)) if t == "bronze_customers"));
        assert_eq!(db.row_count("bronze_customers").unwrap(), 2);
    }

    #[test]
    fn test_append_and_replace() {
        let mut db = Database::in_memory().unwrap();
        db.write(&customers(), "customers", Layer::Bronze, IfExists::Replace).unwrap();
        db.write(&customers(), "customers", Layer::Bronze, IfExists::Append).unwrap();
        assert_eq!(db.row_count("bronze_customers").unwrap(), 4);

        let narrower = df! { "only" => &[1i64] }.unwrap();
        db.write(&narrower, "customers", Layer::Bronze, IfExists::Replace).unwrap();
        let back = db.read_table("customers", Layer::Bronze).unwrap();
        assert_eq!(back.shape(), (1, 1));
    }

    #[test]
    fn test_list_tables_by_layer() {
        let mut db = Database::in_memory().unwrap();
        db.write(&customers(), "customers", Layer::Bronze, IfExists::Replace).unwrap();
        db.write(&customers(), "customers", Layer::Silver, IfExists::Replace).unwrap();

        assert_eq!(db.list_tables(None).unwrap().len(), 2);
        assert_eq!(db.list_tables(Some(Layer::Silver)).unwrap(), vec!["silver_customers".to_string()]);
        assert!(db.list_tables(Some(Layer::Gold)).unwrap().is_empty());
    }

    #[test]
    fn test_read_missing_table() {
        let db = Database::in_memory().unwrap();
        assert!(matches!(
            db.read_table("orders", Layer::Silver),
            Err(OlistError::TableNotFound(_))
        ));
    }

    #[test]
    fn test_write_rejects_empty_width() {
        let mut db = Database::in_memory().unwrap();
        let empty = DataFrame::empty();
        assert!(db.write(&empty, "x", Layer::Gold, IfExists::Replace).is_err());
    }
}
