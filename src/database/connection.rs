use crate::config::{DatabaseConfig, StoreKind};
use crate::error::Result;
use rusqlite::Connection;

/// Open SQLite handle. Layers share one namespace, told apart by the
/// `bronze_` / `silver_` / `gold_` table prefixes.
///
/// The connection is released when the value is dropped, on error paths too.
pub struct Database {
    pub(crate) conn: Connection,
    location: String,
}

impl Database {
    pub fn open(config: &DatabaseConfig) -> Result<Self> {
        let (conn, location) = match config.kind {
            StoreKind::Sqlite => {
                if let Some(parent) = config.path.parent() {
                    if !parent.as_os_str().is_empty() {
                        std::fs::create_dir_all(parent)?;
                    }
                }
                (Connection::open(&config.path)?, config.path.display().to_string())
            }
            StoreKind::Memory => (Connection::open_in_memory()?, ":memory:".to_string()),
        };

        log::info!("SQLite connection opened: {}", location);
        log::debug!("Layer prefixes: bronze_, silver_, gold_");
        Ok(Self { conn, location })
    }

    pub fn in_memory() -> Result<Self> {
        Self::open(&DatabaseConfig::in_memory())
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl Drop for Database {
    fn drop(&mut self) {
        log::info!("SQLite connection closed: {}", self.location);
    }
}

/// Run `f` against a freshly opened database; the connection closes when `f` returns.
pub fn with_database<T, F>(config: &DatabaseConfig, f: F) -> Result<T>
where
    F: FnOnce(&mut Database) -> Result<T>,
{
    let mut db = Database::open(config)?;
    f(&mut db)
}
