use super::traits::ConfigSection;
use crate::error::OlistError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub kind: StoreKind,
    pub path: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    /// SQLite file at `path`.
    Sqlite,
    /// Private in-memory SQLite database, gone when the connection closes.
    Memory,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            kind: StoreKind::Sqlite,
            path: PathBuf::from("data/olist.db"),
        }
    }
}

impl DatabaseConfig {
    pub fn in_memory() -> Self {
        Self {
            kind: StoreKind::Memory,
            ..Self::default()
        }
    }

    pub fn sqlite(path: impl Into<PathBuf>) -> Self {
        Self {
            kind: StoreKind::Sqlite,
            path: path.into(),
        }
    }
}

impl ConfigSection for DatabaseConfig {
    fn section_name() -> &'static str {
        "database"
    }

    fn validate(&self) -> Result<(), OlistError> {
        if self.kind == StoreKind::Sqlite && self.path.as_os_str().is_empty() {
            return Err(OlistError::Configuration(
                "Database path must not be empty for a sqlite store".to_string(),
            ));
        }
        Ok(())
    }
}
