use super::traits::ConfigSection;
use crate::error::OlistError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    /// Identifier of the dataset on the remote hub, informational only.
    pub name: String,
    pub data_dir: PathBuf,
    /// Directory holding the downloaded CSV files.
    pub raw_dir: PathBuf,
    pub processed_dir: PathBuf,
    pub schemas_dir: PathBuf,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        let data_dir = PathBuf::from("data");
        Self {
            name: "olistbr/brazilian-ecommerce".to_string(),
            raw_dir: data_dir.join("raw"),
            processed_dir: data_dir.join("processed"),
            schemas_dir: data_dir.join("schemas"),
            data_dir,
        }
    }
}

impl DatasetConfig {
    pub fn ensure_directories(&self) -> Result<(), OlistError> {
        for dir in [&self.raw_dir, &self.processed_dir, &self.schemas_dir] {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }
}

impl ConfigSection for DatasetConfig {
    fn section_name() -> &'static str {
        "dataset"
    }

    fn validate(&self) -> Result<(), OlistError> {
        if self.raw_dir.as_os_str().is_empty() {
            return Err(OlistError::Configuration(
                "Raw data directory must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
