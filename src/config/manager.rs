use super::{
    cleaning::{CleaningConfig, ValidationConfig},
    dataset::DatasetConfig,
    storage::DatabaseConfig,
    traits::ConfigSection,
};
use crate::error::OlistError;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub dataset: DatasetConfig,
    pub database: DatabaseConfig,
    pub cleaning: CleaningConfig,
    pub validation: ValidationConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), OlistError> {
        self.dataset.validate()?;
        self.database.validate()?;
        self.cleaning.validate()?;
        self.validation.validate()?;
        Ok(())
    }

    /// Load a TOML file layered over the defaults. A missing file yields the defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, OlistError> {
        let path = path.as_ref();
        let settings = config::Config::builder()
            .add_source(
                config::File::from(path)
                    .format(config::FileFormat::Toml)
                    .required(false),
            )
            .build()?;

        let config: AppConfig = settings.try_deserialize()?;
        config.validate()?;

        log::debug!(
            "Loaded configuration from {} (sections: {}, {}, {}, {})",
            path.display(),
            DatasetConfig::section_name(),
            DatabaseConfig::section_name(),
            CleaningConfig::section_name(),
            ValidationConfig::section_name()
        );
        Ok(config)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, OlistError> {
        let config: AppConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), OlistError> {
        let toml_str = toml::to_string_pretty(self)
            .map_err(|e| OlistError::Configuration(format!("Failed to serialize: {}", e)))?;

        std::fs::write(path, toml_str)
            .map_err(|e| OlistError::Configuration(format!("Failed to write config: {}", e)))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreKind;
    use crate::data::cleaner::OutlierMethod;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.cleaning.missing_threshold, 0.5);
        assert_eq!(config.cleaning.outlier_method, OutlierMethod::Iqr);
        assert_eq!(config.validation.missing_threshold, 0.1);
        assert_eq!(config.database.kind, StoreKind::Sqlite);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = AppConfig::from_toml_str(
            r#"
            [cleaning]
            missing_threshold = 0.3
            outlier_method = "zscore"

            [database]
            kind = "memory"
            "#,
        )
        .unwrap();

        assert_eq!(config.cleaning.missing_threshold, 0.3);
        assert_eq!(config.cleaning.outlier_method, OutlierMethod::ZScore);
        assert_eq!(config.cleaning.outlier_threshold, 3.0);
        assert_eq!(config.database.kind, StoreKind::Memory);
    }

    #[test]
    fn test_invalid_threshold_rejected() {
        let result = AppConfig::from_toml_str("[cleaning]\nmissing_threshold = 1.5\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("olist.toml");

        let mut config = AppConfig::default();
        config.cleaning.outlier_threshold = 2.5;
        config.save_to_file(&path).unwrap();

        let loaded = AppConfig::load(&path).unwrap();
        assert_eq!(loaded.cleaning.outlier_threshold, 2.5);
        assert_eq!(loaded.database.path, config.database.path);
    }

    #[test]
    fn test_load_missing_file_gives_defaults() {
        let config = AppConfig::load("does/not/exist.toml").unwrap();
        assert_eq!(config.dataset.name, "olistbr/brazilian-ecommerce");
    }
}
