use super::traits::ConfigSection;
use crate::data::cleaner::OutlierMethod;
use crate::error::OlistError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CleaningConfig {
    /// Columns with a larger null ratio are dropped by the `drop` strategy.
    pub missing_threshold: f64,
    pub outlier_method: OutlierMethod,
    pub outlier_threshold: f64,
}

impl Default for CleaningConfig {
    fn default() -> Self {
        Self {
            missing_threshold: 0.5,
            outlier_method: OutlierMethod::Iqr,
            outlier_threshold: 3.0,
        }
    }
}

impl ConfigSection for CleaningConfig {
    fn section_name() -> &'static str {
        "cleaning"
    }

    fn validate(&self) -> Result<(), OlistError> {
        if !(0.0..=1.0).contains(&self.missing_threshold) {
            return Err(OlistError::Configuration(
                "Missing-value threshold must be between 0 and 1".to_string(),
            ));
        }
        if self.outlier_threshold <= 0.0 {
            return Err(OlistError::Configuration(
                "Outlier threshold must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Null ratio above which the quality report flags a column.
    pub missing_threshold: f64,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            missing_threshold: 0.1,
        }
    }
}

impl ConfigSection for ValidationConfig {
    fn section_name() -> &'static str {
        "validation"
    }

    fn validate(&self) -> Result<(), OlistError> {
        if !(0.0..=1.0).contains(&self.missing_threshold) {
            return Err(OlistError::Configuration(
                "Validation missing threshold must be between 0 and 1".to_string(),
            ));
        }
        Ok(())
    }
}
