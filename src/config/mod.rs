pub mod traits;
pub mod dataset;
pub mod storage;
pub mod cleaning;
pub mod manager;

pub use manager::AppConfig;
pub use dataset::DatasetConfig;
pub use storage::{DatabaseConfig, StoreKind};
pub use cleaning::{CleaningConfig, ValidationConfig};
pub use traits::ConfigSection;
