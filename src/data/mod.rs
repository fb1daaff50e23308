pub mod cleaner;
pub mod connectors;
pub mod convert;
pub mod frame;
pub mod loader;
pub mod schema;
pub mod validator;

pub use cleaner::{CleaningLog, CleaningOutcome, CleaningPipeline, CleaningStep, FillValue, MissingStrategy, OutlierMethod};
pub use connectors::{CsvConnector, DataPreview, DatasetSummary};
pub use convert::TargetType;
pub use loader::{DatasetSource, LocalDirectory, OlistDataLoader};
pub use schema::{Check, ColumnContract, SchemaViolation, TableSchema};
pub use validator::{DataValidator, QualityReport};
