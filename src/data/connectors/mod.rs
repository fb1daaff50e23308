mod csv;
mod types;

pub use csv::CsvConnector;
pub use types::{
    ColumnStats,
    DataPreview,
    DatasetSummary,
};
