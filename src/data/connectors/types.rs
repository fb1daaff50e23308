use serde::{Deserialize, Serialize};

/// Shape and footprint of one loaded table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetSummary {
    pub name: String,
    pub num_rows: usize,
    pub num_columns: usize,
    pub memory_mb: f64,
}

/// Data preview for tabular display
#[derive(Debug, Clone, Serialize)]
pub struct DataPreview {
    pub summary: DatasetSummary,
    pub columns: Vec<String>,
    pub first_rows: Vec<Vec<String>>,
    pub column_stats: Vec<ColumnStats>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ColumnStats {
    pub name: String,
    pub dtype: String,
    pub null_count: usize,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub mean: Option<f64>,
}
