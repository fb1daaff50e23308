pub mod descriptive;
pub mod preprocessing;
pub mod stats;

pub use descriptive::{
    ColumnInfo, ColumnPatterns, CorrelationMatrix, DescriptiveAnalysis, NumericSummary,
    PreprocessingSuggestions, ValueFrequency,
};
