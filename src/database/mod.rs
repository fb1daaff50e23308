pub mod connection;
pub mod exercises;
pub mod indexes;
pub mod query;
pub mod values;
pub mod writer;

pub use connection::{with_database, Database};
pub use exercises::{render_for_layer, Exercise};
pub use indexes::{silver_indexes, IndexSpec};
pub use query::{LayerComparison, PlanStep, TimedQuery};
