pub mod analysis;
pub mod config;
pub mod data;
pub mod database;
pub mod error;
pub mod types;
pub mod workflow;

pub use error::{OlistError, Result};
pub use types::{ColumnKind, IfExists, Layer};
