//! ferrocliff-common: Shared types, errors, and configuration used across all Ferrocliff crates.

pub mod error;
pub mod config;
pub mod table;

// Re-export commonly used types
pub use config::{AnalysisConfig, CliffConfig, ColumnConfig, DepictionConfig, FingerprintConfig, SortKey};
pub use error::{CliffError, Result};
pub use table::{leading_number, CellValue, ColumnSelection, RawRow};
