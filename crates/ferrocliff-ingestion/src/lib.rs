//! ferrocliff-ingestion: turns a delimited file into rows the cliff engine
//! can deduplicate.
//!
//! 1. `table`: CSV with a header row, cells typed dynamically
//! 2. `detect`: structure / activity / id column resolution

pub mod table;
pub mod detect;

pub use detect::{
    detect_activity_column, detect_id_column, detect_structure_column, numeric_columns, resolve_columns,
};
pub use table::{from_reader, read_csv, Table};
