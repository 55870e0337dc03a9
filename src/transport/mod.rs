/// Filesystem discovery and cleanup helpers.
pub mod fs;
/// Lazy parquet table reader.
pub mod table;

pub use fs::TableScan;
pub use table::{ParquetTable, RowFields, TableRows};
