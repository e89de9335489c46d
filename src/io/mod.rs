//! I/O utilities for analysis files.
//!
//! This module validates CSV headers and loads conversation records into a
//! [`Dataset`](crate::analytics::dataset::Dataset).

pub mod csv_loader;
pub mod schema;

// Re-export commonly used types and functions
pub use csv_loader::{load_dataset, load_dataset_from_path, LoadError};
pub use schema::{is_processed_file, missing_required_columns, required_columns_message};
