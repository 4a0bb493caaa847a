//! Output module for import reports
//!
//! This module handles:
//! - Rendering an import summary as a markdown report
//! - Printing a short console summary after an import
//! - Printing the stored per-site statistics for `--stats`

mod markdown;
mod stats;

pub use markdown::{format_import_report, write_import_report};
pub use stats::{print_site_statistics, print_summary};

use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to write output: {0}")]
    Write(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Repository error: {0}")]
    Repository(#[from] crate::RepositoryError),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;
