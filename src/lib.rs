//! Site-Import: turns an externally hosted HTML site into managed content
//!
//! This crate crawls a seed page, classifies its sub-resources, deduplicates
//! visited URLs across the whole site and commits the results as sites,
//! templates, pages and assets through a compensable stage pipeline.

pub mod commit;
pub mod config;
pub mod connectivity;
pub mod content;
pub mod importer;
pub mod joblog;
pub mod output;
pub mod pipeline;
pub mod queue;
pub mod repository;
pub mod stages;
pub mod url;

#[cfg(test)]
pub(crate) mod testing;

use thiserror::Error;

/// Main error type for import operations
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Fetch failed for {url}: {message}")]
    Fetch { url: String, message: String },

    #[error("HTTP {status} for {url}")]
    FetchStatus { url: String, status: u16 },

    #[error("Data service error: {0}")]
    DataService(#[from] RepositoryError),

    #[error("Illegal state: {0}")]
    IllegalState(String),

    #[error("Import canceled")]
    Canceled,

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("URL error: {0}")]
    Url(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ImportError {
    /// Returns true for the cooperative stop signal, which is not a failure
    pub fn is_canceled(&self) -> bool {
        matches!(self, Self::Canceled)
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,
}

pub use repository::RepositoryError;

/// Result type alias for import operations
pub type Result<T> = std::result::Result<T, ImportError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use content::{Link, LinkKind, PageContent};
pub use importer::{CancelHandle, ImportOutcome, ImportRequest, ImportSummary, SiteImporter};
pub use pipeline::{ImportContext, ImportStage, PipelineOutcome, PipelineRunner};
pub use queue::SiteQueue;
