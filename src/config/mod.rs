//! Configuration module for Site-Import
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use site_import::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("import.toml")).unwrap();
//! println!("Pages up to {} links below the seed", config.importer.max_depth);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, ImporterConfig, OutputConfig, UserAgentConfig};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::validate;
