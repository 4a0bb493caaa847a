//! URL handling module for Site-Import
//!
//! This module provides URL normalization, anchor stripping, same-site checks
//! and the conversion of remote URLs into repository paths.

mod domain;
mod normalize;
mod path;

// Re-export main functions
pub use domain::{extract_domain, is_same_site};
pub use normalize::{normalize_url, strip_fragment};
pub use path::{
    asset_path, demoted_name, repository_location, site_root, RepositoryLocation, INDEX_PAGE,
};
