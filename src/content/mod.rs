//! Page content and link value types
//!
//! - `PageContent`: one fetched page plus the fields stages derive from it
//! - `Link`: one reference discovered in a page
//! - extraction helpers that read the document with `scraper`

mod extract;
mod link;
mod page_content;

pub use extract::{extract_links, extract_metadata, PageMetadata};
pub use link::{ElementLocator, Link, LinkKind};
pub use page_content::{AttributeRewrite, PageBody, PageContent};
