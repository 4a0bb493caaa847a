//! Repository module: the content-management collaborators of an import
//!
//! This module defines the services the pipeline calls to persist what it
//! imports, and a SQLite-backed implementation of all of them:
//! - site, theme and template records
//! - cataloged pages with checkout/checkin workflow gating
//! - folders and binary assets
//! - thumbnails and summary statistics

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteRepository;
pub use traits::{
    AssetStore, PageCatalogService, PageStore, RepositoryError, RepositoryResult, SiteStore,
    TemplateStore, ThemeStore, ThumbnailRenderer,
};

use std::fmt;

/// Identifier of any stored content item
pub type ContentId = i64;

/// A site record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteRecord {
    pub id: ContentId,
    pub name: String,
    pub root_url: String,
    pub theme_id: Option<ContentId>,
    pub created_at: String,
}

/// A theme folder record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThemeRecord {
    pub id: ContentId,
    pub name: String,
    pub folder: String,
    pub created_at: String,
}

/// A page template record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateRecord {
    pub id: ContentId,
    pub site_id: ContentId,
    pub name: String,
    pub head_content: String,
    pub body_content: String,
    pub checked_out: bool,
}

/// Lifecycle of a page record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageStatus {
    /// Stub created from a discovered link, body not committed yet
    Cataloged,
    /// Body committed and promoted
    Imported,
}

impl PageStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Cataloged => "cataloged",
            Self::Imported => "imported",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "cataloged" => Some(Self::Cataloged),
            "imported" => Some(Self::Imported),
            _ => None,
        }
    }
}

impl fmt::Display for PageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_db_string())
    }
}

/// A page record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRecord {
    pub id: ContentId,
    pub site_id: Option<ContentId>,
    pub folder: String,
    pub name: String,
    pub title: Option<String>,
    pub link_text: String,
    pub remote_url: String,
    pub template_id: Option<ContentId>,
    pub description: Option<String>,
    pub head_content: String,
    pub after_body_start: String,
    pub before_body_close: String,
    pub body_content: String,
    pub status: PageStatus,
    pub checked_out: bool,
}

impl PageRecord {
    pub fn path(&self) -> String {
        format!("{}/{}", self.folder, self.name)
    }
}

/// Handle returned when a page is cataloged
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageHandle {
    pub id: ContentId,
    pub path: String,
}

/// A stored binary asset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetRecord {
    pub id: ContentId,
    pub path: String,
    pub remote_url: Option<String>,
    pub content_type: String,
    pub size: u64,
    pub page_id: Option<ContentId>,
}
