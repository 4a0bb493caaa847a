//! Collaborator traits and error types
//!
//! Every persistence concern the pipeline touches is a trait here, so stages
//! receive their collaborators by injection and tests can swap them.

use crate::repository::{
    AssetRecord, ContentId, PageHandle, PageRecord, SiteRecord, TemplateRecord, ThemeRecord,
};
use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur during repository operations
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Item {0} is already checked out")]
    CheckedOut(ContentId),

    #[error("Item {0} is not checked out")]
    NotCheckedOut(ContentId),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for repository operations
pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Creates stub page records for discovered links
#[async_trait]
pub trait PageCatalogService: Send + Sync {
    /// Catalogs a page at `folder/page_name`, creating the folder chain
    ///
    /// Returns `None` when an item already occupies that path.
    async fn add_catalog_page(
        &self,
        site_name: &str,
        page_name: &str,
        link_text: &str,
        folder: &str,
        remote_url: &str,
    ) -> RepositoryResult<Option<PageHandle>>;

    /// True when a page (not a folder) sits at `path`
    async fn page_exists_at_path(&self, path: &str) -> RepositoryResult<bool>;

    /// Marks a cataloged page as fully imported
    async fn promote_cataloged_page(&self, id: ContentId) -> RepositoryResult<()>;
}

/// Page persistence with checkout/checkin gating
#[async_trait]
pub trait PageStore: Send + Sync {
    async fn get_page(&self, id: ContentId) -> RepositoryResult<Option<PageRecord>>;

    async fn find_page_by_path(&self, path: &str) -> RepositoryResult<Option<PageRecord>>;

    /// All pages whose path starts with `prefix`, ordered by path
    async fn pages_under(&self, prefix: &str) -> RepositoryResult<Vec<PageRecord>>;

    async fn checkout_page(&self, id: ContentId) -> RepositoryResult<()>;

    /// Saves a checked-out page, including its folder and name
    async fn save_page(&self, page: &PageRecord) -> RepositoryResult<()>;

    async fn checkin_page(&self, id: ContentId) -> RepositoryResult<()>;

    /// Deletes a page; `Ok(false)` when it did not exist
    async fn delete_page(&self, id: ContentId) -> RepositoryResult<bool>;

    /// Creates a folder and its parents; `Ok(false)` when it already existed
    async fn create_folder(&self, path: &str) -> RepositoryResult<bool>;

    async fn folder_exists(&self, path: &str) -> RepositoryResult<bool>;
}

/// Template persistence with checkout/checkin gating
#[async_trait]
pub trait TemplateStore: Send + Sync {
    async fn create_template(
        &self,
        site_id: ContentId,
        name: &str,
        head_content: &str,
        body_content: &str,
    ) -> RepositoryResult<TemplateRecord>;

    async fn get_template(&self, id: ContentId) -> RepositoryResult<Option<TemplateRecord>>;

    async fn find_template_for_site(
        &self,
        site_id: ContentId,
    ) -> RepositoryResult<Option<TemplateRecord>>;

    async fn checkout_template(&self, id: ContentId) -> RepositoryResult<()>;

    async fn save_template(&self, template: &TemplateRecord) -> RepositoryResult<()>;

    async fn checkin_template(&self, id: ContentId) -> RepositoryResult<()>;

    async fn delete_template(&self, id: ContentId) -> RepositoryResult<bool>;
}

/// Theme folder storage
#[async_trait]
pub trait ThemeStore: Send + Sync {
    async fn create_theme(&self, name: &str, folder: &str) -> RepositoryResult<ThemeRecord>;

    async fn find_theme(&self, name: &str) -> RepositoryResult<Option<ThemeRecord>>;

    async fn delete_theme(&self, id: ContentId) -> RepositoryResult<bool>;
}

/// Site records
#[async_trait]
pub trait SiteStore: Send + Sync {
    async fn create_site(
        &self,
        name: &str,
        root_url: &str,
        theme_id: Option<ContentId>,
    ) -> RepositoryResult<SiteRecord>;

    async fn find_site(&self, name: &str) -> RepositoryResult<Option<SiteRecord>>;

    /// Deletes a site and everything stored under it
    async fn delete_site(&self, id: ContentId) -> RepositoryResult<bool>;
}

/// Binary asset storage
#[async_trait]
pub trait AssetStore: Send + Sync {
    /// Stores (or replaces) the asset at `path`
    async fn store_asset(
        &self,
        path: &str,
        remote_url: &str,
        content_type: &str,
        data: &[u8],
    ) -> RepositoryResult<ContentId>;

    async fn find_asset(&self, path: &str) -> RepositoryResult<Option<AssetRecord>>;

    /// Attaches a content asset to a checked-out page
    async fn attach_content(
        &self,
        page_id: ContentId,
        content_type: &str,
        data: &[u8],
    ) -> RepositoryResult<ContentId>;
}

/// Produces preview thumbnails of imported pages
#[async_trait]
pub trait ThumbnailRenderer: Send + Sync {
    async fn render_thumbnail(
        &self,
        site_id: ContentId,
        page_id: ContentId,
    ) -> RepositoryResult<ContentId>;
}
