use crate::connectivity::{Connectivity, Downloader};
use crate::pipeline::SummaryAccumulator;
use crate::repository::{
    AssetStore, PageCatalogService, PageStore, SiteStore, SqliteRepository, TemplateStore,
    ThemeStore, ThumbnailRenderer,
};
use std::sync::Arc;

/// Every external collaborator an import talks to
///
/// Stages and commit workers receive this bundle at construction; nothing
/// is looked up by name at runtime.
#[derive(Clone)]
pub struct ImportServices {
    pub connectivity: Arc<dyn Connectivity>,
    pub downloader: Arc<dyn Downloader>,
    pub catalog: Arc<dyn PageCatalogService>,
    pub pages: Arc<dyn PageStore>,
    pub templates: Arc<dyn TemplateStore>,
    pub themes: Arc<dyn ThemeStore>,
    pub sites: Arc<dyn SiteStore>,
    pub assets: Arc<dyn AssetStore>,
    pub thumbnails: Arc<dyn ThumbnailRenderer>,
    pub summaries: Arc<dyn SummaryAccumulator>,
}

impl ImportServices {
    /// Wires every repository concern to one SQLite repository
    pub fn from_repository(
        repository: Arc<SqliteRepository>,
        connectivity: Arc<dyn Connectivity>,
        downloader: Arc<dyn Downloader>,
    ) -> Self {
        Self {
            connectivity,
            downloader,
            catalog: repository.clone(),
            pages: repository.clone(),
            templates: repository.clone(),
            themes: repository.clone(),
            sites: repository.clone(),
            assets: repository.clone(),
            thumbnails: repository.clone(),
            summaries: repository,
        }
    }
}
