use crate::commit::CommitDispatcher;
use crate::joblog::ImportLog;
use crate::pipeline::SummaryStats;
use crate::queue::SiteQueue;
use crate::repository::ContentId;
use crate::url::site_root;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use url::Url;

/// Cooperative stop signal shared by everything working on one job
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_canceled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Identity an import acts as
///
/// Commit workers receive their own copy so they log and write as the
/// principal that started the job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportPrincipal {
    pub user: String,
    pub job_id: String,
}

/// The site being built, filled in as structural stages run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteHandle {
    pub name: String,
    pub root_folder: String,
    pub site_id: Option<ContentId>,
    pub theme_id: Option<ContentId>,
}

impl SiteHandle {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            root_folder: site_root(name),
            site_id: None,
            theme_id: None,
        }
    }
}

/// State threaded through every stage of one page's pipeline
///
/// Job-wide parts (queue, stats, log, cancellation, commit dispatcher) are
/// shared handles; the handoff fields belong to the page being processed.
#[derive(Clone)]
pub struct ImportContext {
    pub principal: ImportPrincipal,
    pub site: SiteHandle,
    pub seed_url: Url,
    pub depth: u32,
    pub max_depth: u32,
    pub log: Arc<dyn ImportLog>,
    pub stats: Arc<SummaryStats>,
    pub queue: Arc<SiteQueue>,
    pub commits: Arc<CommitDispatcher>,

    pub template_id: Option<ContentId>,
    pub page_name: Option<String>,
    pub cataloged_page_id: Option<ContentId>,

    cancel: CancellationFlag,
}

impl ImportContext {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        principal: ImportPrincipal,
        site: SiteHandle,
        seed_url: Url,
        max_depth: u32,
        cancel: CancellationFlag,
        log: Arc<dyn ImportLog>,
        queue: Arc<SiteQueue>,
        commits: Arc<CommitDispatcher>,
    ) -> Self {
        Self {
            principal,
            site,
            seed_url,
            depth: 0,
            max_depth,
            log,
            stats: Arc::new(SummaryStats::new()),
            queue,
            commits,
            template_id: None,
            page_name: None,
            cataloged_page_id: None,
            cancel,
        }
    }

    /// Context for a page discovered one level below this one
    pub fn for_page(&self, page_id: ContentId, page_name: &str) -> Self {
        Self {
            depth: self.depth + 1,
            template_id: None,
            page_name: Some(page_name.to_string()),
            cataloged_page_id: Some(page_id),
            ..self.clone()
        }
    }

    pub fn is_canceled(&self) -> bool {
        self.cancel.is_canceled()
    }

    pub fn cancel_flag(&self) -> &CancellationFlag {
        &self.cancel
    }

    /// Site id stamped by the site stage
    pub fn site_id(&self) -> crate::Result<ContentId> {
        self.site.site_id.ok_or_else(|| {
            crate::ImportError::IllegalState("site has not been created yet".to_string())
        })
    }
}
