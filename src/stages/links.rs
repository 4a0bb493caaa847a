//! Link extraction: the crawl itself
//!
//! For every reference on a page this stage decides, exactly once per
//! absolute URL and job, where the target lives in the repository:
//! - pages are fetched, cataloged and imported through a child pipeline
//! - images, stylesheets, scripts and binary links are queued for one
//!   batched download
//! - references already decided elsewhere are rewritten to the known path

use crate::connectivity::FetchOptions;
use crate::content::{extract_links, Link, LinkKind, PageContent};
use crate::pipeline::{
    ImportContext, ImportServices, ImportStage, PipelineOutcome, PipelineRunner,
    SummaryAccumulator, SummaryStats,
};
use crate::queue::LinkClaim;
use crate::repository::{PageRecord, RepositoryError};
use crate::stages::{MetadataStage, PageBodyStage, TemplateCache};
use crate::url::{asset_path, demoted_name, is_same_site, RepositoryLocation};
use crate::{ImportError, Result};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Fetch behavior of the crawl
#[derive(Debug, Clone)]
pub struct LinkSettings {
    pub user_agent: String,
    pub follow_redirects: bool,
    pub ignore_content_type: bool,
    /// How long a page demotion waits for the blocking page's own commit
    pub commit_timeout: Duration,
}

impl LinkSettings {
    pub fn fetch_options(&self) -> FetchOptions {
        FetchOptions {
            ignore_content_type: self.ignore_content_type,
            follow_redirects: self.follow_redirects,
            user_agent: self.user_agent.clone(),
        }
    }
}

/// Per-invocation counters, pushed to the job stats once the page is done
#[derive(Debug, Default)]
struct LinkCounts {
    pages: u64,
    internal_links: u64,
    files: u64,
    stylesheets: u64,
}

impl LinkCounts {
    fn increments(&self) -> HashMap<String, u64> {
        [
            (SummaryStats::PAGES, self.pages),
            (SummaryStats::INTERNAL_LINKS, self.internal_links),
            (SummaryStats::FILES, self.files),
            (SummaryStats::STYLESHEETS, self.stylesheets),
        ]
        .into_iter()
        .filter(|(_, count)| *count > 0)
        .map(|(category, count)| (category.to_string(), count))
        .collect()
    }
}

/// Assets collected while walking a page's links
#[derive(Debug, Default)]
struct DownloadBatch {
    items: BTreeMap<String, String>,
}

impl DownloadBatch {
    fn add(&mut self, remote_url: &str, target: &str) {
        self.items
            .entry(remote_url.to_string())
            .or_insert_with(|| target.to_string());
    }
}

/// Discovers, deduplicates and imports everything a page references
#[derive(Clone)]
pub struct LinkExtractionStage {
    services: ImportServices,
    settings: LinkSettings,
    templates: Arc<TemplateCache>,
}

impl LinkExtractionStage {
    pub fn new(services: ImportServices, settings: LinkSettings, templates: Arc<TemplateCache>) -> Self {
        Self {
            services,
            settings,
            templates,
        }
    }

    /// Stages run against each discovered page
    ///
    /// Pages at the depth limit are still imported but their links are not
    /// followed.
    fn child_pipeline(&self, follow_links: bool) -> PipelineRunner {
        let mut stages: Vec<Arc<dyn ImportStage>> = Vec::with_capacity(3);
        if follow_links {
            stages.push(Arc::new(self.clone()));
        }
        stages.push(Arc::new(MetadataStage));
        stages.push(Arc::new(PageBodyStage::new(
            self.services.clone(),
            Arc::clone(&self.templates),
        )));
        PipelineRunner::new(stages)
    }

    async fn process_link(
        &self,
        link: Link,
        content: &mut PageContent,
        ctx: &mut ImportContext,
        batch: &mut DownloadBatch,
        counts: &mut LinkCounts,
    ) -> Result<()> {
        let target = Url::parse(&link.absolute_link)?;
        if !is_same_site(&ctx.seed_url, &target) {
            return Ok(());
        }

        if link.kind == LinkKind::Page {
            counts.internal_links += 1;
        }

        if let LinkClaim::AlreadyProcessed(known) =
            ctx.queue.claim_link(&link.absolute_link, link.clone())
        {
            // An unresolved decision is a link that failed; it has no local path
            if known.resolved {
                content.rewrite(&link.element, known.relative_path_with_file_name);
            }
            return Ok(());
        }

        match link.kind {
            LinkKind::Image | LinkKind::Asset => {
                self.queue_asset(link, content, ctx, batch);
                Ok(())
            }
            LinkKind::Page => {
                if ctx.is_canceled() {
                    return Err(ImportError::Canceled);
                }

                let response = self
                    .services
                    .connectivity
                    .fetch(&link.absolute_link, &self.settings.fetch_options())
                    .await?;

                match response.document {
                    Some(document) => {
                        let base = Url::parse(&response.final_url).unwrap_or(target);
                        self.import_page(link, base, document, content, ctx, counts)
                            .await
                    }
                    None if response.is_binary => {
                        let mut link = link;
                        let path = asset_path(&target, &ctx.site.name);
                        if let Some((folder, name)) = path.rsplit_once('/') {
                            link.resolve_to(folder, name, None);
                        }
                        self.queue_asset(link, content, ctx, batch);
                        Ok(())
                    }
                    None => {
                        ctx.log.status(
                            self.name(),
                            &format!(
                                "{} answered {} without a document",
                                link.absolute_link, response.status
                            ),
                        );
                        Ok(())
                    }
                }
            }
        }
    }

    fn queue_asset(
        &self,
        mut link: Link,
        content: &mut PageContent,
        ctx: &ImportContext,
        batch: &mut DownloadBatch,
    ) {
        batch.add(&link.absolute_link, &link.relative_path_with_file_name);
        content.rewrite(&link.element, link.relative_path_with_file_name.clone());
        link.mark_resolved();
        ctx.queue.update_processed_link(&link.absolute_link.clone(), link);
    }

    /// Catalogs a fetched page and runs the child pipeline over it
    async fn import_page(
        &self,
        mut link: Link,
        base: Url,
        document: String,
        content: &mut PageContent,
        ctx: &mut ImportContext,
        counts: &mut LinkCounts,
    ) -> Result<()> {
        let location = self.place_page(&link, ctx).await?;

        let handle = self
            .services
            .catalog
            .add_catalog_page(
                &ctx.site.name,
                &location.name,
                &link.link_text,
                &location.folder,
                &link.absolute_link,
            )
            .await?
            .ok_or_else(|| {
                ImportError::IllegalState(format!("{} is already occupied", location.path()))
            })?;

        link.resolve_to(&location.folder, &location.name, None);
        ctx.queue
            .update_processed_link(&link.absolute_link.clone(), link.clone());
        content.rewrite(&link.element, handle.path.clone());
        counts.pages += 1;
        ctx.log
            .status(self.name(), &format!("Cataloged {} as {}", link.absolute_link, handle.path));

        let follow_links = ctx.depth + 1 < ctx.max_depth;
        let mut child_content = PageContent::new(base, document);
        let mut child_ctx = ctx.for_page(handle.id, &location.name);

        let report = self
            .child_pipeline(follow_links)
            .run(&mut child_content, &mut child_ctx)
            .await;

        match report.outcome {
            PipelineOutcome::Completed => Ok(()),
            PipelineOutcome::Canceled => Err(ImportError::Canceled),
            PipelineOutcome::Failed { stage, cause } => {
                ctx.log.error(
                    self.name(),
                    &format!("Import of {} failed in {}: {}", handle.path, stage, cause),
                );
                Ok(())
            }
        }
    }

    /// Decides where a new page goes, demoting a page that blocks it
    ///
    /// - an index page whose folder is currently a page: that page is moved
    ///   into the folder as `index-<name>`
    /// - a page whose path is already a folder: it goes into that folder as
    ///   `index-<name>`
    async fn place_page(&self, link: &Link, ctx: &ImportContext) -> Result<RepositoryLocation> {
        let location = RepositoryLocation::new(link.link_path.clone(), link.page_name.clone());
        let pages = &self.services.pages;

        if location.is_index() {
            if let Some(existing) = pages.find_page_by_path(&location.folder).await? {
                let existing = self.settled_page(existing, ctx).await?;
                self.demote(existing, &location.folder, ctx).await?;
            }
            return Ok(location);
        }

        if pages.folder_exists(&location.path()).await? {
            let folder = location.path();
            return Ok(RepositoryLocation::new(folder, demoted_name(&location.name)));
        }

        Ok(location)
    }

    /// Returns the page as stored once no commit holds it
    ///
    /// A page cataloged earlier in this job may still be checked out by its
    /// commit worker; the record is re-read after the commit so the body it
    /// wrote is carried along.
    async fn settled_page(&self, page: PageRecord, ctx: &ImportContext) -> Result<PageRecord> {
        if !ctx.queue.is_importing(page.id) {
            return Ok(page);
        }

        tracing::debug!("Waiting for the commit of {} before moving it", page.path());
        if !ctx
            .queue
            .wait_until_settled(page.id, self.settings.commit_timeout)
            .await
        {
            return Err(ImportError::IllegalState(format!(
                "commit of {} still running after {:?}",
                page.path(),
                self.settings.commit_timeout
            )));
        }

        self.services
            .pages
            .get_page(page.id)
            .await?
            .ok_or_else(|| RepositoryError::NotFound(format!("page {}", page.id)).into())
    }

    async fn demote(&self, existing: PageRecord, folder: &str, ctx: &ImportContext) -> Result<()> {
        let pages = &self.services.pages;
        let old_path = existing.path();

        let mut moved = existing.clone();
        moved.folder = folder.to_string();
        moved.name = demoted_name(&existing.name);

        pages.checkout_page(existing.id).await?;
        let saved = async {
            pages.create_folder(folder).await?;
            pages.save_page(&moved).await
        }
        .await;
        let checked_in = pages.checkin_page(existing.id).await;
        saved?;
        checked_in?;

        ctx.log.status(
            self.name(),
            &format!("Moved {} to {} to make room for an index page", old_path, moved.path()),
        );
        Ok(())
    }

    async fn download(&self, batch: DownloadBatch, ctx: &ImportContext, counts: &mut LinkCounts) {
        if batch.items.is_empty() {
            return;
        }

        let outcomes = self.services.downloader.download_batch(&batch.items, true).await;
        for outcome in outcomes {
            if !outcome.succeeded {
                ctx.log
                    .error(self.name(), &format!("Failed to download {}", outcome.remote_url));
                ctx.stats.increment(SummaryStats::ERRORS, 1);
                continue;
            }
            if is_stylesheet(&outcome.target, outcome.content_type.as_deref()) {
                counts.stylesheets += 1;
            } else {
                counts.files += 1;
            }
        }
    }
}

fn is_stylesheet(target: &str, content_type: Option<&str>) -> bool {
    content_type.is_some_and(|ct| ct.starts_with("text/css"))
        || target.to_ascii_lowercase().ends_with(".css")
}

#[async_trait]
impl ImportStage for LinkExtractionStage {
    fn name(&self) -> &'static str {
        "links"
    }

    fn is_mandatory(&self) -> bool {
        false
    }

    async fn process(&self, content: &mut PageContent, ctx: &mut ImportContext) -> Result<()> {
        let links = extract_links(content, &ctx.site.name);
        tracing::debug!("Found {} links on {}", links.len(), content.url());

        let mut batch = DownloadBatch::default();
        let mut counts = LinkCounts::default();

        for link in links {
            let url = link.absolute_link.clone();
            match self
                .process_link(link, content, ctx, &mut batch, &mut counts)
                .await
            {
                Ok(()) => {}
                Err(ImportError::Canceled) => {
                    ctx.stats.update(ctx.queue.site_key(), &counts.increments())?;
                    return Err(ImportError::Canceled);
                }
                Err(e) => {
                    tracing::warn!("Skipping link {}: {}", url, e);
                    ctx.log.error(self.name(), &format!("{}: {}", url, e));
                    ctx.stats.increment(SummaryStats::ERRORS, 1);
                }
            }
        }

        self.download(batch, ctx, &mut counts).await;
        ctx.stats.update(ctx.queue.site_key(), &counts.increments())?;
        Ok(())
    }
}
