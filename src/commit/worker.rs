use crate::content::PageBody;
use crate::pipeline::{ImportPrincipal, ImportServices};
use crate::queue::SiteQueue;
use crate::repository::{ContentId, RepositoryError};
use crate::Result;
use std::sync::Arc;
use tracing::Instrument;

/// Everything a worker needs to write one page, detached from the pipeline
#[derive(Debug, Clone)]
pub struct CommitRequest {
    pub page_id: ContentId,
    pub body: PageBody,
    pub template_id: Option<ContentId>,
    pub principal: ImportPrincipal,
    pub queue: Arc<SiteQueue>,
}

/// Writes a page body into its cataloged record
pub struct AsyncCommitWorker {
    services: ImportServices,
}

impl AsyncCommitWorker {
    pub fn new(services: ImportServices) -> Self {
        Self { services }
    }

    /// Commits the page and records the result in the site queue
    ///
    /// On success the page id moves from importing to imported; on failure it
    /// is only removed from importing, so it never counts as imported.
    pub async fn run(&self, request: CommitRequest) -> bool {
        let span = tracing::info_span!(
            "commit",
            user = %request.principal.user,
            job_id = %request.principal.job_id,
            page_id = request.page_id,
        );

        async {
            match self.commit(&request).await {
                Ok(()) => {
                    if !request.queue.add_imported_id(request.page_id) {
                        tracing::debug!(
                            "Page {} was no longer importing when its commit finished",
                            request.page_id
                        );
                    }
                    tracing::debug!("Committed page {}", request.page_id);
                    true
                }
                Err(e) => {
                    request.queue.remove_importing_id(request.page_id);
                    tracing::error!("Failed to commit page {}: {}", request.page_id, e);
                    false
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Checkout, write, checkin, promote
    ///
    /// Checkin is attempted even when the write failed so the page is not
    /// left locked; the write error is the one reported.
    pub async fn commit(&self, request: &CommitRequest) -> Result<()> {
        let pages = &self.services.pages;
        let id = request.page_id;

        pages.checkout_page(id).await?;
        let written = self.write(request).await;
        let checked_in = pages.checkin_page(id).await;

        written?;
        checked_in?;

        self.services.catalog.promote_cataloged_page(id).await?;
        Ok(())
    }

    async fn write(&self, request: &CommitRequest) -> Result<()> {
        let id = request.page_id;
        let mut page = self
            .services
            .pages
            .get_page(id)
            .await?
            .ok_or_else(|| RepositoryError::NotFound(format!("page {}", id)))?;

        let body = &request.body;
        page.title = body.title.clone();
        page.description = body.description.clone();
        page.head_content = body.head_content.clone();
        page.after_body_start = body.after_body_start.clone();
        page.before_body_close = body.before_body_close.clone();
        page.body_content = body.body_content.clone();
        if request.template_id.is_some() {
            page.template_id = request.template_id;
        }

        self.services.pages.save_page(&page).await?;
        self.services
            .assets
            .attach_content(id, "text/html", body.to_html().as_bytes())
            .await?;
        Ok(())
    }
}
