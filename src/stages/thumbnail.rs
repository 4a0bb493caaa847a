use crate::content::PageContent;
use crate::pipeline::{ImportContext, ImportServices, ImportStage};
use crate::{ImportError, Result};
use async_trait::async_trait;
use std::time::Duration;

/// Renders a preview of the landing page once commits have settled
pub struct ThumbnailStage {
    services: ImportServices,
    drain_timeout: Duration,
}

impl ThumbnailStage {
    pub fn new(services: ImportServices, drain_timeout: Duration) -> Self {
        Self {
            services,
            drain_timeout,
        }
    }
}

#[async_trait]
impl ImportStage for ThumbnailStage {
    fn name(&self) -> &'static str {
        "thumbnail"
    }

    fn is_mandatory(&self) -> bool {
        false
    }

    async fn process(&self, _content: &mut PageContent, ctx: &mut ImportContext) -> Result<()> {
        let site_id = ctx.site_id()?;
        let page_id = ctx
            .cataloged_page_id
            .ok_or_else(|| ImportError::IllegalState("no landing page to render".to_string()))?;

        if !ctx.commits.wait_drained(self.drain_timeout).await {
            ctx.log.status(
                self.name(),
                &format!(
                    "{} commits still running after {:?}",
                    ctx.commits.outstanding(),
                    self.drain_timeout
                ),
            );
        }

        if !ctx.queue.is_imported(page_id) {
            tracing::warn!("Rendering thumbnail of page {} before it was imported", page_id);
        }

        let thumbnail = self
            .services
            .thumbnails
            .render_thumbnail(site_id, page_id)
            .await?;
        tracing::debug!("Rendered thumbnail {} for site {}", thumbnail, site_id);
        Ok(())
    }
}
