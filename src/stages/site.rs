use crate::content::PageContent;
use crate::pipeline::{ImportContext, ImportServices, ImportStage};
use crate::{ImportError, Result};
use async_trait::async_trait;

/// Creates the site record and its root folder
pub struct SiteStage {
    services: ImportServices,
}

impl SiteStage {
    pub fn new(services: ImportServices) -> Self {
        Self { services }
    }
}

#[async_trait]
impl ImportStage for SiteStage {
    fn name(&self) -> &'static str {
        "site"
    }

    fn is_mandatory(&self) -> bool {
        true
    }

    async fn process(&self, _content: &mut PageContent, ctx: &mut ImportContext) -> Result<()> {
        let sites = &self.services.sites;
        if sites.find_site(&ctx.site.name).await?.is_some() {
            return Err(ImportError::IllegalState(format!(
                "a site named {} already exists",
                ctx.site.name
            )));
        }

        let site = sites
            .create_site(&ctx.site.name, ctx.seed_url.as_str(), ctx.site.theme_id)
            .await?;
        ctx.site.site_id = Some(site.id);

        self.services.pages.create_folder(&ctx.site.root_folder).await?;
        ctx.log.status(
            self.name(),
            &format!("Created site {} at {}", site.name, ctx.site.root_folder),
        );
        Ok(())
    }

    async fn rollback(&self, _content: &mut PageContent, ctx: &mut ImportContext) -> Result<()> {
        if let Some(id) = ctx.site.site_id.take() {
            self.services.sites.delete_site(id).await?;
        }
        Ok(())
    }
}
