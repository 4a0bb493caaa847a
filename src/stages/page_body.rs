use crate::commit::CommitRequest;
use crate::content::PageContent;
use crate::pipeline::{ImportContext, ImportServices, ImportStage};
use crate::repository::ContentId;
use crate::stages::TemplateCache;
use crate::{ImportError, Result};
use async_trait::async_trait;
use std::sync::Arc;

/// Hands the page body to a commit worker
///
/// The page id is registered as importing before the commit is dispatched,
/// so it is never observable as neither importing nor imported.
pub struct PageBodyStage {
    services: ImportServices,
    templates: Arc<TemplateCache>,
}

impl PageBodyStage {
    pub fn new(services: ImportServices, templates: Arc<TemplateCache>) -> Self {
        Self {
            services,
            templates,
        }
    }

    async fn resolve_template(&self, ctx: &ImportContext) -> Result<Option<ContentId>> {
        let site_key = ctx.queue.site_key().to_string();
        if let Some(id) = self.templates.get(&site_key) {
            return Ok(Some(id));
        }

        let found = match ctx.site.site_id {
            Some(site_id) => self
                .services
                .templates
                .find_template_for_site(site_id)
                .await?
                .map(|template| template.id),
            None => None,
        };

        match found.or(ctx.template_id) {
            Some(id) => {
                self.templates.insert(&site_key, id);
                Ok(Some(id))
            }
            None => Ok(None),
        }
    }
}

#[async_trait]
impl ImportStage for PageBodyStage {
    fn name(&self) -> &'static str {
        "page-body"
    }

    fn is_mandatory(&self) -> bool {
        true
    }

    async fn process(&self, content: &mut PageContent, ctx: &mut ImportContext) -> Result<()> {
        let page_id = ctx.cataloged_page_id.ok_or_else(|| {
            ImportError::IllegalState(format!("no cataloged page for {}", content.url()))
        })?;

        let template_id = self.resolve_template(ctx).await?;
        if template_id.is_none() {
            tracing::warn!("No template found for site {}", ctx.site.name);
        }

        if !ctx.queue.add_importing_id(page_id) {
            return Err(ImportError::IllegalState(format!(
                "page {} is already being imported",
                page_id
            )));
        }

        ctx.commits
            .dispatch(CommitRequest {
                page_id,
                body: content.to_body(),
                template_id,
                principal: ctx.principal.clone(),
                queue: Arc::clone(&ctx.queue),
            })
            .await;
        Ok(())
    }

    async fn rollback(&self, _content: &mut PageContent, ctx: &mut ImportContext) -> Result<()> {
        if let Some(page_id) = ctx.cataloged_page_id {
            ctx.queue.remove_importing_id(page_id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{
        PageCatalogService, PageStatus, PageStore, SiteStore, SqliteRepository, TemplateStore,
    };
    use crate::testing;

    #[tokio::test]
    async fn test_commits_body_with_site_template() {
        let repo = Arc::new(SqliteRepository::in_memory().unwrap());
        let site = repo.create_site("docs", "http://example.com/", None).await.unwrap();
        let template = repo.create_template(site.id, "t", "", "").await.unwrap();
        let page = repo
            .add_catalog_page("docs", "about", "About", "/docs", "http://example.com/about")
            .await
            .unwrap()
            .unwrap();

        let services = testing::services(Arc::clone(&repo));
        let cache = Arc::new(TemplateCache::default());
        let stage = PageBodyStage::new(services.clone(), Arc::clone(&cache));
        let mut ctx = testing::context("docs", &services);
        ctx.site.site_id = Some(site.id);
        ctx.cataloged_page_id = Some(page.id);
        let mut content = testing::seed_content();
        content.body_content = "<p>About</p>".to_string();

        stage.process(&mut content, &mut ctx).await.unwrap();

        let stored = repo.get_page(page.id).await.unwrap().unwrap();
        assert_eq!(stored.status, PageStatus::Imported);
        assert_eq!(stored.template_id, Some(template.id));
        assert_eq!(stored.body_content, "<p>About</p>");
        assert!(ctx.queue.is_imported(page.id));
        assert_eq!(cache.get("docs"), Some(template.id));
    }

    #[tokio::test]
    async fn test_rollback_clears_importing_id() {
        let (mut content, mut ctx) = testing::page_and_context("docs");
        let repo = Arc::new(SqliteRepository::in_memory().unwrap());
        let stage = PageBodyStage::new(testing::services(repo), Arc::new(TemplateCache::default()));
        ctx.cataloged_page_id = Some(12);
        ctx.queue.add_importing_id(12);

        stage.rollback(&mut content, &mut ctx).await.unwrap();
        assert!(!ctx.queue.is_importing(12));
    }

    #[tokio::test]
    async fn test_missing_page_id_is_illegal_state() {
        let (mut content, mut ctx) = testing::page_and_context("docs");
        let repo = Arc::new(SqliteRepository::in_memory().unwrap());
        let stage = PageBodyStage::new(testing::services(repo), Arc::new(TemplateCache::default()));

        let result = stage.process(&mut content, &mut ctx).await;
        assert!(matches!(result, Err(ImportError::IllegalState(_))));
    }
}
