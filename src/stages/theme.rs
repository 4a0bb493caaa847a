use crate::content::PageContent;
use crate::pipeline::{ImportContext, ImportServices, ImportStage};
use crate::url::site_root;
use crate::{ImportError, Result};
use async_trait::async_trait;

const THEMES_ROOT: &str = "/themes";

/// Creates the theme folder of a new site
pub struct ThemeStage {
    services: ImportServices,
}

impl ThemeStage {
    pub fn new(services: ImportServices) -> Self {
        Self { services }
    }
}

#[async_trait]
impl ImportStage for ThemeStage {
    fn name(&self) -> &'static str {
        "theme"
    }

    fn is_mandatory(&self) -> bool {
        true
    }

    async fn process(&self, _content: &mut PageContent, ctx: &mut ImportContext) -> Result<()> {
        let name = ctx.site.name.clone();
        if self.services.themes.find_theme(&name).await?.is_some() {
            return Err(ImportError::IllegalState(format!(
                "theme {} already exists",
                name
            )));
        }

        let folder = format!("{}{}", THEMES_ROOT, site_root(&name));
        let theme = self.services.themes.create_theme(&name, &folder).await?;
        ctx.site.theme_id = Some(theme.id);
        ctx.log.status(self.name(), &format!("Created theme folder {}", folder));
        Ok(())
    }

    async fn rollback(&self, _content: &mut PageContent, ctx: &mut ImportContext) -> Result<()> {
        let Some(id) = ctx.site.theme_id.take() else {
            return Ok(());
        };
        if !self.services.themes.delete_theme(id).await? {
            tracing::debug!("Theme {} was already gone", id);
        }
        Ok(())
    }
}
