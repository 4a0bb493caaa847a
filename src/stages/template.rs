use crate::content::{extract_metadata, ElementLocator, Link, LinkKind, PageContent};
use crate::pipeline::{ImportContext, ImportServices, ImportStage};
use crate::repository::ContentId;
use crate::url::{normalize_url, strip_fragment, INDEX_PAGE};
use crate::{ImportError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

const TEMPLATE_CACHE_CAPACITY: usize = 5;

/// Bounded site-to-template lookup cache
///
/// Holds at most five sites. Inserting into a full cache clears it first.
#[derive(Debug)]
pub struct TemplateCache {
    capacity: usize,
    entries: Mutex<HashMap<String, ContentId>>,
}

impl Default for TemplateCache {
    fn default() -> Self {
        Self::with_capacity(TEMPLATE_CACHE_CAPACITY)
    }
}

impl TemplateCache {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn get(&self, site_key: &str) -> Option<ContentId> {
        self.entries
            .lock()
            .ok()
            .and_then(|entries| entries.get(site_key).copied())
    }

    pub fn insert(&self, site_key: &str, template_id: ContentId) {
        let Ok(mut entries) = self.entries.lock() else {
            return;
        };
        if entries.len() >= self.capacity && !entries.contains_key(site_key) {
            entries.clear();
        }
        entries.insert(site_key.to_string(), template_id);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Creates the site template and catalogs the landing page
///
/// The template takes the seed page's head and body. The landing page is
/// cataloged at `<site root>/index.html` and the seed URL is registered as
/// already processed so pages linking back to it are rewritten, not fetched.
pub struct TemplateStage {
    services: ImportServices,
}

impl TemplateStage {
    pub fn new(services: ImportServices) -> Self {
        Self { services }
    }
}

#[async_trait]
impl ImportStage for TemplateStage {
    fn name(&self) -> &'static str {
        "template"
    }

    fn is_mandatory(&self) -> bool {
        true
    }

    async fn process(&self, content: &mut PageContent, ctx: &mut ImportContext) -> Result<()> {
        let site_id = ctx.site_id()?;
        let (head, body, title) = seed_fragments(content);

        let template = self
            .services
            .templates
            .create_template(site_id, &format!("{} template", ctx.site.name), &head, &body)
            .await?;
        ctx.template_id = Some(template.id);

        let link_text = title.unwrap_or_else(|| ctx.site.name.clone());
        let landing = self
            .services
            .catalog
            .add_catalog_page(
                &ctx.site.name,
                INDEX_PAGE,
                &link_text,
                &ctx.site.root_folder,
                content.url().as_str(),
            )
            .await?
            .ok_or_else(|| {
                ImportError::IllegalState(format!(
                    "{}/{} is already occupied",
                    ctx.site.root_folder, INDEX_PAGE
                ))
            })?;

        ctx.page_name = Some(INDEX_PAGE.to_string());
        ctx.cataloged_page_id = Some(landing.id);

        let landing_link = Link {
            absolute_link: String::new(),
            relative_path_with_file_name: landing.path.clone(),
            link_path: ctx.site.root_folder.clone(),
            link_text,
            page_name: INDEX_PAGE.to_string(),
            element: ElementLocator {
                tag: "a".to_string(),
                attribute: "href".to_string(),
                ordinal: 0,
                original: content.url().to_string(),
            },
            kind: LinkKind::Page,
            resolved: true,
        };

        // The seed may have been redirected; both spellings lead to the landing page
        for seed in [content.url().as_str(), ctx.seed_url.as_str()] {
            let key = strip_fragment(normalize_url(seed)?.as_str()).to_string();
            let link = Link {
                absolute_link: key.clone(),
                ..landing_link.clone()
            };
            ctx.queue.set_processed_link(&key, link);
        }

        ctx.log.status(
            self.name(),
            &format!("Created template {} and landing page {}", template.id, landing.path),
        );
        Ok(())
    }

    async fn rollback(&self, _content: &mut PageContent, ctx: &mut ImportContext) -> Result<()> {
        if let Some(page_id) = ctx.cataloged_page_id.take() {
            self.services.pages.delete_page(page_id).await?;
        }
        if let Some(template_id) = ctx.template_id.take() {
            self.services.templates.delete_template(template_id).await?;
        }
        Ok(())
    }
}

fn seed_fragments(content: &PageContent) -> (String, String, Option<String>) {
    let metadata = extract_metadata(&content.document());
    (metadata.head_content, metadata.body_content, metadata.title)
}
