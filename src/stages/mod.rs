//! The import stages
//!
//! Structural stages (theme, site, template) build the skeleton of a new
//! site and are all mandatory. Content stages (links, metadata, page body)
//! run for the seed page and again for every page discovered below it.
//! The thumbnail stage only runs for the seed.

mod links;
mod metadata;
mod page_body;
mod site;
mod template;
mod theme;
mod thumbnail;

pub use links::{LinkExtractionStage, LinkSettings};
pub use metadata::MetadataStage;
pub use page_body::PageBodyStage;
pub use site::SiteStage;
pub use template::{TemplateCache, TemplateStage};
pub use theme::ThemeStage;
pub use thumbnail::ThumbnailStage;

use crate::pipeline::{ImportServices, ImportStage};
use std::sync::Arc;
use std::time::Duration;

/// Stage list run against the seed page of a new site
pub fn seed_pipeline(
    services: &ImportServices,
    settings: LinkSettings,
    drain_timeout: Duration,
) -> Vec<Arc<dyn ImportStage>> {
    let templates = Arc::new(TemplateCache::default());
    vec![
        Arc::new(ThemeStage::new(services.clone())),
        Arc::new(SiteStage::new(services.clone())),
        Arc::new(TemplateStage::new(services.clone())),
        Arc::new(LinkExtractionStage::new(
            services.clone(),
            settings,
            Arc::clone(&templates),
        )),
        Arc::new(MetadataStage),
        Arc::new(PageBodyStage::new(services.clone(), templates)),
        Arc::new(ThumbnailStage::new(services.clone(), drain_timeout)),
    ]
}
