use crate::content::{extract_metadata, PageContent};
use crate::pipeline::{ImportContext, ImportStage};
use crate::Result;
use async_trait::async_trait;

/// Reads title, description and body fragments from the rewritten document
///
/// Runs after link extraction so the stored body carries repository paths
/// instead of remote URLs.
pub struct MetadataStage;

#[async_trait]
impl ImportStage for MetadataStage {
    fn name(&self) -> &'static str {
        "metadata"
    }

    fn is_mandatory(&self) -> bool {
        false
    }

    async fn process(&self, content: &mut PageContent, _ctx: &mut ImportContext) -> Result<()> {
        apply_metadata(content);
        Ok(())
    }
}

fn apply_metadata(content: &mut PageContent) {
    let metadata = extract_metadata(&content.rewritten_document());
    content.title = metadata.title;
    content.description = metadata.description;
    content.head_content = metadata.head_content;
    content.after_body_start = metadata.after_body_start;
    content.before_body_close = metadata.before_body_close;
    content.body_content = metadata.body_content;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::ElementLocator;
    use crate::testing;

    #[tokio::test]
    async fn test_metadata_uses_rewritten_links() {
        let (_, mut ctx) = testing::page_and_context("site");
        let mut content = PageContent::new(
            url::Url::parse("http://example.com/").unwrap(),
            r#"<html><head><title>Home</title></head><body><a href="/about">About</a></body></html>"#,
        );
        content.rewrite(
            &ElementLocator {
                tag: "a".to_string(),
                attribute: "href".to_string(),
                ordinal: 0,
                original: "/about".to_string(),
            },
            "/site/about",
        );

        MetadataStage.process(&mut content, &mut ctx).await.unwrap();

        assert_eq!(content.title.as_deref(), Some("Home"));
        assert!(content.body_content.contains(r#"href="/site/about""#));
    }
}
