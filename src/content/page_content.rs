use crate::content::ElementLocator;
use scraper::Html;
use url::Url;

/// A recorded attribute rewrite for one element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeRewrite {
    pub element: ElementLocator,
    pub value: String,
}

/// A fetched page and the fields pipeline stages derive from it
///
/// The raw document is parsed on demand by the stage that needs it; the
/// parsed DOM is never held across an await point. Link rewrites are
/// recorded and applied when the HTML is serialized again.
#[derive(Debug, Clone)]
pub struct PageContent {
    url: Url,
    source_document: String,
    rewrites: Vec<AttributeRewrite>,

    pub title: Option<String>,
    pub description: Option<String>,
    pub head_content: String,
    pub after_body_start: String,
    pub before_body_close: String,
    pub body_content: String,
}

impl PageContent {
    pub fn new(url: Url, source_document: impl Into<String>) -> Self {
        Self {
            url,
            source_document: source_document.into(),
            rewrites: Vec::new(),
            title: None,
            description: None,
            head_content: String::new(),
            after_body_start: String::new(),
            before_body_close: String::new(),
            body_content: String::new(),
        }
    }

    /// The URL this page was fetched from
    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn source(&self) -> &str {
        &self.source_document
    }

    /// Parses the source document
    pub fn document(&self) -> Html {
        Html::parse_document(&self.source_document)
    }

    /// Parses the document with all recorded rewrites applied
    pub fn rewritten_document(&self) -> Html {
        Html::parse_document(&self.rewritten_html())
    }

    /// Points an element's attribute at a new value
    pub fn rewrite(&mut self, element: &ElementLocator, value: impl Into<String>) {
        let value = value.into();
        if value == element.original {
            return;
        }
        self.rewrites.push(AttributeRewrite {
            element: element.clone(),
            value,
        });
    }

    pub fn rewrites(&self) -> &[AttributeRewrite] {
        &self.rewrites
    }

    /// Source HTML with every recorded rewrite applied
    pub fn rewritten_html(&self) -> String {
        let mut html = self.source_document.clone();
        for rewrite in &self.rewrites {
            let attribute = &rewrite.element.attribute;
            let original = &rewrite.element.original;
            for quote in ['"', '\''] {
                let from = format!("{}={}{}{}", attribute, quote, original, quote);
                let to = format!("{}={}{}{}", attribute, quote, rewrite.value, quote);
                html = html.replace(&from, &to);
            }
        }
        html
    }

    /// Owned snapshot of the derived fields, handed to commit workers
    pub fn to_body(&self) -> PageBody {
        PageBody {
            title: self.title.clone(),
            description: self.description.clone(),
            head_content: self.head_content.clone(),
            after_body_start: self.after_body_start.clone(),
            before_body_close: self.before_body_close.clone(),
            body_content: self.body_content.clone(),
        }
    }
}

/// Derived page fields, detached from the document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageBody {
    pub title: Option<String>,
    pub description: Option<String>,
    pub head_content: String,
    pub after_body_start: String,
    pub before_body_close: String,
    pub body_content: String,
}

impl PageBody {
    /// Reassembles a standalone HTML document
    pub fn to_html(&self) -> String {
        format!(
            "<html><head>{}</head><body>{}{}{}</body></html>",
            self.head_content, self.after_body_start, self.body_content, self.before_body_close
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn locator(original: &str) -> ElementLocator {
        ElementLocator {
            tag: "a".to_string(),
            attribute: "href".to_string(),
            ordinal: 0,
            original: original.to_string(),
        }
    }

    #[test]
    fn test_rewrite_applies_to_both_quote_styles() {
        let url = Url::parse("http://example.com/").unwrap();
        let mut content = PageContent::new(
            url,
            r#"<a href="/foo">a</a><a href='/foo'>b</a><a href="/bar">c</a>"#,
        );
        content.rewrite(&locator("/foo"), "/site/foo");

        let html = content.rewritten_html();
        assert!(html.contains(r#"href="/site/foo""#));
        assert!(html.contains("href='/site/foo'"));
        assert!(html.contains(r#"href="/bar""#));
    }

    #[test]
    fn test_identity_rewrite_is_skipped() {
        let url = Url::parse("http://example.com/").unwrap();
        let mut content = PageContent::new(url, "<a href=\"/foo\">a</a>");
        content.rewrite(&locator("/foo"), "/foo");
        assert!(content.rewrites().is_empty());
    }

    #[test]
    fn test_body_snapshot_is_detached() {
        let url = Url::parse("http://example.com/").unwrap();
        let mut content = PageContent::new(url, "");
        content.title = Some("Before".to_string());
        let body = content.to_body();
        content.title = Some("After".to_string());
        assert_eq!(body.title.as_deref(), Some("Before"));
    }
}
