use std::fmt;

/// What a discovered reference points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkKind {
    /// An anchor that may resolve to another HTML page
    Page,
    /// An `<img>` source
    Image,
    /// A stylesheet, script or other downloadable file
    Asset,
}

impl LinkKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Page => "page",
            Self::Image => "image",
            Self::Asset => "asset",
        }
    }
}

impl fmt::Display for LinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Back-reference to the element a link was read from
///
/// Elements are addressed by tag, attribute and position among the
/// elements matched for that tag, and carry the attribute value as written
/// so the occurrence can be rewritten later.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementLocator {
    pub tag: String,
    pub attribute: String,
    pub ordinal: usize,
    pub original: String,
}

/// A reference discovered in a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    /// Normalized absolute URL, without fragment
    pub absolute_link: String,
    /// Repository path including the item name
    pub relative_path_with_file_name: String,
    /// Repository folder the target lives in
    pub link_path: String,
    /// Anchor text or image alt text
    pub link_text: String,
    /// Item name inside `link_path`
    pub page_name: String,
    pub element: ElementLocator,
    pub kind: LinkKind,
    /// False while the link only holds a placeholder decision
    pub resolved: bool,
}

impl Link {
    /// Records where the target finally landed
    ///
    /// Only the first resolution is applied; later calls are ignored.
    pub fn resolve_to(&mut self, folder: &str, name: &str, text: Option<&str>) {
        if self.resolved {
            return;
        }
        self.link_path = folder.to_string();
        self.page_name = name.to_string();
        self.relative_path_with_file_name = format!("{}/{}", folder, name);
        if let Some(text) = text {
            self.link_text = text.to_string();
        }
        self.resolved = true;
    }

    /// Marks the link as decided without moving it
    pub fn mark_resolved(&mut self) {
        self.resolved = true;
    }
}
