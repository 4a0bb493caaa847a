//! Remote URL to repository path conversion

use url::Url;

/// Canonical name of a folder's landing page
pub const INDEX_PAGE: &str = "index.html";

/// Where a page lives inside the content repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryLocation {
    /// Absolute folder path, e.g. `/site/docs`
    pub folder: String,
    /// Item name inside the folder
    pub name: String,
}

impl RepositoryLocation {
    pub fn new(folder: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            folder: folder.into(),
            name: name.into(),
        }
    }

    /// Full item path
    pub fn path(&self) -> String {
        format!("{}/{}", self.folder, self.name)
    }

    pub fn is_index(&self) -> bool {
        self.name == INDEX_PAGE
    }
}

/// Root folder for a site's content
pub fn site_root(site_name: &str) -> String {
    let cleaned: String = site_name
        .trim()
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' || c == '.' { c } else { '-' })
        .collect();
    format!("/{}", cleaned)
}

/// Maps a page URL to its repository location
///
/// Directory URLs (empty path or trailing slash) and explicit `index.htm[l]`
/// names land on [`INDEX_PAGE`] inside the matching folder.
///
/// ```
/// use site_import::url::repository_location;
/// use url::Url;
///
/// let url = Url::parse("http://example.com/docs/").unwrap();
/// let location = repository_location(&url, "docs-site");
/// assert_eq!(location.path(), "/docs-site/docs/index.html");
/// ```
pub fn repository_location(url: &Url, site_name: &str) -> RepositoryLocation {
    let mut segments = path_segments(url);
    let directory = url.path().ends_with('/') || segments.is_empty();

    let name = if directory {
        INDEX_PAGE.to_string()
    } else {
        let last = segments.pop().unwrap_or_default();
        if last.eq_ignore_ascii_case("index.htm") || last.eq_ignore_ascii_case(INDEX_PAGE) {
            INDEX_PAGE.to_string()
        } else {
            last
        }
    };

    RepositoryLocation::new(join_folder(&site_root(site_name), &segments), name)
}

/// Maps an asset URL (image, stylesheet, script, binary link) to its path
pub fn asset_path(url: &Url, site_name: &str) -> String {
    let mut segments = path_segments(url);
    if url.path().ends_with('/') || segments.is_empty() {
        segments.push("asset".to_string());
    }
    join_folder(&site_root(site_name), &segments)
}

/// Name given to a page pushed down into a folder of its own name
pub fn demoted_name(name: &str) -> String {
    format!("index-{}", name)
}

fn path_segments(url: &Url) -> Vec<String> {
    url.path_segments()
        .map(|segments| {
            segments
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn join_folder(root: &str, segments: &[String]) -> String {
    if segments.is_empty() {
        root.to_string()
    } else {
        format!("{}/{}", root, segments.join("/"))
    }
}
