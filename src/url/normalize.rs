use crate::UrlError;
use url::Url;

/// Normalizes a URL for deduplication
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed
/// 2. Accept only http and https
/// 3. Lowercase the host
/// 4. Collapse duplicate slashes and dot segments
/// 5. Remove the fragment
///
/// The trailing slash is kept: `/foo` and `/foo/` resolve to different
/// repository locations.
///
/// # Examples
///
/// ```
/// use site_import::url::normalize_url;
///
/// let url = normalize_url("http://EXAMPLE.COM//a/./b/#top").unwrap();
/// assert_eq!(url.as_str(), "http://example.com/a/b/");
/// ```
pub fn normalize_url(url_str: &str) -> Result<Url, UrlError> {
    let mut url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    let host = url.host_str().ok_or(UrlError::MissingHost)?.to_lowercase();
    url.set_host(Some(&host))
        .map_err(|e| UrlError::Parse(format!("Failed to set host: {}", e)))?;

    let normalized_path = normalize_path(url.path());
    url.set_path(&normalized_path);
    url.set_fragment(None);

    Ok(url)
}

fn normalize_path(path: &str) -> String {
    let trailing = path.len() > 1 && path.ends_with('/');
    let mut segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                segments.pop();
            }
            _ => segments.push(segment),
        }
    }

    if segments.is_empty() {
        return "/".to_string();
    }

    let mut result = format!("/{}", segments.join("/"));
    if trailing {
        result.push('/');
    }
    result
}

/// Removes a `#fragment` suffix
///
/// Works on both absolute URLs and repository paths; callers strip each
/// independently since they can differ after normalization.
pub fn strip_fragment(value: &str) -> &str {
    match value.find('#') {
        Some(index) => &value[..index],
        None => value,
    }
}
