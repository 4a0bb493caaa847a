use url::Url;

/// Extracts the lowercase host from a URL
///
/// # Examples
///
/// ```
/// use url::Url;
/// use site_import::url::extract_domain;
///
/// let url = Url::parse("https://EXAMPLE.COM/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Returns true when `candidate` is served by the same site as `seed`
///
/// Hosts must match. With the same scheme the effective ports must match;
/// across http and https only explicit ports are compared, so a site mixing
/// `http://host/` and `https://host/` links is imported as one site.
pub fn is_same_site(seed: &Url, candidate: &Url) -> bool {
    let host = extract_domain(seed);
    if host.is_none() || host != extract_domain(candidate) {
        return false;
    }

    if seed.scheme() == candidate.scheme() {
        seed.port_or_known_default() == candidate.port_or_known_default()
    } else {
        seed.port() == candidate.port()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_subdomain() {
        let url = Url::parse("https://blog.example.com/post").unwrap();
        assert_eq!(extract_domain(&url), Some("blog.example.com".to_string()));
    }

    #[test]
    fn test_same_site_ignores_path() {
        let seed = Url::parse("http://example.com/").unwrap();
        let link = Url::parse("http://example.com/a/b.html?x=1").unwrap();
        assert!(is_same_site(&seed, &link));
    }

    #[test]
    fn test_different_host_is_external() {
        let seed = Url::parse("http://example.com/").unwrap();
        let link = Url::parse("http://other.com/").unwrap();
        assert!(!is_same_site(&seed, &link));
    }

    #[test]
    fn test_different_port_is_external() {
        let seed = Url::parse("http://127.0.0.1:8080/").unwrap();
        let link = Url::parse("http://127.0.0.1:9090/").unwrap();
        assert!(!is_same_site(&seed, &link));
    }

    #[test]
    fn test_scheme_switch_on_default_ports_is_same_site() {
        let seed = Url::parse("http://example.com/").unwrap();
        assert!(is_same_site(&seed, &Url::parse("https://example.com/docs").unwrap()));
        assert!(is_same_site(&seed, &Url::parse("http://example.com:80/").unwrap()));
        assert!(!is_same_site(&seed, &Url::parse("https://example.com:8443/").unwrap()));
    }
}
