use url::Url;

/// Extracts the domain from a URL
///
/// This function retrieves the host portion of a URL and converts it to lowercase.
/// If the URL has no host (which shouldn't happen for valid HTTP(S) URLs), it returns None.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use webscraper::url::extract_domain;
///
/// let url = Url::parse("https://EXAMPLE.COM/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Checks whether a URL belongs to the crawl domain
///
/// A host matches when it equals the domain, equals `www.` + domain, or is
/// any subdomain of it. The comparison is case-insensitive and an
/// unparsable URL never matches.
///
/// # Examples
///
/// ```
/// use webscraper::url::is_same_domain;
///
/// assert!(is_same_domain("https://www.example.com/a", "example.com"));
/// assert!(is_same_domain("https://blog.example.com/a", "EXAMPLE.com"));
/// assert!(!is_same_domain("https://notexample.com/a", "example.com"));
/// ```
pub fn is_same_domain(url: &str, domain: &str) -> bool {
    let host = match Url::parse(url).ok().as_ref().and_then(extract_domain) {
        Some(h) => h,
        None => return false,
    };
    let domain = domain.trim().to_lowercase();
    if domain.is_empty() {
        return false;
    }

    // The www. case is covered by the subdomain suffix check as well.
    host == domain || host.ends_with(&format!(".{}", domain))
}
