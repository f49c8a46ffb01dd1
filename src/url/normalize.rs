use crate::{UrlError, UrlResult};
use url::Url;

/// Normalizes a URL into its canonical crawl form
///
/// # Normalization Steps
///
/// 1. Trim surrounding whitespace and parse the URL; reject if malformed
/// 2. Require an `http` or `https` scheme and a host
/// 3. Lowercase the scheme and host
/// 4. Drop an explicit default port (80 for http, 443 for https)
/// 5. Resolve dot segments (`.` and `..`) in the path
/// 6. Remove the fragment (everything after #)
///
/// Steps 3 to 5 are applied by the WHATWG parser for special schemes; they
/// are listed here because the output relies on them.
///
/// # Arguments
///
/// * `url_str` - The URL string to normalize
///
/// # Returns
///
/// * `Ok(Url)` - Normalized URL
/// * `Err(UrlError)` - Failed to parse or normalize the URL
///
/// # Examples
///
/// ```
/// use webscraper::url::normalize_url;
///
/// let url = normalize_url("HTTP://Example.COM:80/a/./b/../c#top").unwrap();
/// assert_eq!(url.as_str(), "http://example.com/a/c");
/// ```
pub fn normalize_url(url_str: &str) -> UrlResult<Url> {
    let trimmed = url_str.trim();
    if trimmed.is_empty() {
        return Err(UrlError::Parse("empty URL".to_string()));
    }

    let mut url = Url::parse(trimmed).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    match url.host_str() {
        Some(host) if !host.is_empty() => {}
        _ => return Err(UrlError::MissingDomain),
    }

    url.set_fragment(None);

    Ok(url)
}

/// Normalizes a URL, returning `None` for anything that cannot be crawled
///
/// Callers treat `None` as "skip, do not traverse".
pub fn normalize(raw: &str) -> Option<String> {
    match normalize_url(raw) {
        Ok(url) => Some(url.to_string()),
        Err(e) => {
            tracing::debug!("Skipping URL {:?}: {}", raw, e);
            None
        }
    }
}
