use thiserror::Error;
use url::Url;

/// Errors that can occur while validating an IPTV source URL.
#[derive(Error, Debug)]
pub enum UrlValidationError {
    /// The URL string could not be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    /// The URL uses a scheme other than http or https.
    #[error("Unsupported scheme: {0} (only http/https allowed)")]
    UnsupportedScheme(String),
    /// The URL has no host component.
    #[error("URL has no host")]
    MissingHost,
}

/// Validates a URL string for use as an IPTV source.
///
/// Sources are frequently served from a home router or a NAS, so private and
/// loopback addresses are accepted. Only the shape of the URL is checked:
///
/// - The URL must parse
/// - The scheme must be `http` or `https`
/// - A host must be present
///
/// # Examples
///
/// ```
/// use iptv_catalog::util::validate_source_url;
///
/// let url = validate_source_url("https://example.com/live.m3u").unwrap();
/// assert_eq!(url.host_str(), Some("example.com"));
///
/// // LAN sources are fine
/// assert!(validate_source_url("http://192.168.1.1:8080/tv.txt").is_ok());
///
/// // Rejects non-HTTP schemes
/// assert!(validate_source_url("file:///etc/passwd").is_err());
/// ```
pub fn validate_source_url(url_str: &str) -> Result<Url, UrlValidationError> {
    let url = Url::parse(url_str.trim())?;

    match url.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlValidationError::UnsupportedScheme(scheme.to_owned())),
    }

    match url.host_str() {
        Some(host) if !host.is_empty() => Ok(url),
        _ => Err(UrlValidationError::MissingHost),
    }
}

/// Returns true if the path of `url_str` ends with one of `suffixes`,
/// ignoring case, the query string, and the fragment.
///
/// Strings that do not parse as URLs are compared as-is after stripping
/// anything from the first `?` or `#`.
pub fn url_path_has_suffix(url_str: &str, suffixes: &[&str]) -> bool {
    let path = match Url::parse(url_str) {
        Ok(url) => url.path().to_ascii_lowercase(),
        Err(_) => url_str
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase(),
    };

    suffixes
        .iter()
        .any(|suffix| path.ends_with(&suffix.to_ascii_lowercase()))
}
