use futures::StreamExt;
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::util::{validate_source_url, UrlValidationError};

/// Upper bound on a source body. Large provider lists run to a few MB.
pub const MAX_SOURCE_SIZE: usize = 50 * 1024 * 1024; // 50MB

/// Default bound on the whole request, from sending it to reading the last body byte.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Failure to retrieve a remote source.
///
/// The `Display` text is meant for end users; the technical reason is kept
/// as the error source for logs and diagnostics.
#[derive(Debug, Error)]
#[error("failed to fetch remote source, check network connectivity")]
pub struct FetchError {
    #[source]
    cause: FetchCause,
}

impl FetchError {
    pub fn cause(&self) -> &FetchCause {
        &self.cause
    }

    /// Technical reason, e.g. `http status 404: Not Found`.
    pub fn reason(&self) -> String {
        self.cause.to_string()
    }
}

impl From<FetchCause> for FetchError {
    fn from(cause: FetchCause) -> Self {
        Self { cause }
    }
}

/// The technical reason behind a [`FetchError`].
#[derive(Debug, Error)]
pub enum FetchCause {
    /// Source URL failed validation, no request was sent
    #[error("invalid source url: {0}")]
    InvalidUrl(#[from] UrlValidationError),
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// HTTP response with non-2xx status code
    #[error("http status {code}: {message}")]
    HttpStatus { code: u16, message: String },
    /// Request and body not completed within the fetch timeout
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    /// Response body exceeded [`MAX_SOURCE_SIZE`]
    #[error("response too large (exceeds {0} bytes)")]
    ResponseTooLarge(usize),
}

/// Fetches a source with a single HTTP GET and returns the body as text.
///
/// # Arguments
///
/// * `client` - HTTP client used for the request (allows custom configuration)
/// * `url` - Source URL, must be `http` or `https`
/// * `timeout` - Bound on the whole request, body included
///
/// # Behavior
///
/// - Exactly one attempt, no retries
/// - Only 2xx responses are accepted
/// - An empty body is returned as an empty string
/// - Invalid UTF-8 is replaced rather than rejected
///
/// # Errors
///
/// Every failure is a [`FetchError`]; see [`FetchCause`] for the reasons.
pub async fn fetch_source(
    client: &reqwest::Client,
    url: &str,
    timeout: Duration,
) -> Result<String, FetchError> {
    tracing::info!(url = %url, "Fetching remote source");

    fetch_once(client, url, timeout).await.map_err(|cause| {
        tracing::error!(url = %url, error = %cause, "Failed to fetch remote source");
        FetchError::from(cause)
    })
}

async fn fetch_once(
    client: &reqwest::Client,
    url: &str,
    timeout: Duration,
) -> Result<String, FetchCause> {
    let parsed = validate_source_url(url)?;

    // The bound covers the body too, so a server that stalls mid-stream
    // still fails as a timeout
    let bytes = tokio::time::timeout(timeout, request_body(client, parsed))
        .await
        .map_err(|_| FetchCause::Timeout(timeout))??;

    match String::from_utf8(bytes) {
        Ok(text) => Ok(text),
        Err(e) => {
            tracing::warn!(
                url = %url,
                valid_up_to = e.utf8_error().valid_up_to(),
                "Source is not valid UTF-8, replacing invalid sequences"
            );
            Ok(String::from_utf8_lossy(e.as_bytes()).into_owned())
        }
    }
}

async fn request_body(client: &reqwest::Client, url: Url) -> Result<Vec<u8>, FetchCause> {
    let response = client.get(url).send().await?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchCause::HttpStatus {
            code: status.as_u16(),
            message: status.canonical_reason().unwrap_or_default().to_string(),
        });
    }

    read_limited_bytes(response, MAX_SOURCE_SIZE).await
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, FetchCause> {
    // Fast path: check Content-Length header
    if let Some(len) = response.content_length() {
        if len > limit as u64 {
            return Err(FetchCause::ResponseTooLarge(limit));
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(FetchCause::ResponseTooLarge(limit));
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(bytes)
}
