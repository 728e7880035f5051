use std::time::Duration;

use async_trait::async_trait;
use indexmap::IndexMap;
use reqwest::{Client, header};
use stencil_util::{backoff_delays, redact_header_value};
use tracing::{debug, warn};
use url::Url;

use crate::FetchError;

const USER_AGENT: &str = concat!("stencil/", env!("CARGO_PKG_VERSION"));

/// Retrieves the raw bytes of a descriptor set from a source URL.
#[async_trait]
pub trait DescriptorFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

/// Knobs for [`HttpDescriptorFetcher`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchSettings {
    /// Timeout applied to each individual request.
    pub timeout: Duration,
    /// Additional attempts after the first failure.
    pub retries: u32,
    /// Delay before the first retry; doubled on every following one.
    pub backoff_min: Duration,
    /// Headers sent with every request, in insertion order.
    pub headers: IndexMap<String, String>,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            retries: 4,
            backoff_min: Duration::from_secs(5),
            headers: IndexMap::new(),
        }
    }
}

/// Fetcher for `http`, `https` and `file` URLs.
#[derive(Debug, Clone)]
pub struct HttpDescriptorFetcher {
    http: Client,
    settings: FetchSettings,
}

impl HttpDescriptorFetcher {
    /// Build a fetcher with the given settings.
    ///
    /// Fails when a configured header is not a valid HTTP header or the
    /// underlying client cannot be constructed.
    pub fn new(settings: FetchSettings) -> Result<Self, FetchError> {
        let default_headers = build_header_map(&settings.headers)?;
        for (name, value) in &settings.headers {
            debug!(header = %name, value = %redact_header_value(name, value), "configured fetch header");
        }

        let http = Client::builder()
            .default_headers(default_headers)
            .timeout(settings.timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(FetchError::Client)?;

        Ok(Self { http, settings })
    }

    pub fn settings(&self) -> &FetchSettings {
        &self.settings
    }

    async fn fetch_once(&self, url: &Url) -> Result<Vec<u8>, FetchError> {
        let response = self
            .http
            .get(url.clone())
            .header(header::ACCEPT, "application/octet-stream, */*")
            .send()
            .await
            .map_err(|source| FetchError::Request {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }

        let bytes = response.bytes().await.map_err(|source| FetchError::Request {
            url: url.to_string(),
            source,
        })?;
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl DescriptorFetcher for HttpDescriptorFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let parsed = validate_source_url(url)?;
        if parsed.scheme() == "file" {
            return read_local(url, &parsed).await;
        }

        let mut delays = backoff_delays(self.settings.backoff_min, self.settings.retries);
        let mut attempts = 1;
        loop {
            debug!(%url, attempt = attempts, "fetching descriptor set");
            match self.fetch_once(&parsed).await {
                Ok(bytes) => {
                    debug!(%url, bytes = bytes.len(), "fetched descriptor set");
                    return Ok(bytes);
                }
                Err(error) if error.is_retryable() => {
                    let Some(delay) = delays.next() else {
                        return Err(FetchError::RetriesExhausted {
                            url: url.to_string(),
                            attempts,
                            last: Box::new(error),
                        });
                    };
                    warn!(%url, attempt = attempts, ?delay, %error, "descriptor fetch failed; retrying");
                    tokio::time::sleep(delay).await;
                    attempts += 1;
                }
                Err(error) => return Err(error),
            }
        }
    }
}

/// Parse a source URL and check that its scheme can be fetched.
pub fn validate_source_url(url: &str) -> Result<Url, FetchError> {
    let parsed = Url::parse(url.trim()).map_err(|error| FetchError::invalid_url(url, error.to_string()))?;
    match parsed.scheme() {
        "http" | "https" => {
            if parsed.host_str().is_none_or(str::is_empty) {
                return Err(FetchError::invalid_url(url, "missing host"));
            }
            Ok(parsed)
        }
        "file" => Ok(parsed),
        scheme => Err(FetchError::UnsupportedScheme {
            url: url.to_string(),
            scheme: scheme.to_string(),
        }),
    }
}

/// Check that every configured header name and value is valid HTTP.
pub fn validate_headers(headers: &IndexMap<String, String>) -> Result<(), FetchError> {
    build_header_map(headers).map(|_| ())
}

fn build_header_map(headers: &IndexMap<String, String>) -> Result<header::HeaderMap, FetchError> {
    let mut map = header::HeaderMap::new();
    for (name, value) in headers {
        let header_name = header::HeaderName::from_bytes(name.as_bytes()).map_err(|error| FetchError::InvalidHeader {
            name: name.clone(),
            reason: error.to_string(),
        })?;
        let mut header_value = header::HeaderValue::from_str(value).map_err(|error| FetchError::InvalidHeader {
            name: name.clone(),
            reason: error.to_string(),
        })?;
        header_value.set_sensitive(stencil_util::is_sensitive_header(name));
        map.insert(header_name, header_value);
    }
    Ok(map)
}

async fn read_local(url: &str, parsed: &Url) -> Result<Vec<u8>, FetchError> {
    let path = parsed
        .to_file_path()
        .map_err(|_| FetchError::invalid_url(url, "not a local file path"))?;
    debug!(path = %path.display(), "reading descriptor set from disk");
    tokio::fs::read(&path).await.map_err(|source| FetchError::Io { path, source })
}

fn truncate_body(body: &str) -> String {
    const LIMIT: usize = 256;
    let trimmed = body.trim();
    if trimmed.chars().count() <= LIMIT {
        return trimmed.to_string();
    }
    let truncated: String = trimmed.chars().take(LIMIT).collect();
    format!("{truncated}...")
}
