//! Origin Fetcher
//!
//! The network side of the proxy: fetch a URL, return status, headers and
//! body. The coordinator only ever sees the [`Fetcher`] trait.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

/// Headers that describe a single hop and must not be replayed from cache.
const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailers",
    "transfer-encoding",
    "upgrade",
];

// == Fetch Error ==
/// Failure of the origin request itself.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// No response within the allotted time
    #[error("origin request timed out after {0:?}")]
    Timeout(Duration),

    /// Connection, protocol or body read failure
    #[error("origin request failed: {0}")]
    Request(String),
}

// == Fetch Response ==
/// Status, filtered headers and body as returned by the origin.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchResponse {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub body: Bytes,
}

impl FetchResponse {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: BTreeMap::new(),
            body: body.into(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

// == Fetcher Trait ==
/// Fetch-by-URL operation consumed by the workers and the synchronous path.
#[async_trait]
pub trait Fetcher: Send + Sync + 'static {
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<FetchResponse, FetchError>;
}

// == HTTP Fetcher ==
/// [`Fetcher`] backed by a shared `reqwest` client.
#[derive(Debug, Clone, Default)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<FetchResponse, FetchError> {
        let to_error = |e: reqwest::Error| {
            if e.is_timeout() {
                FetchError::Timeout(timeout)
            } else {
                FetchError::Request(e.to_string())
            }
        };

        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(to_error)?;

        let status = response.status().as_u16();
        let headers = filter_headers(
            response
                .headers()
                .iter()
                .filter_map(|(name, value)| Some((name.as_str(), value.to_str().ok()?))),
        );
        let body = response.bytes().await.map_err(to_error)?;

        Ok(FetchResponse {
            status,
            headers,
            body,
        })
    }
}

// == Header Filtering ==
/// Drops hop-by-hop headers and `set-cookie`, keeping everything else.
pub fn filter_headers<'a>(
    headers: impl IntoIterator<Item = (&'a str, &'a str)>,
) -> BTreeMap<String, String> {
    headers
        .into_iter()
        .filter(|(name, _)| {
            let name = name.to_ascii_lowercase();
            name != "set-cookie" && !HOP_BY_HOP.contains(&name.as_str())
        })
        .fold(BTreeMap::new(), |mut kept, (name, value)| {
            // Repeated fields fold into one comma-separated value.
            kept.entry(name.to_string())
                .and_modify(|joined: &mut String| {
                    joined.push_str(", ");
                    joined.push_str(value);
                })
                .or_insert_with(|| value.to_string());
            kept
        })
}
