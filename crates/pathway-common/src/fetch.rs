/// Content transport with a bounded per-attempt timeout and flat retries.
///
/// A `Fetcher` performs one attempt and reports the raw status. `fetch_with_retry`
/// wraps any fetcher with the timeout/retry policy. Status codes are never treated as
/// failures here: a 404 or 500 comes back as a normal `FetchResponse`.
use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::CommonError;

/// Raw result of a single fetch attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    pub status: u16,
    pub body: String,
}

impl FetchResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_not_found(&self) -> bool {
        self.status == 404
    }
}

/// One attempt at retrieving a resource by URL or path.
pub trait Fetcher: Send + Sync {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<FetchResponse, CommonError>> + Send;
}

/// Fetch `url`, cancelling any attempt that exceeds `timeout` and retrying immediately
/// on failure while `retries` remain. The last failure is returned once the budget is
/// spent.
pub async fn fetch_with_retry<F: Fetcher>(
    fetcher: &F,
    url: &str,
    timeout: Duration,
    retries: u32,
) -> Result<FetchResponse, CommonError> {
    let mut remaining = retries;
    loop {
        let result = match tokio::time::timeout(timeout, fetcher.fetch(url)).await {
            Ok(result) => result,
            Err(_) => Err(CommonError::Timeout {
                url: url.to_string(),
                timeout_ms: timeout.as_millis(),
            }),
        };

        match result {
            Ok(response) => return Ok(response),
            Err(e) if remaining > 0 => {
                remaining -= 1;
                warn!(url, retries_left = remaining, error = %e, "fetch failed, retrying");
            }
            Err(e) => return Err(e),
        }
    }
}

/// HTTP(S) transport backed by a shared reqwest client.
#[derive(Clone)]
pub struct HttpFetcher {
    http: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, CommonError> {
        let http = reqwest::Client::builder()
            .user_agent("learning-pathway")
            .build()?;
        Ok(Self { http })
    }
}

impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchResponse, CommonError> {
        let resp = self.http.get(url).send().await?;
        let status = resp.status().as_u16();
        let body = resp.text().await?;
        Ok(FetchResponse { status, body })
    }
}

/// Local-directory transport. A missing file is reported as status 404 so callers see
/// the same not-found signal they would get over HTTP.
#[derive(Debug, Clone, Default)]
pub struct FileFetcher;

impl Fetcher for FileFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchResponse, CommonError> {
        match tokio::fs::read_to_string(url).await {
            Ok(body) => Ok(FetchResponse { status: 200, body }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(FetchResponse {
                status: 404,
                body: String::new(),
            }),
            Err(e) => Err(CommonError::Io(e)),
        }
    }
}

/// Transport chosen from the configured content base path.
#[derive(Clone)]
pub enum ContentSource {
    Http(HttpFetcher),
    File(FileFetcher),
}

impl ContentSource {
    /// `http://` and `https://` base paths are served over HTTP, anything else is read
    /// from the local filesystem.
    pub fn for_base_path(base_path: &str) -> Result<Self, CommonError> {
        let lower = base_path.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            Ok(Self::Http(HttpFetcher::new()?))
        } else {
            Ok(Self::File(FileFetcher))
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Http(_) => "http",
            Self::File(_) => "file",
        }
    }
}

impl Fetcher for ContentSource {
    async fn fetch(&self, url: &str) -> Result<FetchResponse, CommonError> {
        match self {
            Self::Http(fetcher) => fetcher.fetch(url).await,
            Self::File(fetcher) => fetcher.fetch(url).await,
        }
    }
}
