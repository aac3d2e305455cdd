//! HTTP capability used by `Loader::load` for `http` and `https` references.

use std::time::Duration;

use crate::error::{Error, Result};

/// Status and body of a completed GET.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Capability for issuing GET requests.
///
/// Implementations report transport problems as `Error::FetchFailed`; a
/// response with any status code is returned as `Ok`.
pub trait HttpClient: Send + Sync {
    fn get(&self, url: &str) -> Result<HttpResponse>;
}

/// Blocking client backed by `reqwest`, without any response caching.
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    client: reqwest::blocking::Client,
}

impl ReqwestClient {
    pub fn new() -> Result<Self> {
        Self::with_options(None, None)
    }

    /// Build a client with an optional overall request timeout and user agent.
    pub fn with_options(timeout: Option<Duration>, user_agent: Option<&str>) -> Result<Self> {
        let mut builder = reqwest::blocking::Client::builder().user_agent(
            user_agent
                .map(str::to_string)
                .unwrap_or_else(|| format!("overlay-loader/{}", env!("CARGO_PKG_VERSION"))),
        );
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|e| Error::FetchFailed {
            url: String::new(),
            message: format!("cannot build HTTP client: {}", e),
        })?;
        Ok(Self { client })
    }
}

impl HttpClient for ReqwestClient {
    fn get(&self, url: &str) -> Result<HttpResponse> {
        let fetch_failed = |e: reqwest::Error| Error::FetchFailed {
            url: url.to_string(),
            message: e.to_string(),
        };
        let response = self.client.get(url).send().map_err(fetch_failed)?;
        let status = response.status().as_u16();
        let body = response.bytes().map_err(fetch_failed)?.to_vec();
        Ok(HttpResponse { status, body })
    }
}
