//! HTTP fetch side of the interception layer.
//!
//! The strategy engine never talks to reqwest directly; it goes through
//! the [`Net`] trait so tests can substitute a scripted network. The
//! real implementation is [`NetClient`].
//!
//! A non-2xx response is still a response: strategies decide what to do
//! with a 404 or 500. Only transport-level failures (DNS, refused
//! connection, timeout) surface as `NetworkUnavailable`.

pub mod url;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use std::time::{Duration, Instant};

use holdfast_core::request::{Method, Request};
use holdfast_core::{Error, StoredResponse};

pub use url::canonicalize;

/// Configuration for the network client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "holdfast/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 5MB)
    pub max_bytes: usize,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "holdfast/0.1".to_string(),
            max_bytes: 5 * 1024 * 1024,
            timeout: Duration::from_millis(20000),
            max_redirects: 5,
        }
    }
}

/// Response from a network fetch.
#[derive(Debug, Clone)]
pub struct FetchedResponse {
    /// HTTP status code
    pub status: u16,
    /// Response headers
    pub headers: Vec<(String, String)>,
    /// Response body bytes
    pub body: Bytes,
    /// Time taken to fetch in milliseconds
    pub fetch_ms: u64,
}

impl FetchedResponse {
    /// Whether the response is eligible for persistence (status exactly 200).
    pub fn is_storable(&self) -> bool {
        self.status == 200
    }

    /// Convert into the persistable form.
    pub fn to_stored(&self) -> StoredResponse {
        StoredResponse { status: self.status, headers: self.headers.clone(), body: self.body.to_vec() }
    }
}

/// Network access seam for the strategy engine.
#[async_trait]
pub trait Net: Send + Sync {
    /// Perform the request against the real network.
    async fn fetch(&self, request: &Request) -> Result<FetchedResponse, Error>;
}

/// HTTP client implementing [`Net`] over reqwest.
pub struct NetClient {
    http: Client,
    config: FetchConfig,
}

impl NetClient {
    /// Create a new network client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::NetworkUnavailable(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }
}

#[async_trait]
impl Net for NetClient {
    async fn fetch(&self, request: &Request) -> Result<FetchedResponse, Error> {
        if !request.has_interceptable_scheme() {
            return Err(Error::UnsupportedScheme(request.url.scheme().to_string()));
        }

        let start = Instant::now();

        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Head => reqwest::Method::HEAD,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self.http.request(method, request.url.clone());
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| Error::NetworkUnavailable(format!("{}: {}", request.url, e)))?;

        let status = response.status().as_u16();

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(Error::NetworkUnavailable(format!(
                "{} bytes exceeds {}",
                len, self.config.max_bytes
            )));
        }

        let headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();

        let body = response
            .bytes()
            .await
            .map_err(|e| Error::NetworkUnavailable(format!("failed to read response: {}", e)))?;

        if body.len() > self.config.max_bytes {
            return Err(Error::NetworkUnavailable(format!(
                "{} bytes exceeds {}",
                body.len(),
                self.config.max_bytes
            )));
        }

        let fetch_ms = start.elapsed().as_millis() as u64;

        tracing::debug!("fetched {} -> {} in {}ms ({} bytes)", request.url, status, fetch_ms, body.len());

        Ok(FetchedResponse { status, headers, body, fetch_ms })
    }
}
