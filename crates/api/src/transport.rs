//! HTTP transport seam.
//!
//! [`HttpClient`] is the only capability the resources need from their
//! environment. [`ReqwestClient`] is the production implementation; tests can
//! substitute anything that records or fabricates responses.

use crate::error::{ApiError, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, Method, StatusCode};
use std::time::Duration;
use tracing::{debug, trace};
use url::Url;

/// A request relative to the server root, as built by `ApiResource`.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
    pub body: Option<String>,
}

/// Per-call dispatch options. Headers here replace request headers of the
/// same name.
#[derive(Debug, Clone, Default)]
pub struct SendOptions {
    pub headers: HeaderMap,
}

/// Raw response handed back to the resource layer, status uninspected.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl ApiResponse {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Vec::new(),
        }
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// All values of a possibly repeated header, in arrival order.
    pub fn header_values(&self, name: &str) -> Vec<&HeaderValue> {
        self.headers.get_all(name).iter().collect()
    }
}

#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn send(&self, request: ApiRequest, options: SendOptions) -> Result<ApiResponse>;
}

/// Overlay `overrides` onto `base`; every name present in `overrides` ends up
/// with exactly the override values.
pub fn merge_headers(mut base: HeaderMap, overrides: &HeaderMap) -> HeaderMap {
    for name in overrides.keys() {
        base.remove(name);
    }
    for (name, value) in overrides.iter() {
        base.append(name.clone(), value.clone());
    }
    base
}

#[derive(Clone, Debug)]
pub struct ReqwestClient {
    client: Client,
    server_url: Url,
    timeout: Option<Duration>,
    error_for_status: bool,
}

impl ReqwestClient {
    pub fn new(server_url: impl AsRef<str>) -> Result<Self> {
        let url = Url::parse(server_url.as_ref())?;
        let timeout = Duration::from_secs(30);
        Ok(Self {
            timeout: Some(timeout),
            ..Self::with_client(build_client(timeout)?, url)
        })
    }

    /// Wrap a caller-owned `reqwest::Client`; its own timeout and pooling
    /// settings apply until [`with_timeout`](Self::with_timeout) replaces it.
    pub fn with_client(client: Client, mut server_url: Url) -> Self {
        if !server_url.path().ends_with('/') {
            let path = format!("{}/", server_url.path());
            server_url.set_path(&path);
        }

        Self {
            client,
            server_url,
            timeout: None,
            error_for_status: false,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.client = build_client(timeout)?;
        self.timeout = Some(timeout);
        Ok(self)
    }

    /// Turn non-2xx statuses into transport errors instead of handing the
    /// response back.
    pub fn with_error_for_status(mut self, enabled: bool) -> Self {
        self.error_for_status = enabled;
        self
    }

    pub fn server_url(&self) -> &Url {
        &self.server_url
    }

    /// `None` when the wrapped client was supplied by the caller.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

fn build_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .user_agent(format!("rt-rest2/{}", env!("CARGO_PKG_VERSION")))
        .timeout(timeout)
        .build()
        .map_err(ApiError::Transport)
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn send(&self, request: ApiRequest, options: SendOptions) -> Result<ApiResponse> {
        let url = self.server_url.join(&request.path)?;
        debug!(method = %request.method, url = %url, "Sending request");

        let headers = merge_headers(request.headers, &options.headers);
        let mut builder = self.client.request(request.method, url).headers(headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let mut response = builder.send().await?;
        if self.error_for_status {
            response = response.error_for_status()?;
        }

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?.to_vec();
        trace!(status = status.as_u16(), bytes = body.len(), "Received response");

        Ok(ApiResponse {
            status,
            headers,
            body,
        })
    }
}
