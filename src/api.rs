// HTTP transport: the only place that touches the network. Everything above
// this module works on `ApiRequest` / `RawResponse` so the session and fetch
// logic can be driven by canned responses in tests.

use crate::error::{LluError, LluResult};
use reqwest::blocking::Client;
use reqwest::header::HeaderMap;
use reqwest::Method;
use serde_json::Value;
use std::time::Duration;

/// A fully resolved request: absolute URL, headers and optional JSON body.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn get(url: impl Into<String>, headers: HeaderMap) -> Self {
        Self {
            method: Method::GET,
            url: url.into(),
            headers,
            body: None,
        }
    }

    pub fn post(url: impl Into<String>, headers: HeaderMap, body: Value) -> Self {
        Self {
            method: Method::POST,
            url: url.into(),
            headers,
            body: Some(body),
        }
    }
}

/// Status and body text as received. The body is kept raw so callers can
/// report non-JSON responses.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn json(&self) -> Option<Value> {
        serde_json::from_str(&self.body).ok()
    }

    /// First 500 characters of the body, for error messages.
    pub fn snippet(&self) -> String {
        self.body.chars().take(500).collect()
    }
}

/// Sends a request and returns the raw response. Implementations must map
/// connection failures and timeouts to `LluError::Network`; HTTP error
/// statuses are returned as normal responses.
pub trait Transport {
    fn send(&self, req: &ApiRequest) -> LluResult<RawResponse>;
}

/// Blocking reqwest client with a bounded per-request timeout.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> LluResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .gzip(true)
            .build()
            .map_err(|e| LluError::Network(format!("Failed to build HTTP client: {}", e)))?;
        Ok(ReqwestTransport { client })
    }
}

impl Transport for ReqwestTransport {
    fn send(&self, req: &ApiRequest) -> LluResult<RawResponse> {
        let mut builder = self
            .client
            .request(req.method.clone(), &req.url)
            .headers(req.headers.clone());
        if let Some(body) = &req.body {
            builder = builder.json(body);
        }
        let res = builder.send()?;
        let status = res.status().as_u16();
        let body = res.text()?;
        Ok(RawResponse { status, body })
    }
}

impl<T: Transport + ?Sized> Transport for &T {
    fn send(&self, req: &ApiRequest) -> LluResult<RawResponse> {
        (**self).send(req)
    }
}
