//! HTTP GET returning decoded JSON, in async and blocking flavours.
//!
//! Both implementations sit behind [`Transport`] so the request pipeline in
//! [`crate::provider`] is written once and driven by either.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{
    StatusCode, Url,
    header::{HeaderMap, HeaderValue, USER_AGENT},
};
use serde_json::Value;
use tracing::debug;

use crate::error::{Error, Result};

/// Timeout for blocking requests unless the caller picks another.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

const CLIENT_ID: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

#[async_trait]
pub trait Transport: Send + Sync {
    async fn fetch_json(&self, url: &Url) -> Result<Value>;
}

/// Headers sent with every request: identifies the client by name and version.
pub fn default_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(CLIENT_ID));
    headers
}

fn merged_headers(overrides: HeaderMap) -> HeaderMap {
    let mut headers = default_headers();
    headers.extend(overrides);
    headers
}

/// Non-blocking transport backed by `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct AsyncTransport {
    http: reqwest::Client,
}

impl AsyncTransport {
    pub fn new() -> Result<Self> {
        Self::with_headers(HeaderMap::new())
    }

    /// `headers` override the defaults key by key.
    pub fn with_headers(headers: HeaderMap) -> Result<Self> {
        let http = reqwest::Client::builder()
            .default_headers(merged_headers(headers))
            .build()?;
        Ok(Self { http })
    }
}

#[async_trait]
impl Transport for AsyncTransport {
    async fn fetch_json(&self, url: &Url) -> Result<Value> {
        let res = self.http.get(url.clone()).send().await?;
        let status = res.status();
        let body = res.text().await?;

        debug!(
            host = url.host_str().unwrap_or_default(),
            status = status.as_u16(),
            "response received"
        );
        decode_body(status, &body)
    }
}

/// Blocking transport backed by `reqwest::blocking::Client`.
///
/// Never yields, so futures using it can be driven by a plain executor.
/// Like `reqwest::blocking`, it must not be used from inside an async runtime.
#[derive(Debug, Clone)]
pub struct BlockingTransport {
    http: reqwest::blocking::Client,
}

impl BlockingTransport {
    pub fn new(timeout: Duration) -> Result<Self> {
        Self::with_headers(HeaderMap::new(), timeout)
    }

    pub fn with_headers(headers: HeaderMap, timeout: Duration) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .default_headers(merged_headers(headers))
            .timeout(timeout)
            .build()?;
        Ok(Self { http })
    }
}

#[async_trait]
impl Transport for BlockingTransport {
    async fn fetch_json(&self, url: &Url) -> Result<Value> {
        let res = self.http.get(url.clone()).send()?;
        let status = res.status();
        let body = res.text()?;

        debug!(
            host = url.host_str().unwrap_or_default(),
            status = status.as_u16(),
            "response received"
        );
        decode_body(status, &body)
    }
}

/// Providers report errors as JSON bodies with non-success statuses, so the
/// body is decoded regardless of status; only undecodable error bodies become
/// [`Error::Http`].
fn decode_body(status: StatusCode, body: &str) -> Result<Value> {
    match serde_json::from_str(body) {
        Ok(value) => Ok(value),
        Err(_) if !status.is_success() => Err(Error::Http {
            status: status.as_u16(),
            body: truncate_body(body),
        }),
        Err(e) => Err(e.into()),
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() > MAX {
        let cut = (0..=MAX).rev().find(|i| body.is_char_boundary(*i)).unwrap_or(0);
        format!("{}...", &body[..cut])
    } else {
        body.to_string()
    }
}
