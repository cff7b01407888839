//! Transport boundary
//!
//! The engine never speaks HTTP itself; it sends a [`TargetRequest`] through
//! a [`Transport`] and gets back a [`RawResponse`] or a [`TransportError`].
//! The production implementation is [`HttpTransport`] over reqwest; tests
//! and embedders can supply their own.

mod http;

pub use http::{HttpConfig, HttpTransport};

use async_trait::async_trait;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request failed: {0}")]
    RequestFailed(String),

    #[error("connection timeout")]
    Timeout,

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("too many redirects")]
    TooManyRedirects,
}

/// One GET request for a module target.
#[derive(Debug, Clone)]
pub struct TargetRequest {
    pub url: String,
    /// Headers attached verbatim; repeated headers keep value order.
    pub headers: BTreeMap<String, Vec<String>>,
}

/// Raw response as seen at the transport boundary: status line, headers,
/// and the decoded body text.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub reason: Option<String>,
    pub headers: BTreeMap<String, Vec<String>>,
    pub body: String,
}

/// Send-request-get-response capability. A single request either yields a
/// received response (whatever its status code) or a transport-level error.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: TargetRequest) -> Result<RawResponse, TransportError>;
}
