//! HTTP transport over reqwest

use async_trait::async_trait;
use reqwest::{Client, Proxy};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;

use super::{RawResponse, TargetRequest, Transport, TransportError};

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(100),
            user_agent: "scrapebox/0.1.0".to_string(),
        }
    }
}

/// Production transport backed by a pooled reqwest client.
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Build a transport from config, with an optional proxy.
    pub fn new(config: HttpConfig, proxy_url: Option<&str>) -> Result<Self, TransportError> {
        let mut builder = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .user_agent(&config.user_agent)
            .redirect(reqwest::redirect::Policy::limited(10));

        if let Some(url) = proxy_url {
            let proxy = Proxy::all(url)
                .map_err(|e| TransportError::InvalidUrl(format!("Invalid proxy: {}", e)))?;
            builder = builder.proxy(proxy);
        }

        let client = builder
            .build()
            .map_err(|e| TransportError::RequestFailed(e.to_string()))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: TargetRequest) -> Result<RawResponse, TransportError> {
        debug!(url = %request.url, "Sending request");

        let mut builder = self.client.get(&request.url);
        for (name, values) in &request.headers {
            for value in values {
                builder = builder.header(name, value);
            }
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout
            } else if e.is_redirect() {
                TransportError::TooManyRedirects
            } else {
                TransportError::RequestFailed(e.to_string())
            }
        })?;

        let status = response.status();
        let reason = status.canonical_reason().map(str::to_string);

        let mut headers: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (name, value) in response.headers() {
            headers
                .entry(name.as_str().to_string())
                .or_default()
                .push(String::from_utf8_lossy(value.as_bytes()).into_owned());
        }

        let body = response
            .text()
            .await
            .map_err(|e| TransportError::RequestFailed(format!("Failed to read body: {}", e)))?;

        debug!(status = status.as_u16(), size = body.len(), "Response received");

        Ok(RawResponse {
            status: status.as_u16(),
            reason,
            headers,
            body,
        })
    }
}
