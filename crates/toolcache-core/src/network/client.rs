//! HTTP fetcher backed by reqwest.
//!
//! Unlike a typical API client this never turns an HTTP status into an
//! error: a 404 from the origin is a valid response the page should see.

use super::{Fetcher, Request, Response};
use crate::config::NetworkConfig;
use crate::{Result, ToolcacheError};
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// Fetcher that talks to the real network.
pub struct HttpFetcher {
    client: Client,
    timeout: Option<Duration>,
}

impl HttpFetcher {
    /// Create a fetcher without a request timeout.
    pub fn new() -> Result<Self> {
        Self::with_timeout(None)
    }

    /// Create a fetcher with an optional request timeout.
    pub fn with_timeout(timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder().user_agent(NetworkConfig::USER_AGENT);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        let client = builder.build().map_err(|e| ToolcacheError::Network {
            message: format!("Failed to create HTTP client: {}", e),
            source: Some(e),
        })?;

        Ok(Self { client, timeout })
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

#[async_trait::async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: &Request) -> Result<Response> {
        let mut builder = self
            .client
            .request(request.method().clone(), request.url().clone());
        for (name, value) in request.headers() {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                ToolcacheError::Timeout(self.timeout.unwrap_or_default())
            } else {
                ToolcacheError::Network {
                    message: format!("{} {} failed: {}", request.method(), request.url(), e),
                    source: Some(e),
                }
            }
        })?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();

        let body = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                ToolcacheError::Timeout(self.timeout.unwrap_or_default())
            } else {
                ToolcacheError::Network {
                    message: format!("Failed to read body of {}: {}", request.url(), e),
                    source: Some(e),
                }
            }
        })?;

        debug!("{} {} -> {}", request.method(), request.url(), status);

        Ok(Response::from_parts(status, headers, body))
    }
}
