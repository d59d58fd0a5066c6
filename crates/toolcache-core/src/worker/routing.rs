//! Per-request routing decisions.

use crate::config::{PartitionRole, WorkerConfig};
use crate::error::{Result, ToolcacheError};
use crate::network::{Method, Request};
use regex::Regex;
use url::Url;

/// How the interceptor treats a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Not intercepted; the host fetches it untouched.
    Passthrough(BypassReason),
    /// Always fetched from the network, never cached.
    NetworkOnly,
    /// Served from cache when present, otherwise fetched and cached.
    CacheFirst,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BypassReason {
    NonGet,
    CrossOrigin,
}

/// Routing and classification rules derived from a [`WorkerConfig`].
#[derive(Debug, Clone)]
pub struct RoutePolicy {
    origin: Url,
    api_prefix: String,
    tool_prefix: String,
    asset_pattern: Option<Regex>,
}

impl RoutePolicy {
    pub fn new(config: &WorkerConfig) -> Result<Self> {
        let asset_pattern = if config.asset_extensions.is_empty() {
            None
        } else {
            let alternatives = config
                .asset_extensions
                .iter()
                .map(|ext| regex::escape(ext.trim_start_matches('.')))
                .collect::<Vec<_>>()
                .join("|");
            let pattern = format!(r"(?i)\.({})$", alternatives);
            Some(Regex::new(&pattern).map_err(|e| ToolcacheError::Config {
                message: format!("Invalid asset extension pattern: {}", e),
            })?)
        };

        Ok(Self {
            origin: config.origin.clone(),
            api_prefix: config.api_prefix.clone(),
            tool_prefix: config.tool_prefix.clone(),
            asset_pattern,
        })
    }

    /// Decide how to handle a request. First match wins.
    pub fn route(&self, request: &Request) -> Route {
        if *request.method() != Method::GET {
            return Route::Passthrough(BypassReason::NonGet);
        }
        if !request.is_same_origin(&self.origin) {
            return Route::Passthrough(BypassReason::CrossOrigin);
        }
        if self.is_api_path(request.url().path()) {
            return Route::NetworkOnly;
        }
        Route::CacheFirst
    }

    /// `/api/...` and the bare `/api` both count.
    fn is_api_path(&self, path: &str) -> bool {
        path.starts_with(&self.api_prefix)
            || path == self.api_prefix.trim_end_matches('/')
    }

    /// Pick the partition a fetched response is written into.
    pub fn classify(&self, url: &Url) -> PartitionRole {
        let path = url.path();
        let is_tool_page = path.starts_with(&self.tool_prefix);
        let is_asset = self
            .asset_pattern
            .as_ref()
            .is_some_and(|pattern| pattern.is_match(path));

        if is_tool_page || is_asset {
            PartitionRole::Dynamic
        } else {
            PartitionRole::Static
        }
    }
}
