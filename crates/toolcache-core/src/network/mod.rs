//! Network layer consumed by the cache worker.
//!
//! This module provides:
//! - Request type with method, URL and fetch destination
//! - Response type with a read-once body that must be duplicated before
//!   it can be both stored and returned
//! - `Fetcher` trait for the network collaborator
//! - reqwest-backed HTTP fetcher

mod client;
mod request;
mod response;

pub use client::HttpFetcher;
pub use request::{Destination, Method, Request, RequestKey};
pub use response::{Body, Response};

use crate::Result;

/// The network collaborator.
///
/// Implementations return `Ok` for every HTTP status, including errors like
/// 404 or 500. `Err` is reserved for transport failures (connection refused,
/// DNS, timeout), which is what the interceptor treats as "offline".
#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, request: &Request) -> Result<Response>;
}
