//! Toolcache Core - offline caching and extension messaging for the tools site.
//!
//! Two independent halves:
//! - The caching worker ([`worker`]): versioned response partitions, an
//!   install/activate lifecycle and a cache-first fetch interceptor.
//! - The extension messenger ([`extension`]): a request/response protocol
//!   between the popup, content scripts and the background context, backed by
//!   durable [`storage`].
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use toolcache_core::{HttpFetcher, Registration, Request, SqliteCacheStore, WorkerConfig};
//!
//! #[tokio::main]
//! async fn main() -> toolcache_core::Result<()> {
//!     let store = Arc::new(SqliteCacheStore::new("cache.sqlite")?);
//!     let registration = Registration::new(store, Arc::new(HttpFetcher::new()?));
//!
//!     let origin = url::Url::parse("http://localhost:4321").unwrap();
//!     registration.register(WorkerConfig::new(origin.clone(), "v2")).await?;
//!
//!     let response = registration.fetch(&Request::navigate(origin.join("/hub").unwrap())).await?;
//!     println!("status {}", response.status());
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod extension;
pub mod network;
pub mod storage;
pub mod worker;

#[cfg(test)]
mod testing;

// Re-export commonly used types
pub use cache::{CacheStore, MemoryCacheStore, PartitionStats, SqliteCacheStore};
pub use config::{ExtensionSettings, PartitionRole, ToolcacheConfig, WorkerConfig};
pub use error::{Result, ToolcacheError};
pub use extension::{
    spawn_background, Background, Message, MessageResponse, MessageSender, Port, TabOpener,
};
pub use network::{Fetcher, HttpFetcher, Request, RequestKey, Response};
pub use storage::{JsonFileStorage, LocalStorage, MemoryStorage};
pub use worker::{CacheWorker, Clients, FetchInterceptor, Registration, WorkerState};
