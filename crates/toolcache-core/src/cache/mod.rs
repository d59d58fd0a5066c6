//! Versioned response cache.
//!
//! Responses are stored in named partitions (`static-<version>`,
//! `dynamic-<version>`), keyed by request identity. Two backends share the
//! same trait:
//! - SQLite, for hosts that keep the cache across restarts
//! - In-memory, for tests and throwaway hosts

mod memory;
mod sqlite;
mod traits;

pub use memory::MemoryCacheStore;
pub use sqlite::SqliteCacheStore;
pub use traits::{check_cacheable, CacheStore, PartitionStats};
