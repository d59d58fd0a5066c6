//! Cache store trait and types.

use crate::error::{Result, ToolcacheError};
use crate::network::{RequestKey, Response};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Statistics for one partition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartitionStats {
    pub name: String,
    pub entry_count: usize,
    pub total_size_bytes: u64,
    pub created_at: Option<DateTime<Utc>>,
}

/// Partitioned request → response storage.
///
/// A miss is never an error: `has` returns `false` and `get` returns `None`.
/// All operations are synchronous to match rusqlite's API.
pub trait CacheStore: Send + Sync {
    /// Create the partition if it does not exist. Idempotent.
    fn open(&self, partition: &str) -> Result<()>;

    /// Check whether an entry exists.
    fn has(&self, partition: &str, key: &RequestKey) -> Result<bool>;

    /// Look up an entry. Each call returns a fresh response.
    fn get(&self, partition: &str, key: &RequestKey) -> Result<Option<Response>>;

    /// Store a response, overwriting any entry with the same key.
    ///
    /// Creates the partition on first write. Consumes the response; callers
    /// that also return it to a page must duplicate it first.
    fn put(&self, partition: &str, key: &RequestKey, response: Response) -> Result<()>;

    /// Keys stored in a partition, in no particular order.
    fn keys(&self, partition: &str) -> Result<Vec<RequestKey>>;

    /// Names of all existing partitions.
    fn partition_names(&self) -> Result<BTreeSet<String>>;

    /// Remove a partition and all its entries.
    ///
    /// Returns `false` if the partition did not exist.
    fn delete(&self, partition: &str) -> Result<bool>;

    /// Per-partition statistics, ordered by name.
    fn partition_stats(&self) -> Result<Vec<PartitionStats>>;
}

/// Enforce the entry invariants shared by every backend.
pub fn check_cacheable(key: &RequestKey, response: &Response) -> Result<()> {
    if !key.is_get() {
        return Err(ToolcacheError::Validation {
            field: "method".to_string(),
            message: format!("only GET requests can be cached, got {}", key),
        });
    }
    if !response.is_cacheable() {
        return Err(ToolcacheError::Validation {
            field: "status".to_string(),
            message: format!(
                "only 200 responses can be cached, got {} for {}",
                response.status(),
                key
            ),
        });
    }
    Ok(())
}
