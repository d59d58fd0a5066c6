//! In-memory cache store.

use super::traits::{check_cacheable, CacheStore, PartitionStats};
use crate::error::{Result, ToolcacheError};
use crate::network::{RequestKey, Response};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Clone)]
struct StoredEntry {
    status: u16,
    headers: Vec<(String, String)>,
    body: Bytes,
}

#[derive(Debug)]
struct Partition {
    created_at: DateTime<Utc>,
    entries: HashMap<RequestKey, StoredEntry>,
}

impl Partition {
    fn new() -> Self {
        Self {
            created_at: Utc::now(),
            entries: HashMap::new(),
        }
    }
}

/// Cache store that lives for the lifetime of the process.
#[derive(Debug, Default)]
pub struct MemoryCacheStore {
    partitions: RwLock<BTreeMap<String, Partition>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, BTreeMap<String, Partition>>> {
        self.partitions
            .read()
            .map_err(|e| ToolcacheError::Other(format!("Cache lock poisoned: {}", e)))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, BTreeMap<String, Partition>>> {
        self.partitions
            .write()
            .map_err(|e| ToolcacheError::Other(format!("Cache lock poisoned: {}", e)))
    }
}

impl CacheStore for MemoryCacheStore {
    fn open(&self, partition: &str) -> Result<()> {
        self.write()?
            .entry(partition.to_string())
            .or_insert_with(Partition::new);
        Ok(())
    }

    fn has(&self, partition: &str, key: &RequestKey) -> Result<bool> {
        Ok(self
            .read()?
            .get(partition)
            .is_some_and(|p| p.entries.contains_key(key)))
    }

    fn get(&self, partition: &str, key: &RequestKey) -> Result<Option<Response>> {
        let partitions = self.read()?;
        let entry = partitions.get(partition).and_then(|p| p.entries.get(key));

        Ok(entry.map(|e| Response::from_parts(e.status, e.headers.clone(), e.body.clone())))
    }

    fn put(&self, partition: &str, key: &RequestKey, response: Response) -> Result<()> {
        check_cacheable(key, &response)?;

        let (status, headers, body) = response.into_parts();
        self.write()?
            .entry(partition.to_string())
            .or_insert_with(Partition::new)
            .entries
            .insert(
                key.clone(),
                StoredEntry {
                    status,
                    headers,
                    body,
                },
            );
        Ok(())
    }

    fn keys(&self, partition: &str) -> Result<Vec<RequestKey>> {
        Ok(self
            .read()?
            .get(partition)
            .map(|p| p.entries.keys().cloned().collect())
            .unwrap_or_default())
    }

    fn partition_names(&self) -> Result<BTreeSet<String>> {
        Ok(self.read()?.keys().cloned().collect())
    }

    fn delete(&self, partition: &str) -> Result<bool> {
        Ok(self.write()?.remove(partition).is_some())
    }

    fn partition_stats(&self) -> Result<Vec<PartitionStats>> {
        Ok(self
            .read()?
            .iter()
            .map(|(name, p)| PartitionStats {
                name: name.clone(),
                entry_count: p.entries.len(),
                total_size_bytes: p.entries.values().map(|e| e.body.len() as u64).sum(),
                created_at: Some(p.created_at),
            })
            .collect())
    }
}
