//! SQLite-based cache store.

use super::traits::{check_cacheable, CacheStore, PartitionStats};
use crate::error::{Result, ToolcacheError};
use crate::network::{RequestKey, Response};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

/// SQLite-based cache store.
///
/// All partitions share one database. Thread-safe via internal mutex on the
/// connection.
pub struct SqliteCacheStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteCacheStore {
    /// Open (or create) a cache database at the given path.
    pub fn new(db_path: impl AsRef<Path>) -> Result<Self> {
        let db_path = db_path.as_ref();

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ToolcacheError::Io {
                message: format!("Failed to create cache directory: {}", e),
                path: Some(parent.to_path_buf()),
                source: Some(e),
            })?;
        }

        let conn = Connection::open(db_path).map_err(|e| ToolcacheError::Database {
            message: format!("Failed to open cache database: {}", e),
            source: Some(e),
        })?;

        // Enable WAL mode for better concurrent access
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")
            .map_err(|e| ToolcacheError::Database {
                message: format!("Failed to set pragmas: {}", e),
                source: Some(e),
            })?;

        Self::from_connection(conn)
    }

    /// Create a store backed by a private in-memory database.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self.lock()?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS cache_partitions (
                name TEXT PRIMARY KEY,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS cache_entries (
                partition TEXT NOT NULL,
                method TEXT NOT NULL,
                url TEXT NOT NULL,
                status INTEGER NOT NULL,
                headers TEXT NOT NULL,
                body BLOB NOT NULL,
                size_bytes INTEGER NOT NULL,
                cached_at TEXT NOT NULL,
                PRIMARY KEY (partition, method, url)
            );
            "#,
        )
        .map_err(|e| ToolcacheError::Database {
            message: format!("Failed to initialize cache schema: {}", e),
            source: Some(e),
        })?;

        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| ToolcacheError::Database {
            message: format!("Failed to lock database: {}", e),
            source: None,
        })
    }

    fn ensure_partition(conn: &Connection, partition: &str) -> Result<()> {
        conn.execute(
            "INSERT OR IGNORE INTO cache_partitions (name, created_at) VALUES (?1, ?2)",
            params![partition, Utc::now().to_rfc3339()],
        )
        .map_err(|e| ToolcacheError::Database {
            message: format!("Failed to open partition {}: {}", partition, e),
            source: Some(e),
        })?;
        Ok(())
    }
}

impl CacheStore for SqliteCacheStore {
    fn open(&self, partition: &str) -> Result<()> {
        let conn = self.lock()?;
        Self::ensure_partition(&conn, partition)
    }

    fn has(&self, partition: &str, key: &RequestKey) -> Result<bool> {
        let conn = self.lock()?;

        let exists = conn
            .query_row(
                r#"
                SELECT 1 FROM cache_entries
                WHERE partition = ?1 AND method = ?2 AND url = ?3
                LIMIT 1
                "#,
                params![partition, key.method, key.url],
                |_| Ok(true),
            )
            .optional()
            .map_err(|e| ToolcacheError::Database {
                message: format!("Failed to check cache entry: {}", e),
                source: Some(e),
            })?
            .unwrap_or(false);

        Ok(exists)
    }

    fn get(&self, partition: &str, key: &RequestKey) -> Result<Option<Response>> {
        let conn = self.lock()?;

        let row: Option<(i64, String, Vec<u8>)> = conn
            .query_row(
                r#"
                SELECT status, headers, body
                FROM cache_entries
                WHERE partition = ?1 AND method = ?2 AND url = ?3
                "#,
                params![partition, key.method, key.url],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()
            .map_err(|e| ToolcacheError::Database {
                message: format!("Failed to query cache entry: {}", e),
                source: Some(e),
            })?;

        let Some((status, headers_json, body)) = row else {
            return Ok(None);
        };

        let headers: Vec<(String, String)> = serde_json::from_str(&headers_json)?;

        Ok(Some(Response::from_parts(
            status as u16,
            headers,
            Bytes::from(body),
        )))
    }

    fn put(&self, partition: &str, key: &RequestKey, response: Response) -> Result<()> {
        check_cacheable(key, &response)?;

        let (status, headers, body) = response.into_parts();
        let headers_json = serde_json::to_string(&headers)?;

        let conn = self.lock()?;
        Self::ensure_partition(&conn, partition)?;

        conn.execute(
            r#"
            INSERT OR REPLACE INTO cache_entries
            (partition, method, url, status, headers, body, size_bytes, cached_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                partition,
                key.method,
                key.url,
                status as i64,
                headers_json,
                body.as_ref(),
                body.len() as i64,
                Utc::now().to_rfc3339()
            ],
        )
        .map_err(|e| ToolcacheError::Database {
            message: format!("Failed to store cache entry: {}", e),
            source: Some(e),
        })?;

        debug!("Cached {} in {}", key, partition);
        Ok(())
    }

    fn keys(&self, partition: &str) -> Result<Vec<RequestKey>> {
        let conn = self.lock()?;

        let mut stmt = conn
            .prepare("SELECT method, url FROM cache_entries WHERE partition = ?1 ORDER BY url")
            .map_err(|e| ToolcacheError::Database {
                message: format!("Failed to prepare keys query: {}", e),
                source: Some(e),
            })?;

        let keys = stmt
            .query_map(params![partition], |row| {
                Ok(RequestKey {
                    method: row.get(0)?,
                    url: row.get(1)?,
                })
            })?
            .filter_map(|r| r.ok())
            .collect();

        Ok(keys)
    }

    fn partition_names(&self) -> Result<BTreeSet<String>> {
        let conn = self.lock()?;

        let mut stmt = conn
            .prepare("SELECT name FROM cache_partitions")
            .map_err(|e| ToolcacheError::Database {
                message: format!("Failed to prepare partition query: {}", e),
                source: Some(e),
            })?;

        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .filter_map(|r| r.ok())
            .collect();

        Ok(names)
    }

    fn delete(&self, partition: &str) -> Result<bool> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let entries = tx.execute(
            "DELETE FROM cache_entries WHERE partition = ?1",
            params![partition],
        )?;
        let removed = tx.execute(
            "DELETE FROM cache_partitions WHERE name = ?1",
            params![partition],
        )?;

        tx.commit().map_err(|e| ToolcacheError::Database {
            message: format!("Failed to delete partition {}: {}", partition, e),
            source: Some(e),
        })?;

        debug!("Deleted partition '{}' ({} entries)", partition, entries);
        Ok(removed > 0)
    }

    fn partition_stats(&self) -> Result<Vec<PartitionStats>> {
        let conn = self.lock()?;

        let mut stmt = conn
            .prepare(
                r#"
                SELECT p.name, p.created_at, COUNT(e.url), COALESCE(SUM(e.size_bytes), 0)
                FROM cache_partitions p
                LEFT JOIN cache_entries e ON e.partition = p.name
                GROUP BY p.name
                ORDER BY p.name
                "#,
            )
            .map_err(|e| ToolcacheError::Database {
                message: format!("Failed to prepare stats query: {}", e),
                source: Some(e),
            })?;

        let stats = stmt
            .query_map([], |row| {
                let name: String = row.get(0)?;
                let created_at: String = row.get(1)?;
                let entry_count: i64 = row.get(2)?;
                let total_size: i64 = row.get(3)?;

                Ok(PartitionStats {
                    name,
                    entry_count: entry_count as usize,
                    total_size_bytes: total_size as u64,
                    created_at: DateTime::parse_from_rfc3339(&created_at)
                        .ok()
                        .map(|dt| dt.with_timezone(&Utc)),
                })
            })?
            .filter_map(|r| r.ok())
            .collect();

        Ok(stats)
    }
}
