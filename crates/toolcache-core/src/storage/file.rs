//! JSON file storage with atomic writes.
//!
//! The whole store is one JSON object on disk. Writes go through:
//! 1. Write to temp file with unique PID suffix
//! 2. fsync to ensure data reaches disk
//! 3. Atomic rename to target path

use super::LocalStorage;
use crate::{Result, ToolcacheError};
use serde_json::{Map, Value};
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process;
use tokio::sync::Mutex;
use tracing::debug;

/// Local storage persisted to a single JSON file.
pub struct JsonFileStorage {
    path: PathBuf,
    /// Serializes writers inside this process; each `set` is a
    /// read-modify-write of the whole file.
    write_lock: Mutex<()>,
}

impl JsonFileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<Map<String, Value>> {
        let path = self.path.clone();
        let map = run_blocking(move || read_map(&path)).await??;
        Ok(map.unwrap_or_default())
    }

    async fn store(&self, map: Map<String, Value>) -> Result<()> {
        let path = self.path.clone();
        run_blocking(move || write_map(&path, &map)).await?
    }
}

#[async_trait::async_trait]
impl LocalStorage for JsonFileStorage {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.load().await?.remove(key))
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut map = self.load().await?;
        map.insert(key.to_string(), value);
        self.store(map).await
    }

    async fn remove(&self, key: &str) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        let mut map = self.load().await?;
        let existed = map.remove(key).is_some();
        if existed {
            self.store(map).await?;
        }
        Ok(existed)
    }
}

async fn run_blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ToolcacheError::Other(format!("Storage task failed: {}", e)))
}

/// Read the storage file. Returns `None` if it doesn't exist.
fn read_map(path: &Path) -> Result<Option<Map<String, Value>>> {
    if !path.exists() {
        return Ok(None);
    }

    let mut file = File::open(path).map_err(|e| ToolcacheError::Io {
        message: format!("Failed to open {}", path.display()),
        path: Some(path.to_path_buf()),
        source: Some(e),
    })?;

    let mut contents = String::new();
    file.read_to_string(&mut contents)
        .map_err(|e| ToolcacheError::io_with_path(e, path))?;

    let map = serde_json::from_str(&contents).map_err(|e| ToolcacheError::Json {
        message: format!("Failed to parse {}: {}", path.display(), e),
        source: Some(e),
    })?;

    Ok(Some(map))
}

/// Write the storage file atomically.
fn write_map(path: &Path, map: &Map<String, Value>) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| ToolcacheError::Io {
                message: format!("Failed to create directory {}", parent.display()),
                path: Some(parent.to_path_buf()),
                source: Some(e),
            })?;
        }
    }

    let temp_path = path.with_extension(format!("json.{}.tmp", process::id()));
    let serialized = serde_json::to_string_pretty(map)?;

    {
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)
            .map_err(|e| ToolcacheError::io_with_path(e, &temp_path))?;

        file.write_all(serialized.as_bytes())
            .map_err(|e| ToolcacheError::io_with_path(e, &temp_path))?;
        file.sync_all()
            .map_err(|e| ToolcacheError::io_with_path(e, &temp_path))?;
    }

    fs::rename(&temp_path, path).map_err(|e| ToolcacheError::Io {
        message: format!(
            "Failed to rename {} to {}",
            temp_path.display(),
            path.display()
        ),
        path: Some(path.to_path_buf()),
        source: Some(e),
    })?;

    debug!("Atomically wrote {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_file_reads_empty() {
        let temp_dir = TempDir::new().unwrap();
        let storage = JsonFileStorage::new(temp_dir.path().join("local-storage.json"));

        assert!(storage.get("install_date").await.unwrap().is_none());
        assert!(!storage.path().exists());
    }

    #[tokio::test]
    async fn test_set_persists_across_instances() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("local-storage.json");

        let storage = JsonFileStorage::new(&path);
        storage.set("recent_tools", json!(["a", "b"])).await.unwrap();
        storage.set("install_date", json!("2026-01-01T00:00:00Z")).await.unwrap();

        let reopened = JsonFileStorage::new(&path);
        assert_eq!(
            reopened.get("recent_tools").await.unwrap(),
            Some(json!(["a", "b"]))
        );
        assert_eq!(
            reopened.get("install_date").await.unwrap(),
            Some(json!("2026-01-01T00:00:00Z"))
        );
    }

    #[tokio::test]
    async fn test_remove() {
        let temp_dir = TempDir::new().unwrap();
        let storage = JsonFileStorage::new(temp_dir.path().join("local-storage.json"));

        storage.set("recent_tools", json!([])).await.unwrap();
        assert!(storage.remove("recent_tools").await.unwrap());
        assert!(!storage.remove("recent_tools").await.unwrap());
        assert!(storage.get("recent_tools").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("local-storage.json");
        std::fs::write(&path, "not json").unwrap();

        let storage = JsonFileStorage::new(&path);
        assert!(matches!(
            storage.get("recent_tools").await,
            Err(ToolcacheError::Json { .. })
        ));
    }
}
