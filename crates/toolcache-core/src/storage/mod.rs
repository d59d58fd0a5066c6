//! Durable key-value storage for extension state.
//!
//! Separate from the response cache. Holds small JSON values such as the
//! recent-tool list and the install date.

mod file;
mod memory;

pub use file::JsonFileStorage;
pub use memory::MemoryStorage;

use crate::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// Async key → JSON value storage shared by the extension contexts.
///
/// Every call is a suspension point. There are no transactions: a caller
/// that reads, modifies and writes back a value can race with another
/// caller doing the same.
#[async_trait::async_trait]
pub trait LocalStorage: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    async fn set(&self, key: &str, value: Value) -> Result<()>;

    /// Returns `true` if the key existed.
    async fn remove(&self, key: &str) -> Result<bool>;
}

/// Read a value and deserialize it.
pub async fn get_json<T, S>(storage: &S, key: &str) -> Result<Option<T>>
where
    T: DeserializeOwned,
    S: LocalStorage + ?Sized,
{
    match storage.get(key).await? {
        Some(value) => Ok(Some(serde_json::from_value(value)?)),
        None => Ok(None),
    }
}

/// Serialize a value and store it.
pub async fn set_json<T, S>(storage: &S, key: &str, value: &T) -> Result<()>
where
    T: Serialize + ?Sized,
    S: LocalStorage + ?Sized,
{
    storage.set(key, serde_json::to_value(value)?).await
}
