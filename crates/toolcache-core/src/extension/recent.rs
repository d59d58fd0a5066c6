//! Bounded most-recent-first list of tool ids.

use crate::config::ExtensionConfig;
use crate::error::Result;
use crate::storage::{get_json, set_json, LocalStorage};
use std::sync::Arc;
use tracing::debug;

/// Move `tool_id` to the front of `list` and keep at most `max` entries.
pub fn push_recent(list: &mut Vec<String>, tool_id: &str, max: usize) {
    list.retain(|id| id != tool_id);
    list.insert(0, tool_id.to_string());
    list.truncate(max);
}

/// The recent-tool list persisted in local storage, bounded to
/// [`ExtensionConfig::MAX_RECENT_TOOLS`] entries.
///
/// `add` is a plain read-modify-write across two storage calls. Two
/// overlapping adds can both read the same list and the later write wins,
/// dropping the other id.
#[derive(Clone)]
pub struct RecentTools {
    storage: Arc<dyn LocalStorage>,
}

impl RecentTools {
    pub fn new(storage: Arc<dyn LocalStorage>) -> Self {
        Self { storage }
    }

    /// Current list; empty when nothing has been stored yet.
    pub async fn list(&self) -> Result<Vec<String>> {
        Ok(get_json(self.storage.as_ref(), ExtensionConfig::RECENT_TOOLS_KEY)
            .await?
            .unwrap_or_default())
    }

    /// Record a tool as opened and return the updated list.
    pub async fn add(&self, tool_id: &str) -> Result<Vec<String>> {
        let mut list = self.list().await?;
        push_recent(&mut list, tool_id, ExtensionConfig::MAX_RECENT_TOOLS);
        set_json(self.storage.as_ref(), ExtensionConfig::RECENT_TOOLS_KEY, &list).await?;
        debug!("Recent tools: {:?}", list);
        Ok(list)
    }

    /// Store an empty list if none exists. Returns `true` if it wrote one.
    pub async fn ensure_initialized(&self) -> Result<bool> {
        if self
            .storage
            .get(ExtensionConfig::RECENT_TOOLS_KEY)
            .await?
            .is_some()
        {
            return Ok(false);
        }
        set_json(
            self.storage.as_ref(),
            ExtensionConfig::RECENT_TOOLS_KEY,
            &Vec::<String>::new(),
        )
        .await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    fn ids(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_push_recent_moves_to_front() {
        let mut list = ids(&["c", "b", "a"]);
        push_recent(&mut list, "a", 3);
        assert_eq!(list, ids(&["a", "c", "b"]));
    }

    #[test]
    fn test_push_recent_truncates() {
        let mut list = Vec::new();
        for id in ["a", "b", "c", "d", "e"] {
            push_recent(&mut list, id, 3);
        }
        assert_eq!(list, ids(&["e", "d", "c"]));
    }

    #[tokio::test]
    async fn test_add_persists() {
        let storage = Arc::new(MemoryStorage::new());
        let recent = RecentTools::new(storage.clone());

        assert!(recent.list().await.unwrap().is_empty());
        recent.add("pdf-merge").await.unwrap();
        let list = recent.add("image-compress").await.unwrap();

        assert_eq!(list, ids(&["image-compress", "pdf-merge"]));
        let reloaded = RecentTools::new(storage);
        assert_eq!(reloaded.list().await.unwrap(), list);
    }

    #[tokio::test]
    async fn test_ensure_initialized_keeps_existing() {
        let recent = RecentTools::new(Arc::new(MemoryStorage::new()));
        assert!(recent.ensure_initialized().await.unwrap());
        recent.add("grammar-checker").await.unwrap();
        assert!(!recent.ensure_initialized().await.unwrap());
        assert_eq!(recent.list().await.unwrap(), ids(&["grammar-checker"]));
    }

    #[tokio::test]
    async fn test_add_keeps_three_most_recent() {
        let recent = RecentTools::new(Arc::new(MemoryStorage::new()));
        for id in ["a", "b", "c", "d"] {
            recent.add(id).await.unwrap();
        }
        assert_eq!(recent.list().await.unwrap(), ids(&["d", "c", "b"]));
    }
}
