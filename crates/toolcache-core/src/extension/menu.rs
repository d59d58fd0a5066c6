//! Context-menu action map.

use crate::config::ContextMenuEntry;
use std::collections::HashMap;

/// Read-only map from menu item id to tool id, built once at install.
#[derive(Debug, Clone)]
pub struct ContextMenu {
    items: Vec<ContextMenuEntry>,
    actions: HashMap<String, String>,
}

impl ContextMenu {
    pub fn build(entries: &[ContextMenuEntry]) -> Self {
        let actions = entries
            .iter()
            .map(|entry| (entry.id.clone(), entry.tool_id.clone()))
            .collect();
        Self {
            items: entries.to_vec(),
            actions,
        }
    }

    pub fn tool_for(&self, menu_item_id: &str) -> Option<&str> {
        self.actions.get(menu_item_id).map(String::as_str)
    }

    /// Items in display order.
    pub fn items(&self) -> &[ContextMenuEntry] {
        &self.items
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExtensionSettings;

    #[test]
    fn test_default_menu() {
        let menu = ContextMenu::build(&ExtensionSettings::default().context_menu);
        assert_eq!(menu.items().len(), 4);
        assert_eq!(menu.tool_for("merge-pdf"), Some("pdf-merge"));
        assert_eq!(menu.tool_for("check-grammar"), Some("grammar-checker"));
        assert_eq!(menu.tool_for("unknown"), None);
    }
}
