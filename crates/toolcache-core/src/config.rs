//! Centralized configuration for toolcache.
//!
//! Fixed parameters live in unit structs with associated constants. Values
//! that differ between deployments (site origin, cache version, manifest) are
//! carried by [`WorkerConfig`] and [`ExtensionSettings`], which are passed to
//! the components at construction time so several versions can coexist.

use crate::error::{Result, ToolcacheError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Extension-level constants.
pub struct ExtensionConfig;

impl ExtensionConfig {
    pub const MAX_RECENT_TOOLS: usize = 3;
    pub const RECENT_TOOLS_KEY: &'static str = "recent_tools";
    pub const INSTALL_DATE_KEY: &'static str = "install_date";
    pub const MESSAGE_CHANNEL_CAPACITY: usize = 64;
}

/// Network-related configuration.
pub struct NetworkConfig;

impl NetworkConfig {
    pub const USER_AGENT: &'static str = "toolcache/0.3";
    pub const DEFAULT_ORIGIN: &'static str = "http://localhost:4321";
}

/// File names used under the data directory.
pub struct PathsConfig;

impl PathsConfig {
    pub const DATA_DIR_NAME: &'static str = "toolcache";
    pub const CACHE_DB_FILENAME: &'static str = "cache.sqlite";
    pub const LOCAL_STORAGE_FILENAME: &'static str = "local-storage.json";
}

/// Role tag of a cache partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartitionRole {
    Static,
    Dynamic,
}

impl PartitionRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            PartitionRole::Static => "static",
            PartitionRole::Dynamic => "dynamic",
        }
    }
}

impl std::fmt::Display for PartitionRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Configuration for one worker version.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct WorkerConfig {
    /// Origin the worker controls. Requests to any other origin are not intercepted.
    pub origin: Url,
    /// Version tag appended to partition names.
    pub version: String,
    /// Paths seeded into the static partition on install.
    pub precache: Vec<String>,
    /// Requests under this prefix always go to the network.
    pub api_prefix: String,
    /// Tool pages live under this prefix and are cached in the dynamic partition.
    pub tool_prefix: String,
    /// File extensions cached in the dynamic partition.
    pub asset_extensions: Vec<String>,
    /// Page served for failed navigations.
    pub offline_page: String,
    /// Optional timeout for network fetches, in seconds. `None` waits forever.
    pub fetch_timeout_secs: Option<u64>,
    /// Promote the worker past the waiting state right after install.
    pub skip_waiting: bool,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            origin: default_origin(),
            version: "v1".to_string(),
            precache: ["/", "/hub", "/offline", "/favicon.svg", "/manifest.json"]
                .into_iter()
                .map(String::from)
                .collect(),
            api_prefix: "/api/".to_string(),
            tool_prefix: "/tools/".to_string(),
            asset_extensions: [
                "js", "css", "woff", "woff2", "ttf", "png", "jpg", "jpeg", "gif", "svg", "webp",
                "ico",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            offline_page: "/offline".to_string(),
            fetch_timeout_secs: None,
            skip_waiting: true,
        }
    }
}

impl WorkerConfig {
    /// Create a config for the given origin and version with default routing.
    pub fn new(origin: Url, version: impl Into<String>) -> Self {
        Self {
            origin,
            version: version.into(),
            ..Self::default()
        }
    }

    /// Name of the partition for a role under this version.
    pub fn partition_name(&self, role: PartitionRole) -> String {
        format!("{}-{}", role.as_str(), self.version)
    }

    pub fn static_partition(&self) -> String {
        self.partition_name(PartitionRole::Static)
    }

    pub fn dynamic_partition(&self) -> String {
        self.partition_name(PartitionRole::Dynamic)
    }

    /// Whether a partition belongs to this version.
    pub fn is_current_partition(&self, name: &str) -> bool {
        name == self.static_partition() || name == self.dynamic_partition()
    }

    /// Resolve a site path against the origin.
    pub fn resolve(&self, path: &str) -> Result<Url> {
        self.origin.join(path).map_err(|e| ToolcacheError::Config {
            message: format!("Invalid path '{}' for origin {}: {}", path, self.origin, e),
        })
    }

    pub fn offline_url(&self) -> Result<Url> {
        self.resolve(&self.offline_page)
    }

    pub fn fetch_timeout(&self) -> Option<Duration> {
        self.fetch_timeout_secs.map(Duration::from_secs)
    }

    /// Check invariants that the rest of the crate relies on.
    pub fn validate(&self) -> Result<()> {
        if self.version.trim().is_empty() {
            return Err(ToolcacheError::Validation {
                field: "version".to_string(),
                message: "cache version must not be empty".to_string(),
            });
        }
        if self.origin.cannot_be_a_base() {
            return Err(ToolcacheError::Validation {
                field: "origin".to_string(),
                message: format!("{} is not a valid origin", self.origin),
            });
        }
        for path in self
            .precache
            .iter()
            .chain([&self.api_prefix, &self.tool_prefix, &self.offline_page])
        {
            if !path.starts_with('/') {
                return Err(ToolcacheError::Validation {
                    field: "path".to_string(),
                    message: format!("'{}' must start with '/'", path),
                });
            }
        }
        Ok(())
    }
}

/// One context-menu item mapped to a tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextMenuEntry {
    pub id: String,
    pub title: String,
    pub tool_id: String,
}

impl ContextMenuEntry {
    fn new(id: &str, title: &str, tool_id: &str) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            tool_id: tool_id.to_string(),
        }
    }
}

/// Settings for the extension background context.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case", deny_unknown_fields)]
pub struct ExtensionSettings {
    /// Base URL of the site; tool pages are opened relative to it.
    pub site_url: Url,
    /// Path prefix of tool pages.
    pub tool_prefix: String,
    pub context_menu: Vec<ContextMenuEntry>,
}

impl Default for ExtensionSettings {
    fn default() -> Self {
        Self {
            site_url: default_origin(),
            tool_prefix: "/tools/".to_string(),
            context_menu: vec![
                ContextMenuEntry::new("merge-pdf", "Merge PDF files", "pdf-merge"),
                ContextMenuEntry::new("compress-image", "Compress image", "image-compress"),
                ContextMenuEntry::new("check-grammar", "Check grammar", "grammar-checker"),
                ContextMenuEntry::new("summarize-text", "Summarize text", "text-summarization"),
            ],
        }
    }
}

impl ExtensionSettings {
    /// URL of a tool page.
    pub fn tool_url(&self, tool_id: &str) -> Result<Url> {
        if tool_id.is_empty() || tool_id.contains(['/', '?', '#']) {
            return Err(ToolcacheError::Validation {
                field: "toolId".to_string(),
                message: format!("invalid tool id '{}'", tool_id),
            });
        }
        let path = format!("{}{}", self.tool_prefix, tool_id);
        self.site_url.join(&path).map_err(|e| ToolcacheError::Config {
            message: format!("Invalid tool path '{}': {}", path, e),
        })
    }
}

/// Top-level configuration file layout.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolcacheConfig {
    pub worker: WorkerConfig,
    pub extension: ExtensionSettings,
}

impl ToolcacheConfig {
    /// Load a configuration file. Missing sections fall back to defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| ToolcacheError::io_with_path(e, path))?;
        let config: Self = serde_json::from_str(&contents).map_err(|e| ToolcacheError::Config {
            message: format!("Failed to parse {}: {}", path.display(), e),
        })?;
        config.worker.validate()?;
        Ok(config)
    }
}

fn default_origin() -> Url {
    Url::parse(NetworkConfig::DEFAULT_ORIGIN).expect("DEFAULT_ORIGIN is a valid URL")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partition_names_follow_version() {
        let config = WorkerConfig::new(Url::parse("https://tools.example").unwrap(), "v2");
        assert_eq!(config.static_partition(), "static-v2");
        assert_eq!(config.dynamic_partition(), "dynamic-v2");
        assert!(config.is_current_partition("dynamic-v2"));
        assert!(!config.is_current_partition("static-v1"));
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = WorkerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.fetch_timeout(), None);
        assert_eq!(
            config.offline_url().unwrap().as_str(),
            "http://localhost:4321/offline"
        );
    }

    #[test]
    fn test_validate_rejects_relative_paths() {
        let mut config = WorkerConfig::default();
        config.precache.push("hub".to_string());
        assert!(config.validate().is_err());

        let mut config = WorkerConfig::default();
        config.version = " ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_tool_url() {
        let settings = ExtensionSettings::default();
        assert_eq!(
            settings.tool_url("pdf-merge").unwrap().as_str(),
            "http://localhost:4321/tools/pdf-merge"
        );
        assert!(settings.tool_url("").is_err());
        assert!(settings.tool_url("../admin").is_err());
    }

    #[test]
    fn test_config_file_partial_sections() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("toolcache.json");
        std::fs::write(
            &path,
            r#"{"worker": {"origin": "https://tools.example/", "version": "v7"}}"#,
        )
        .unwrap();

        let config = ToolcacheConfig::from_file(&path).unwrap();
        assert_eq!(config.worker.version, "v7");
        assert_eq!(config.worker.api_prefix, "/api/");
        assert_eq!(config.extension.tool_prefix, "/tools/");
    }

    #[test]
    fn test_config_file_cannot_change_recent_bound() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("toolcache.json");
        std::fs::write(&path, r#"{"extension": {"max_recent_tools": 0}}"#).unwrap();

        assert!(matches!(
            ToolcacheConfig::from_file(&path),
            Err(ToolcacheError::Config { .. })
        ));
    }
}
