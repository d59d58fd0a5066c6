//! Error types for the toolcache library.
//!
//! Errors are grouped by the layer that raises them. Most of them never reach
//! a page: the lifecycle code logs and swallows everything except a failure to
//! open the static partition during install.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for toolcache.
#[derive(Debug, Error)]
pub enum ToolcacheError {
    // Network errors
    #[error("Network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<reqwest::Error>,
    },

    #[error("Request timeout after {0:?}")]
    Timeout(std::time::Duration),

    // Storage errors
    #[error("Database error: {message}")]
    Database {
        message: String,
        #[source]
        source: Option<rusqlite::Error>,
    },

    #[error("IO error at {path:?}: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    // Lifecycle errors
    #[error("Install failed for {version}: {message}")]
    InstallFailed { version: String, message: String },

    // Messaging errors
    #[error("Unknown message type: {0}")]
    UnknownMessage(String),

    #[error("Message channel closed before a response was sent")]
    ChannelClosed,

    // Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    // Validation errors
    #[error("Validation error for {field}: {message}")]
    Validation { field: String, message: String },

    #[error("{0}")]
    Other(String),
}

/// Result type alias for toolcache operations.
pub type Result<T> = std::result::Result<T, ToolcacheError>;

impl From<std::io::Error> for ToolcacheError {
    fn from(err: std::io::Error) -> Self {
        ToolcacheError::Io {
            message: err.to_string(),
            path: None,
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for ToolcacheError {
    fn from(err: serde_json::Error) -> Self {
        ToolcacheError::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<rusqlite::Error> for ToolcacheError {
    fn from(err: rusqlite::Error) -> Self {
        ToolcacheError::Database {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl ToolcacheError {
    /// Create an IO error with path context.
    pub fn io_with_path(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        ToolcacheError::Io {
            message: err.to_string(),
            path: Some(path.into()),
            source: Some(err),
        }
    }

    /// Whether the error came from the transport rather than from local state.
    ///
    /// The fetch interceptor only falls back to cached content for these.
    pub fn is_network_failure(&self) -> bool {
        matches!(
            self,
            ToolcacheError::Network { .. } | ToolcacheError::Timeout(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ToolcacheError::UnknownMessage("PING".into());
        assert_eq!(err.to_string(), "Unknown message type: PING");

        let err = ToolcacheError::InstallFailed {
            version: "v2".into(),
            message: "disk full".into(),
        };
        assert_eq!(err.to_string(), "Install failed for v2: disk full");
    }

    #[test]
    fn test_network_failures() {
        assert!(ToolcacheError::Timeout(std::time::Duration::from_secs(5)).is_network_failure());
        assert!(ToolcacheError::Network {
            message: "connection refused".into(),
            source: None,
        }
        .is_network_failure());
        assert!(!ToolcacheError::ChannelClosed.is_network_failure());
    }

    #[test]
    fn test_io_with_path_keeps_path() {
        let err = ToolcacheError::io_with_path(
            std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
            "/tmp/local-storage.json",
        );
        match err {
            ToolcacheError::Io { path, .. } => {
                assert_eq!(path, Some(PathBuf::from("/tmp/local-storage.json")));
            }
            other => panic!("Expected Io, got: {:?}", other),
        }
    }
}
