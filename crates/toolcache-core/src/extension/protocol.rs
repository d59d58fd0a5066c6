//! Message schema shared by the popup, content script and background contexts.
//!
//! Requests are JSON objects with a `type` discriminator:
//!
//! ```text
//! {"type": "GET_RECENT_TOOLS"}
//! {"type": "ADD_RECENT_TOOL", "toolId": "pdf-merge"}
//! {"type": "OPEN_TOOL", "toolId": "image-compress"}
//! {"type": "CHECK_PDF"}
//! ```
//!
//! Responses carry either a success payload or an `error` string.

use crate::error::{Result, ToolcacheError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

/// A request sent to the background context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Message {
    GetRecentTools,
    AddRecentTool {
        #[serde(rename = "toolId")]
        tool_id: String,
    },
    OpenTool {
        #[serde(rename = "toolId")]
        tool_id: String,
    },
    /// Classify the sender's page URL.
    CheckPdf,
}

impl Message {
    const KNOWN_TYPES: [&'static str; 4] =
        ["GET_RECENT_TOOLS", "ADD_RECENT_TOOL", "OPEN_TOOL", "CHECK_PDF"];

    /// Parse a raw message.
    ///
    /// An unrecognized or missing `type` yields [`ToolcacheError::UnknownMessage`];
    /// a known type with a malformed payload yields [`ToolcacheError::Validation`].
    pub fn parse(raw: &Value) -> Result<Self> {
        let kind = raw.get("type").and_then(Value::as_str).unwrap_or_default();
        if !Self::KNOWN_TYPES.contains(&kind) {
            let shown = if kind.is_empty() { "<missing>" } else { kind };
            return Err(ToolcacheError::UnknownMessage(shown.to_string()));
        }

        serde_json::from_value(raw.clone()).map_err(|e| ToolcacheError::Validation {
            field: "message".to_string(),
            message: format!("invalid {} payload: {}", kind, e),
        })
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Message::GetRecentTools => "GET_RECENT_TOOLS",
            Message::AddRecentTool { .. } => "ADD_RECENT_TOOL",
            Message::OpenTool { .. } => "OPEN_TOOL",
            Message::CheckPdf => "CHECK_PDF",
        }
    }
}

/// Reply sent back to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageResponse {
    RecentTools {
        #[serde(rename = "recentTools")]
        recent_tools: Vec<String>,
    },
    PdfCheck {
        #[serde(rename = "isPdf")]
        is_pdf: bool,
    },
    Ack {
        success: bool,
    },
    Error {
        error: String,
    },
}

impl MessageResponse {
    pub fn error(message: impl Into<String>) -> Self {
        MessageResponse::Error {
            error: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, MessageResponse::Error { .. })
    }
}

impl From<ToolcacheError> for MessageResponse {
    fn from(err: ToolcacheError) -> Self {
        MessageResponse::error(err.to_string())
    }
}

/// Execution context a message originates from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextKind {
    Popup,
    ContentScript,
    Background,
}

/// Who sent a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageSender {
    pub context: ContextKind,
    /// URL of the page the sender runs in. Only content scripts have one.
    #[serde(rename = "tabUrl", default, skip_serializing_if = "Option::is_none")]
    pub tab_url: Option<Url>,
}

impl MessageSender {
    pub fn popup() -> Self {
        Self {
            context: ContextKind::Popup,
            tab_url: None,
        }
    }

    pub fn content_script(tab_url: Url) -> Self {
        Self {
            context: ContextKind::ContentScript,
            tab_url: Some(tab_url),
        }
    }
}
