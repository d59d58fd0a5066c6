//! Tab opener for a headless host: records and logs the URLs it is asked to open.

use serde::Serialize;
use std::sync::Mutex;
use toolcache_core::{Result, TabOpener, ToolcacheError};
use tracing::info;
use url::Url;

#[derive(Debug, Clone, Serialize)]
pub struct OpenedTab {
    pub index: usize,
    pub url: Url,
}

#[derive(Debug, Default)]
pub struct TabRecorder {
    opened: Mutex<Vec<Url>>,
}

impl TabRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn list(&self) -> Vec<OpenedTab> {
        self.opened
            .lock()
            .map(|opened| {
                opened
                    .iter()
                    .enumerate()
                    .map(|(index, url)| OpenedTab {
                        index,
                        url: url.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl TabOpener for TabRecorder {
    async fn open_tab(&self, url: Url) -> Result<()> {
        info!("Open tab: {}", url);
        self.opened
            .lock()
            .map_err(|_| ToolcacheError::Other("tab list lock poisoned".to_string()))?
            .push(url);
        Ok(())
    }
}
