//! Open pages and the worker version controlling each of them.

use serde::Serialize;
use std::collections::HashMap;
use std::sync::RwLock;
use url::Url;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ClientId(Uuid);

impl ClientId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An open page.
#[derive(Debug, Clone, Serialize)]
pub struct PageClient {
    pub id: ClientId,
    pub url: Url,
    /// Version of the worker controlling this page, if any.
    pub controller: Option<String>,
}

/// Registry of open pages.
#[derive(Debug, Default)]
pub struct Clients {
    pages: RwLock<HashMap<ClientId, PageClient>>,
}

impl Clients {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a newly opened page.
    pub fn connect(&self, url: Url, controller: Option<String>) -> ClientId {
        let id = ClientId::new();
        let client = PageClient {
            id,
            url,
            controller,
        };
        if let Ok(mut pages) = self.pages.write() {
            pages.insert(id, client);
        }
        id
    }

    pub fn disconnect(&self, id: ClientId) -> bool {
        self.pages
            .write()
            .map(|mut pages| pages.remove(&id).is_some())
            .unwrap_or(false)
    }

    pub fn get(&self, id: ClientId) -> Option<PageClient> {
        self.pages.read().ok()?.get(&id).cloned()
    }

    pub fn list(&self) -> Vec<PageClient> {
        self.pages
            .read()
            .map(|pages| pages.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.pages.read().map(|pages| pages.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Make `version` the controller of every open page. Returns the number
    /// of pages whose controller changed.
    pub fn claim(&self, version: &str) -> usize {
        let Ok(mut pages) = self.pages.write() else {
            return 0;
        };
        let mut changed = 0;
        for page in pages.values_mut() {
            if page.controller.as_deref() != Some(version) {
                page.controller = Some(version.to_string());
                changed += 1;
            }
        }
        changed
    }

    pub fn controlled_by(&self, version: &str) -> usize {
        self.pages
            .read()
            .map(|pages| {
                pages
                    .values()
                    .filter(|page| page.controller.as_deref() == Some(version))
                    .count()
            })
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(path: &str) -> Url {
        Url::parse("https://tools.example").unwrap().join(path).unwrap()
    }

    #[test]
    fn test_connect_and_disconnect() {
        let clients = Clients::new();
        let id = clients.connect(url("/hub"), None);

        assert_eq!(clients.len(), 1);
        assert_eq!(clients.get(id).unwrap().url, url("/hub"));
        assert!(clients.disconnect(id));
        assert!(!clients.disconnect(id));
        assert!(clients.is_empty());
    }

    #[test]
    fn test_claim_takes_over_every_page() {
        let clients = Clients::new();
        clients.connect(url("/"), None);
        clients.connect(url("/tools/pdf-merge"), Some("v1".to_string()));
        clients.connect(url("/hub"), Some("v2".to_string()));

        assert_eq!(clients.claim("v2"), 2);
        assert_eq!(clients.controlled_by("v2"), 3);
        assert_eq!(clients.controlled_by("v1"), 0);
        assert_eq!(clients.claim("v2"), 0);
    }
}
