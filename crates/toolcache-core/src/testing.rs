//! Test doubles shared by unit tests.

use crate::network::{Fetcher, Request, Response};
use crate::{Result, ToolcacheError};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

/// Fetcher serving canned responses keyed by URL, with a call counter.
#[derive(Default)]
pub(crate) struct StubFetcher {
    routes: Mutex<HashMap<String, (u16, String)>>,
    failing: Mutex<HashSet<String>>,
    offline: AtomicBool,
    calls: AtomicUsize,
}

impl StubFetcher {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn serve(self, url: &str, status: u16, body: &str) -> Self {
        self.routes
            .lock()
            .unwrap()
            .insert(url.to_string(), (status, body.to_string()));
        self
    }

    pub(crate) fn fail(self, url: &str) -> Self {
        self.failing.lock().unwrap().insert(url.to_string());
        self
    }

    pub(crate) fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Fetcher for StubFetcher {
    async fn fetch(&self, request: &Request) -> Result<Response> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let url = request.url().as_str();

        if self.offline.load(Ordering::SeqCst) || self.failing.lock().unwrap().contains(url) {
            return Err(ToolcacheError::Network {
                message: format!("connection refused: {}", url),
                source: None,
            });
        }

        let route = self.routes.lock().unwrap().get(url).cloned();
        Ok(match route {
            Some((status, body)) => Response::new(status, body),
            None => Response::new(404, "not found"),
        })
    }
}

/// Fetcher whose requests never complete.
pub(crate) struct HangingFetcher;

#[async_trait::async_trait]
impl Fetcher for HangingFetcher {
    async fn fetch(&self, _request: &Request) -> Result<Response> {
        futures::future::pending().await
    }
}

/// Tab opener that records every URL it is asked to open.
#[derive(Default)]
pub(crate) struct RecordingTabs {
    opened: Mutex<Vec<url::Url>>,
}

impl RecordingTabs {
    pub(crate) fn opened(&self) -> Vec<url::Url> {
        self.opened.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl crate::extension::TabOpener for RecordingTabs {
    async fn open_tab(&self, url: url::Url) -> Result<()> {
        self.opened.lock().unwrap().push(url);
        Ok(())
    }
}
