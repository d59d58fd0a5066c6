//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use toolcache_core::{Fetcher, Request, Response, Result, ToolcacheError, WorkerConfig};
use url::Url;

pub const ORIGIN: &str = "https://freetools.example";

pub fn site_url(path: &str) -> Url {
    Url::parse(ORIGIN).unwrap().join(path).unwrap()
}

pub fn worker_config(version: &str, precache: &[&str]) -> WorkerConfig {
    let mut config = WorkerConfig::new(Url::parse(ORIGIN).unwrap(), version);
    config.precache = precache.iter().map(|p| p.to_string()).collect();
    config
}

/// A fake site: paths on [`ORIGIN`] with fixed responses, anything else 404.
#[derive(Default)]
pub struct FakeSite {
    pages: Mutex<HashMap<String, (u16, String)>>,
    unreachable: Mutex<HashSet<String>>,
    offline: AtomicBool,
    fetches: AtomicUsize,
}

impl FakeSite {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(self, path: &str, body: &str) -> Self {
        self.respond(path, 200, body)
    }

    pub fn respond(self, path: &str, status: u16, body: &str) -> Self {
        self.pages
            .lock()
            .unwrap()
            .insert(site_url(path).to_string(), (status, body.to_string()));
        self
    }

    /// Requests to this path fail at the transport level.
    pub fn unreachable(self, path: &str) -> Self {
        self.unreachable
            .lock()
            .unwrap()
            .insert(site_url(path).to_string());
        self
    }

    pub fn go_offline(&self) {
        self.offline.store(true, Ordering::SeqCst);
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Fetcher for FakeSite {
    async fn fetch(&self, request: &Request) -> Result<Response> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let url = request.url().to_string();

        if self.offline.load(Ordering::SeqCst) || self.unreachable.lock().unwrap().contains(&url) {
            return Err(ToolcacheError::Network {
                message: format!("failed to reach {}", url),
                source: None,
            });
        }

        Ok(match self.pages.lock().unwrap().get(&url) {
            Some((status, body)) => Response::new(*status, body.clone()),
            None => Response::new(404, "Not Found"),
        })
    }
}
