//! Worker lifecycle: install, activate, takeover.
//!
//! # States
//!
//! ```text
//! Installing -> Waiting -> Activating -> Active -> Redundant
//!      |                                             ^
//!      +------------------ install error ------------+
//! ```
//!
//! Install seeds the static partition with all-settled semantics: one failed
//! path is logged and skipped. The only fatal install error is failing to open
//! the static partition, which leaves the previous worker in control.

use super::clients::Clients;
use super::interceptor::FetchInterceptor;
use crate::cache::CacheStore;
use crate::config::WorkerConfig;
use crate::error::{Result, ToolcacheError};
use crate::network::{Fetcher, Request, RequestKey, Response};
use futures::future::join_all;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    Installing,
    Waiting,
    Activating,
    Active,
    Redundant,
}

/// A precache path that could not be stored.
#[derive(Debug, Clone, Serialize)]
pub struct SeedFailure {
    pub path: String,
    pub reason: String,
}

/// Outcome of a completed install.
#[derive(Debug, Clone, Serialize)]
pub struct InstallReport {
    pub version: String,
    pub cached: Vec<String>,
    pub failed: Vec<SeedFailure>,
}

/// Outcome of an activation.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ActivateReport {
    pub deleted: Vec<String>,
    /// Stale partitions whose deletion failed; left behind until the next activation.
    pub failed: Vec<String>,
    pub claimed_clients: usize,
}

/// One version of the caching worker.
pub struct CacheWorker {
    config: Arc<WorkerConfig>,
    store: Arc<dyn CacheStore>,
    fetcher: Arc<dyn Fetcher>,
    interceptor: FetchInterceptor,
    state: watch::Sender<WorkerState>,
    skip_waiting: AtomicBool,
}

impl CacheWorker {
    pub fn new(
        config: WorkerConfig,
        store: Arc<dyn CacheStore>,
        fetcher: Arc<dyn Fetcher>,
    ) -> Result<Self> {
        config.validate()?;
        let config = Arc::new(config);
        let interceptor = FetchInterceptor::new(config.clone(), store.clone(), fetcher.clone())?;
        let (state, _) = watch::channel(WorkerState::Installing);

        Ok(Self {
            config,
            store,
            fetcher,
            interceptor,
            state,
            skip_waiting: AtomicBool::new(false),
        })
    }

    pub fn version(&self) -> &str {
        &self.config.version
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    pub fn state(&self) -> WorkerState {
        *self.state.borrow()
    }

    /// Observe state transitions.
    pub fn subscribe(&self) -> watch::Receiver<WorkerState> {
        self.state.subscribe()
    }

    pub(crate) fn set_state(&self, state: WorkerState) {
        let previous = self.state.send_replace(state);
        if previous != state {
            debug!("Worker {}: {:?} -> {:?}", self.version(), previous, state);
        }
    }

    /// Ask to be promoted past the waiting state.
    pub fn skip_waiting(&self) {
        self.skip_waiting.store(true, Ordering::SeqCst);
    }

    pub fn wants_skip_waiting(&self) -> bool {
        self.skip_waiting.load(Ordering::SeqCst)
    }

    /// Seed the static partition.
    ///
    /// Each manifest path is fetched independently and all of them are awaited
    /// before returning. Failed paths end up in `InstallReport::failed`.
    pub async fn install(&self) -> Result<InstallReport> {
        self.set_state(WorkerState::Installing);
        let partition = self.config.static_partition();

        if let Err(e) = self.store.open(&partition) {
            self.set_state(WorkerState::Redundant);
            return Err(ToolcacheError::InstallFailed {
                version: self.config.version.clone(),
                message: format!("cannot open {}: {}", partition, e),
            });
        }

        let partition = partition.as_str();
        let seeds = self
            .config
            .precache
            .iter()
            .map(|path| async move { (path.clone(), self.seed(partition, path).await) });
        let results = join_all(seeds).await;

        let mut report = InstallReport {
            version: self.config.version.clone(),
            cached: Vec::new(),
            failed: Vec::new(),
        };
        for (path, result) in results {
            match result {
                Ok(()) => report.cached.push(path),
                Err(e) => {
                    warn!("Failed to precache {}: {}", path, e);
                    report.failed.push(SeedFailure {
                        path,
                        reason: e.to_string(),
                    });
                }
            }
        }

        info!(
            "Installed worker {} ({} cached, {} failed)",
            self.config.version,
            report.cached.len(),
            report.failed.len()
        );

        self.set_state(WorkerState::Waiting);
        if self.config.skip_waiting {
            self.skip_waiting();
        }

        Ok(report)
    }

    async fn seed(&self, partition: &str, path: &str) -> Result<()> {
        let url = self.config.resolve(path)?;
        let request = Request::get(url);
        let response = self.fetcher.fetch(&request).await?;

        if !response.is_cacheable() {
            return Err(ToolcacheError::Network {
                message: format!("unexpected status {}", response.status()),
                source: None,
            });
        }

        self.store.put(partition, &request.key(), response)
    }

    /// Delete partitions from other versions, then take over every open page.
    ///
    /// Never fails: a partition that cannot be deleted is logged and reported.
    pub fn activate(&self, clients: &Clients) -> ActivateReport {
        self.set_state(WorkerState::Activating);
        let mut report = ActivateReport::default();

        match self.store.partition_names() {
            Ok(names) => {
                for name in names {
                    if self.config.is_current_partition(&name) {
                        continue;
                    }
                    match self.store.delete(&name) {
                        Ok(_) => {
                            debug!("Deleted stale partition {}", name);
                            report.deleted.push(name);
                        }
                        Err(e) => {
                            warn!("Failed to delete stale partition {}: {}", name, e);
                            report.failed.push(name);
                        }
                    }
                }
            }
            Err(e) => warn!("Failed to list partitions during activation: {}", e),
        }

        report.claimed_clients = clients.claim(&self.config.version);
        self.set_state(WorkerState::Active);

        info!(
            "Activated worker {} (deleted {} stale partitions, claimed {} clients)",
            self.config.version,
            report.deleted.len(),
            report.claimed_clients
        );

        report
    }

    /// Handle a page request. `Ok(None)` means the host should fetch it itself.
    ///
    /// Only an active worker intercepts requests.
    pub async fn handle_fetch(&self, request: &Request) -> Result<Option<Response>> {
        if self.state() != WorkerState::Active {
            return Ok(None);
        }
        self.interceptor.handle(request).await
    }

    /// Whether the static partition holds an entry for a site path.
    pub fn is_precached(&self, path: &str) -> Result<bool> {
        let key = RequestKey::get(&self.config.resolve(path)?);
        self.store.has(&self.config.static_partition(), &key)
    }
}
