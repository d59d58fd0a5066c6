//! Registration host: tracks the active and waiting worker versions and
//! routes page requests to whichever one is in control.

use super::clients::{ClientId, Clients};
use super::lifecycle::{ActivateReport, CacheWorker, InstallReport, WorkerState};
use crate::cache::{CacheStore, PartitionStats};
use crate::config::WorkerConfig;
use crate::error::Result;
use crate::network::{Fetcher, Request, Response};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};
use url::Url;

/// Result of registering a worker version.
#[derive(Debug, Clone, Serialize)]
pub struct RegisterOutcome {
    pub install: InstallReport,
    /// Present when the new worker took control immediately.
    pub activation: Option<ActivateReport>,
}

/// Snapshot of the registration.
#[derive(Debug, Clone, Serialize)]
pub struct RegistrationStatus {
    pub active: Option<String>,
    pub waiting: Option<String>,
    pub clients: usize,
}

pub struct Registration {
    store: Arc<dyn CacheStore>,
    fetcher: Arc<dyn Fetcher>,
    clients: Arc<Clients>,
    active: RwLock<Option<Arc<CacheWorker>>>,
    waiting: RwLock<Option<Arc<CacheWorker>>>,
}

impl Registration {
    pub fn new(store: Arc<dyn CacheStore>, fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            store,
            fetcher,
            clients: Arc::new(Clients::new()),
            active: RwLock::new(None),
            waiting: RwLock::new(None),
        }
    }

    pub fn clients(&self) -> &Arc<Clients> {
        &self.clients
    }

    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.store
    }

    /// Install a new worker version.
    ///
    /// The worker is promoted right away when it asked to skip waiting or no
    /// worker is active yet; otherwise it waits for [`Registration::promote_waiting`].
    /// An install failure leaves the current worker in control.
    pub async fn register(&self, config: WorkerConfig) -> Result<RegisterOutcome> {
        let worker = Arc::new(CacheWorker::new(
            config,
            self.store.clone(),
            self.fetcher.clone(),
        )?);
        info!("Registering worker {}", worker.version());

        let install = worker.install().await?;

        let has_active = self.active.read().await.is_some();
        if worker.wants_skip_waiting() || !has_active {
            // A newer worker supersedes any version still parked.
            let parked = self.waiting.write().await.take();
            if let Some(parked) = parked {
                debug!(
                    "Waiting worker {} superseded by {}",
                    parked.version(),
                    worker.version()
                );
                parked.set_state(WorkerState::Redundant);
            }
            let activation = self.promote(worker).await;
            return Ok(RegisterOutcome {
                install,
                activation: Some(activation),
            });
        }

        let mut waiting = self.waiting.write().await;
        if let Some(previous) = waiting.replace(worker) {
            previous.set_state(WorkerState::Redundant);
        }
        Ok(RegisterOutcome {
            install,
            activation: None,
        })
    }

    /// Promote the waiting worker, if any.
    pub async fn promote_waiting(&self) -> Option<ActivateReport> {
        let worker = self.waiting.write().await.take()?;
        Some(self.promote(worker).await)
    }

    async fn promote(&self, worker: Arc<CacheWorker>) -> ActivateReport {
        let mut active = self.active.write().await;
        if let Some(previous) = active.take() {
            debug!(
                "Worker {} replaced by {}",
                previous.version(),
                worker.version()
            );
            previous.set_state(WorkerState::Redundant);
        }
        let report = worker.activate(&self.clients);
        *active = Some(worker);
        report
    }

    pub async fn active(&self) -> Option<Arc<CacheWorker>> {
        self.active.read().await.clone()
    }

    pub async fn waiting(&self) -> Option<Arc<CacheWorker>> {
        self.waiting.read().await.clone()
    }

    pub async fn active_version(&self) -> Option<String> {
        self.active()
            .await
            .map(|worker| worker.version().to_string())
    }

    /// Record a page opened under the current controller.
    pub async fn connect_page(&self, url: Url) -> ClientId {
        let controller = self.active_version().await;
        self.clients.connect(url, controller)
    }

    /// Serve a page request through the active worker, or the network when
    /// nothing is active or the worker leaves the request alone.
    pub async fn fetch(&self, request: &Request) -> Result<Response> {
        if let Some(worker) = self.active().await {
            if let Some(response) = worker.handle_fetch(request).await? {
                return Ok(response);
            }
        }
        self.fetcher.fetch(request).await
    }

    pub async fn status(&self) -> RegistrationStatus {
        RegistrationStatus {
            active: self.active_version().await,
            waiting: self
                .waiting()
                .await
                .map(|worker| worker.version().to_string()),
            clients: self.clients.len(),
        }
    }

    pub fn partition_stats(&self) -> Result<Vec<PartitionStats>> {
        self.store.partition_stats()
    }
}
