//! Toolcache RPC - local host for the caching worker and extension messenger.
//!
//! Serves site pages through the worker's cache policy and exposes the
//! extension message protocol over HTTP for the popup and content scripts.

mod handler;
mod server;
mod tabs;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tabs::TabRecorder;
use toolcache_core::config::PathsConfig;
use toolcache_core::{
    spawn_background, Background, HttpFetcher, JsonFileStorage, Registration, SqliteCacheStore,
    ToolcacheConfig,
};
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;
use url::Url;

#[derive(Parser, Debug)]
#[command(name = "toolcache-rpc")]
#[command(about = "Offline cache host for the free tools site")]
struct Args {
    /// Port to listen on (0 = auto-assign)
    #[arg(short, long, default_value = "0")]
    port: u16,

    /// Host to bind to
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Site origin the worker serves (overrides the config file)
    #[arg(long)]
    origin: Option<Url>,

    /// Cache version tag (overrides the config file)
    #[arg(long)]
    cache_version: Option<String>,

    /// Directory for the cache database and local storage
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Set up logging
    let log_level = if args.debug { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .init();

    info!("Starting Toolcache RPC Server");

    let mut config = match &args.config {
        Some(path) => ToolcacheConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => ToolcacheConfig::default(),
    };
    if let Some(origin) = args.origin {
        config.extension.site_url = origin.clone();
        config.worker.origin = origin;
    }
    if let Some(version) = args.cache_version {
        config.worker.version = version;
    }
    config.worker.validate()?;

    let data_dir = match args.data_dir {
        Some(path) => path,
        None => dirs::data_dir()
            .map(|dir| dir.join(PathsConfig::DATA_DIR_NAME))
            .context("no data directory available; pass --data-dir")?,
    };
    info!("Data directory: {}", data_dir.display());

    let store = Arc::new(SqliteCacheStore::new(
        data_dir.join(PathsConfig::CACHE_DB_FILENAME),
    )?);
    let fetcher = Arc::new(HttpFetcher::with_timeout(config.worker.fetch_timeout())?);
    let registration = Registration::new(store, fetcher);

    let origin = config.worker.origin.clone();
    match registration.register(config.worker).await {
        Ok(outcome) => info!(
            "Worker {} installed ({} precached, {} failed)",
            outcome.install.version,
            outcome.install.cached.len(),
            outcome.install.failed.len()
        ),
        // The host keeps running; requests go straight to the network.
        Err(e) => error!("Worker registration failed: {}", e),
    }

    let storage = Arc::new(JsonFileStorage::new(
        data_dir.join(PathsConfig::LOCAL_STORAGE_FILENAME),
    ));
    let tabs = Arc::new(TabRecorder::new());
    let background = Background::new(config.extension, storage, tabs.clone());
    background.on_installed().await?;
    let messenger = spawn_background(Arc::new(background.clone()));

    let state = Arc::new(server::AppState {
        registration,
        background,
        messenger,
        tabs,
        origin,
    });

    let addr = server::start_server(state, &args.host, args.port).await?;

    // Print port for the launcher script to read (intentional stdout)
    println!("TOOLCACHE_PORT={}", addr.port());

    info!("Toolcache server running on {}", addr);

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received, exiting");

    Ok(())
}
