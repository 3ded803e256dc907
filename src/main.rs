use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use rmcp::ServiceExt;
use rmcp::transport::stdio;
use tracing_subscriber::EnvFilter;

use family_stays::adapters::file_store::FileStore;
use family_stays::adapters::memory_store::MemoryStore;
use family_stays::adapters::remote::client::RemoteStore;
use family_stays::adapters::synced::SyncedStore;
use family_stays::config::load_config;
use family_stays::config::types::{StorageBackend, StorageConfig};
use family_stays::mcp::server::FamilyStaysMcpServer;
use family_stays::ports::clock::{Clock, FixedClock, SystemClock};
use family_stays::ports::store::BookingStore;
use family_stays::service::BookingService;

fn find_config_path() -> PathBuf {
    if let Some(path) = std::env::var_os("FAMILY_STAYS_CONFIG") {
        return PathBuf::from(path);
    }

    let candidates = [PathBuf::from("config.yaml"), exe_dir().join("config.yaml")];
    for path in &candidates {
        if path.exists() {
            return path.clone();
        }
    }

    candidates[0].clone()
}

fn exe_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// The store handed to the service, plus the synced handle when there is one.
async fn build_store(
    storage: &StorageConfig,
) -> Result<(Arc<dyn BookingStore>, Option<Arc<SyncedStore>>)> {
    match storage.backend {
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage, nothing survives a restart");
            let store: Arc<dyn BookingStore> = Arc::new(MemoryStore::new());
            Ok((store, None))
        }
        StorageBackend::File => {
            let store = FileStore::open(&storage.file_path)
                .await
                .with_context(|| format!("opening {}", storage.file_path))?;
            tracing::info!(path = %storage.file_path, "Using file storage");
            let store: Arc<dyn BookingStore> = Arc::new(store);
            Ok((store, None))
        }
        StorageBackend::Remote => {
            let store = RemoteStore::new(&storage.remote)?;
            tracing::info!(url = %storage.remote.base_url, "Using remote storage");
            let store: Arc<dyn BookingStore> = Arc::new(store);
            Ok((store, None))
        }
        StorageBackend::Synced => {
            let remote = RemoteStore::new(&storage.remote)?;
            let local = FileStore::open(&storage.file_path)
                .await
                .with_context(|| format!("opening {}", storage.file_path))?;
            let mut synced = SyncedStore::new(
                Arc::new(remote),
                Arc::new(local),
                Duration::from_secs(storage.quarantine_secs),
            );
            if let Some(delay) = storage.auto_resync_delay_secs {
                synced = synced.with_auto_resync(Duration::from_secs(delay));
            }
            tracing::info!(
                url = %storage.remote.base_url,
                mirror = %storage.file_path,
                "Using remote storage with a local mirror"
            );
            let synced = Arc::new(synced);
            let store: Arc<dyn BookingStore> = synced.clone();
            Ok((store, Some(synced)))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // stdout carries MCP JSON-RPC
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    tracing::info!("Starting family-stays server");

    let config_path = find_config_path();
    let config = load_config(&config_path)?;

    let (store, synced) = build_store(&config.storage).await?;
    let clock: Arc<dyn Clock> = match config.clock.date_override {
        Some(date) => {
            tracing::warn!(%date, "Clock pinned by configuration");
            Arc::new(FixedClock::new(date))
        }
        None => Arc::new(SystemClock),
    };

    let service = Arc::new(BookingService::new(store, clock, config.policy));
    let mut server = FamilyStaysMcpServer::new(service);
    if let Some(synced) = synced {
        server = server.with_sync(synced);
    }

    let running = server.serve(stdio()).await?;
    running.waiting().await?;

    Ok(())
}
