//! # NoteX Sync
//!
//! Keeps a local NoteX store warm and flushes offline changes when the API
//! comes back.
//!
//! ## Behaviour
//!
//! - Primes the cache with the current user and notes when a token is set
//! - Polls `/health` every `NOTEX_POLL_INTERVAL_SECS`
//! - Replays the offline queue after every reconnect
//!
//! ## Usage
//!
//! ```bash
//! NOTEX_STORE_PATH=~/.notex/store.json cargo run -p notex-sync
//! ```

use notex_sync::{
    client::OfflineClient,
    config::SyncConfig,
    monitor::ConnectivityMonitor,
    store::OfflineStore,
    transport::{ApiRequest, HttpTransport},
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "notex_sync=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("NoteX Sync v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = SyncConfig::from_env()?;

    let store = match &config.store_path {
        Some(path) => OfflineStore::open(path).await?,
        None => {
            tracing::warn!("NOTEX_STORE_PATH not set, offline data will not survive a restart");
            OfflineStore::in_memory()
        }
    };

    let transport = HttpTransport::new(config.api_url.clone(), config.access_token.clone())?;
    let client = OfflineClient::new(Arc::new(transport), Arc::new(store));

    if config.access_token.is_some() {
        for request in [ApiRequest::get("/api/auth/me"), ApiRequest::get("/api/notes")] {
            match client.send(&request).await {
                Ok(response) if response.is_success() => {}
                Ok(response) => {
                    tracing::warn!(path = %request.path, status = response.status, "Cache priming rejected")
                }
                Err(e) => tracing::warn!(path = %request.path, error = %e, "Cache priming failed"),
            }
        }
    }

    let monitor = ConnectivityMonitor::new(client, config.poll_interval());
    let shutdown = monitor.shutdown_token();

    let handle = tokio::spawn(async move { monitor.run().await });

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received, stopping monitor...");
    shutdown.cancel();
    handle.await?;

    Ok(())
}
