//! # notehub-server
//!
//! REST backend for the notehub note-sharing service.
//!
//! This binary provides:
//! - **Accounts**: signup, login, security-password reset
//! - **Channels**: invite-by-code groups with admin-managed membership
//! - **Uploads**: note files pushed to a blob store (a GitHub repository, or
//!   a local directory when no GitHub credentials are configured), credited
//!   to the uploader and optionally attached to a channel
//! - **Library**: every uploaded note, newest first

mod accounts;
mod api;
mod blob_store;
mod channels;
mod config;
mod error;
mod github;
mod notes;
mod quota;
mod uploads;

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::info;
use tracing_subscriber::EnvFilter;

use notehub_store::Database;

use crate::api::AppState;
use crate::blob_store::{BlobStore, LocalBlobStore};
use crate::config::ServerConfig;
use crate::github::GitHubBlobStore;
use crate::quota::QuotaGate;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Initialize tracing (respects RUST_LOG env var)
    // -----------------------------------------------------------------------
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,notehub_server=debug")),
        )
        .init();

    info!("Starting notehub server v{}", env!("CARGO_PKG_VERSION"));

    // -----------------------------------------------------------------------
    // 2. Load configuration
    // -----------------------------------------------------------------------
    let config = ServerConfig::from_env();
    info!(?config, "Loaded configuration");

    // -----------------------------------------------------------------------
    // 3. Initialize subsystems
    // -----------------------------------------------------------------------
    let db = Database::open_at(&config.database_path)?;

    let blob_store: Arc<dyn BlobStore> = match &config.github {
        Some(github) => Arc::new(GitHubBlobStore::new(github.clone())?),
        None => {
            info!("No GitHub credentials configured, using the local blob store");
            Arc::new(
                LocalBlobStore::new(
                    config.blob_storage_path.clone(),
                    config.public_base_url.clone(),
                )
                .await?,
            )
        }
    };

    let http_addr = config.http_addr;
    let app_state = AppState {
        db: Arc::new(Mutex::new(db)),
        blob_store,
        quota: QuotaGate::new(),
        config: Arc::new(config),
    };

    // -----------------------------------------------------------------------
    // 4. Run the HTTP API server (blocks until shutdown)
    // -----------------------------------------------------------------------
    tokio::select! {
        result = api::serve(app_state, http_addr) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "HTTP server failed");
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
