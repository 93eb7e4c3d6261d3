//! Veilvote Core
//!
//! Main entry point for the anonymous vote-casting service.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      Veilvote Core                              │
//! │                                                                  │
//! │  ┌─────────────┐  ┌──────────────┐  ┌────────────────────────┐  │
//! │  │  HTTP API   │  │ Proof Issuer │  │  Vote Cast Controller  │  │
//! │  │  (axum)     │  │ (roster tree)│  │  (protocol guards)     │  │
//! │  └──────┬──────┘  └──────┬───────┘  └───────────┬────────────┘  │
//! │         │                │                      │               │
//! │         ▼                ▼                      ▼               │
//! │  ┌───────────┐  ┌──────────────┐  ┌──────────────────────────┐  │
//! │  │  RocksDB  │  │  Tree Cache  │  │     External Ledger      │  │
//! │  │  (votes)  │  │ (gen + TTL)  │  │     (HTTP client)        │  │
//! │  └───────────┘  └──────────────┘  └──────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use log::info;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::RwLock;

use crate::api::{ApiState, create_router};
use crate::config::{LedgerModeToml, VeilvoteConfig};
use crate::storage::RocksDbStore;
use crate::voting::{
    HttpLedger, Ledger, MockLedger, ProofIssuer, RosterRegistry, TreeCache, VoteCastController,
};

mod api;
mod config;
mod errors;
mod storage;
mod voting;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    env_logger::init();

    // Load configuration
    let config = VeilvoteConfig::load()?;

    info!("============================================");
    info!(
        "          VEILVOTE CORE v{}                ",
        env!("CARGO_PKG_VERSION")
    );
    info!("============================================");
    info!("DB path         : {}", config.database.path);
    info!("API             : {}:{}", config.api.host, config.api.port);
    info!("Ledger mode     : {:?}", config.ledger.mode);
    info!("Ledger URL      : {}", config.ledger.url);
    info!("Nullifier scope : {:?}", config.protocol.nullifier_scope);
    info!("Tree cache TTL  : {}s", config.protocol.tree_cache_ttl_secs);
    info!("============================================");

    // Open database
    let store = RocksDbStore::open(&config.database.path).context("failed to open RocksDB")?;
    info!("Database opened at {}", config.database.path);

    // Restore the voter roster
    let persisted = store.load_roster().context("failed to load roster")?;
    let registry = RosterRegistry::restore(persisted);
    info!("Roster restored: {} voters", registry.len());
    let registry = Arc::new(RwLock::new(registry));

    // Build services
    let cache = Arc::new(TreeCache::new(Duration::from_secs(
        config.protocol.tree_cache_ttl_secs,
    )));
    let issuer = Arc::new(ProofIssuer::new(registry.clone(), cache.clone()));

    let ledger = match config.ledger.mode {
        LedgerModeToml::Http => Ledger::Http(HttpLedger::new(
            &config.ledger.url,
            Duration::from_secs(config.ledger.timeout_secs),
        )?),
        LedgerModeToml::Mock => Ledger::Mock(MockLedger::new()),
    };

    let controller = Arc::new(VoteCastController::new(
        store.clone(),
        ProofIssuer::new(registry.clone(), cache.clone()),
        Arc::new(ledger),
        config.protocol.nullifier_scope,
    ));

    let state = ApiState {
        store,
        registry,
        cache,
        issuer,
        controller,
        start_time: std::time::Instant::now(),
    };

    // Serve
    let addr = format!("{}:{}", config.api.host, config.api.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("HTTP API listening on {addr}");

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        log::error!("failed to listen for shutdown signal: {e}");
    }
    info!("shutdown signal received");
}
