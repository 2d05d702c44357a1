//! Logbook Site Server Library
//!
//! Serves the single-page site, resolves sessions against the hosted auth
//! provider and exposes the posts feed.

pub mod auth;
pub mod blobs;
pub mod config;
pub mod error;
pub mod pages;
pub mod posts;
pub mod router;

use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use config::{AppState, ServerConfig};
use logbook_feed::ContentStore;

pub use router::router;

/// Install the global tracing subscriber; `RUST_LOG` overrides the `info` default.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .is_err()
    {
        // Already set, ignore
    }
}

/// Log store notifications until the store goes away.
fn spawn_feed_log(store: &Arc<ContentStore>) {
    let mut rx = store.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => debug!("[feed] {:?}", event),
                Err(RecvError::Lagged(n)) => debug!("[feed] skipped {} events", n),
                Err(RecvError::Closed) => break,
            }
        }
    });
}

pub async fn run() -> anyhow::Result<()> {
    init_tracing();

    info!("=== Logbook Server ===");

    let config = ServerConfig::from_env()?;
    info!("Backend: {:?}", config.backend);
    info!("Static directory: {:?}", config.static_dir);

    let state = AppState::build(&config)?;
    spawn_feed_log(&state.store);

    if let Err(e) = state.store.fetch_all().await {
        warn!("Initial posts fetch failed: {}", e);
    } else {
        info!("Loaded {} posts", state.store.items().len());
    }

    let app = router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    info!("Listening on http://{}", config.bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}
