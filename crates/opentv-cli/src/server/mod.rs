//! HTTP surface serving the guide API, playlist, EPG and static assets.

mod error;
mod handlers;

pub use handlers::EPG_PATH;

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use axum::routing::get;
use opentv_guide::XmltvEncoder;
use opentv_source::GuideRefresher;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

/// Shared handler state.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Coalescing guide loader.
    refresher: Arc<GuideRefresher>,
    /// Base URL used when a request carries no host.
    public_url: Arc<str>,
    /// EPG encoder settings.
    epg_encoder: Arc<XmltvEncoder>,
}

impl AppState {
    /// Creates the handler state.
    pub fn new(refresher: GuideRefresher, public_url: &str, epg_encoder: XmltvEncoder) -> Self {
        Self {
            refresher: Arc::new(refresher),
            public_url: Arc::from(public_url),
            epg_encoder: Arc::new(epg_encoder),
        }
    }
}

/// Builds the application router.
pub fn router(state: AppState, assets_dir: &Path) -> Router {
    Router::new()
        .route("/api/channels", get(handlers::channels))
        .route("/api/programs", get(handlers::programs))
        .route("/api/guide", get(handlers::guide))
        .route("/playlist.m3u", get(handlers::playlist))
        .route("/epg.xml", get(handlers::epg))
        .nest_service("/assets", ServeDir::new(assets_dir))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serves `router` on `addr` until Ctrl-C.
///
/// # Errors
///
/// Returns an error if the address cannot be bound or the server fails.
pub async fn serve(addr: SocketAddr, app: Router) -> Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    let local_addr = listener
        .local_addr()
        .context("failed to read listen address")?;
    tracing::info!(%local_addr, "Guide server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server terminated abnormally")?;

    tracing::info!("Guide server stopped");
    Ok(())
}

/// Resolves when Ctrl-C is received.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}
