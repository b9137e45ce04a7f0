//! geoblock - country filtering gateway
//!
//! This is the composition root: it loads the configuration, builds the
//! geoblock layer and serves a placeholder downstream behind it.

use axum::{routing::get, Router};
use geoblock::{load_config, GeoBlockLayer};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing_subscriber::fmt::format::FmtSpan;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration from environment
    let cfg = load_config()?;

    // Setup logging
    let log_level = if cfg.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_span_events(FmtSpan::CLOSE)
        .init();

    tracing::info!("starting geoblock listen={}", cfg.listen_addr);

    // Invalid configuration stops us here, before any request is served
    let geoblock = GeoBlockLayer::new(&cfg)?;

    let app = Router::new()
        .route("/", get(|| async { "ok" }))
        .fallback(|| async { "ok" })
        .layer(geoblock)
        .layer(TraceLayer::new_for_http());

    let listener = TcpListener::bind(&cfg.listen_addr).await?;
    tracing::info!("geoblock listening on {}", cfg.listen_addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("geoblock stopped");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for ctrl+c: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received ctrl+c"),
        _ = terminate => tracing::info!("received SIGTERM"),
    }
}
