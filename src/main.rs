//! CreatorFeed Engine
//!
//! HTTP service for paywall entitlements and the Explore page.
//!
//! # Architecture
//!
//! - **Snapshot Store**: Viewer and candidate snapshots (JSON fixture)
//! - **Entitlement Resolver**: Locked/unlocked state for each post
//! - **Explore Ranker**: Trending, Rising Stars, For You and category buckets
//! - **API Server**: REST endpoints for frontend consumption
//!
//! # Graceful Shutdown
//!
//! SIGTERM and SIGINT stop accepting connections; in-flight requests finish
//! before the process exits. Ranking holds no state to flush.

use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use creatorfeed::api::{self, AppState, ServerOptions};
use creatorfeed::{Config, FixtureStore, Ranker, Result, SnapshotStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with structured logging
    init_tracing();

    info!("═══════════════════════════════════════════════════════════════");
    info!("  🚀 CreatorFeed Engine v{}", env!("CARGO_PKG_VERSION"));
    info!("═══════════════════════════════════════════════════════════════");

    // Load configuration
    let config = Config::from_env()?;
    info!("✅ Configuration loaded and validated");

    #[cfg(feature = "prometheus")]
    init_metrics_exporter(config.metrics.port);

    let store: Arc<dyn SnapshotStore> = match &config.store.fixture_path {
        Some(path) => Arc::new(FixtureStore::from_path(path)?),
        None => {
            warn!("⚠️ No SNAPSHOT_FIXTURE_PATH set, serving an empty store");
            Arc::new(FixtureStore::default())
        }
    };

    let state = Arc::new(AppState::new(Ranker::new(config.ranker.clone()), store));
    let options = ServerOptions {
        host: config.api.host.clone(),
        port: config.api.port,
        request_timeout: config.api.request_timeout,
        cors_enabled: config.api.cors_enabled,
    };

    info!("  📡 API: http://{}:{}", config.api.host, config.api.port);
    info!(
        "  🔗 Health: http://{}:{}/health",
        config.api.host, config.api.port
    );

    let shutdown = async {
        shutdown_signal().await;
        info!("📴 Shutdown signal received, draining requests...");
    };
    if let Err(e) = api::start_server(state, options, shutdown).await {
        error!("API server error: {:?}", e);
    }

    info!("👋 CreatorFeed Engine stopped");
    Ok(())
}

/// Initialize structured logging with tracing
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("creatorfeed=debug,tower_http=debug,info"));

    let json = std::env::var("LOG_FORMAT").map_or(false, |f| f.eq_ignore_ascii_case("json"));
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry.with(fmt::layer().json().with_target(true)).init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false)
                    .with_ansi(std::env::var("NO_COLOR").is_err()),
            )
            .init();
    }
}

#[cfg(feature = "prometheus")]
fn init_metrics_exporter(port: u16) {
    use metrics_exporter_prometheus::PrometheusBuilder;

    match PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], port))
        .install()
    {
        Ok(()) => info!("✅ Prometheus exporter listening on port {}", port),
        Err(e) => warn!("⚠️ Failed to install Prometheus exporter: {}", e),
    }
}

/// Wait for shutdown signal (SIGTERM or SIGINT)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
