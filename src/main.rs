//! SwiftCache - A caching fetch proxy
//!
//! Server binary: wires configuration, the worker pool, the dispatcher and
//! the HTTP router together.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use swiftcache::{create_router, spawn_dispatcher, AppState, Config, HttpFetcher, WorkerPool};

/// Main entry point for the SwiftCache proxy server.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Build shared state (cache, coordinator, scheduler, validator)
/// 4. Start the worker pool and the dispatcher
/// 5. Serve HTTP until SIGINT/SIGTERM, then drain the workers
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "swiftcache=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting SwiftCache proxy server");

    let config = Config::from_env();
    info!(
        "Configuration loaded: capacity={}B, workers={}, port={}, fetch_timeout={}s, blocklist={:?}",
        config.cache_capacity_bytes,
        config.worker_count,
        config.server_port,
        config.fetch_timeout_secs,
        config.blocklist
    );

    let state = AppState::from_config(&config, Arc::new(HttpFetcher::new()));

    let pool = WorkerPool::spawn(
        config.worker_count,
        config.worker_queue_capacity,
        state.coordinator.clone(),
        Arc::clone(&state.fetcher),
        state.fetch_timeout,
    );
    let dispatcher = spawn_dispatcher(
        Arc::clone(&state.scheduler),
        pool.handle(),
        config.dispatch_backoff(),
    );
    info!("Dispatcher started with {} workers", pool.size());

    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(dispatcher))
        .await
        .context("server error")?;

    pool.shutdown().await;
    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
///
/// On shutdown signal, aborts the dispatcher so no new jobs reach the pool.
async fn shutdown_signal(dispatcher: tokio::task::JoinHandle<()>) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }

    dispatcher.abort();
    warn!("Dispatcher aborted");
}
