use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use hirewatch_events::{BroadcastLayer, LogBus};
use hirewatch_worker::ProcessWorker;
use tokio_util::sync::CancellationToken;
use tracing::Level;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

use hirewatch_api::config::ServerConfig;
use hirewatch_api::router::build_app_router;
use hirewatch_api::state::AppState;
use hirewatch_api::ws;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Log bus ---
    // Created before tracing so startup diagnostics can be mirrored too.
    let log_bus = Arc::new(LogBus::default());

    // --- Tracing ---
    let mirror = BroadcastLayer::new(Arc::clone(&log_bus))
        .exclude_target("hirewatch_api::ws")
        .with_filter(Targets::new().with_target("hirewatch", Level::INFO));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "hirewatch_api=debug,hirewatch_worker=debug,tower_http=debug".into()
            }),
        ))
        .with(mirror)
        .init();

    // --- Configuration ---
    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Invalid server configuration");
            std::process::exit(1);
        }
    };
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    let host: IpAddr = match config.host.parse() {
        Ok(host) => host,
        Err(e) => {
            tracing::error!(host = %config.host, error = %e, "Invalid HOST address");
            std::process::exit(1);
        }
    };
    let addr = SocketAddr::new(host, config.port);
    let shutdown_timeout = Duration::from_secs(config.shutdown_timeout_secs);

    // --- Worker ---
    let worker = Arc::new(ProcessWorker::new(config.worker.clone()));
    tracing::debug!(program = %config.worker.program, "Worker configured");

    // --- App state ---
    let state = AppState::new(config.clone(), worker.clone(), Arc::clone(&log_bus));
    let ws_manager = Arc::clone(&state.ws_manager);

    // --- Log relay ---
    let relay_cancel = CancellationToken::new();
    let relay_handle = tokio::spawn(ws::LogRelay::run(
        Arc::clone(&ws_manager),
        log_bus.subscribe(),
        relay_cancel.clone(),
    ));

    // --- Liveness check ---
    let liveness_handle = ws::start_liveness_check(Arc::clone(&ws_manager));

    // --- Router ---
    let app = build_app_router(state, &config);

    // --- Start server ---
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(%addr, error = %e, "Failed to bind to address");
            std::process::exit(1);
        }
    };
    tracing::info!(%addr, "Server listening");

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!(error = %e, "Server error");
    }

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    // The worker's last lines must be on the bus before the relay drains it.
    if worker.shutdown(shutdown_timeout).await {
        tracing::info!("Worker stopped");
    } else {
        tracing::warn!("Worker did not stop cleanly");
    }

    // Entries already queued are still delivered after cancellation.
    relay_cancel.cancel();
    if tokio::time::timeout(shutdown_timeout, relay_handle).await.is_err() {
        tracing::warn!("Log relay did not stop in time");
    }

    let ws_count = ws_manager.connection_count().await;
    tracing::info!(ws_count, "Closing remaining WebSocket connections");
    ws_manager.shutdown_all().await;

    liveness_handle.abort();
    tracing::info!("Liveness check stopped");

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix) so the server
/// shuts down cleanly whether stopped interactively or by a process
/// manager.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
