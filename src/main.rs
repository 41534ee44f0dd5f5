use domain::JwtIdentityVerifier;
use log::{error, info};
use realtime::{heartbeat, Manager};
use service::{config::Config, logging::Logger};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use web::AppState;

#[tokio::main]
async fn main() {
    let config = Config::new();
    if let Err(e) = Logger::init_logger(&config) {
        eprintln!("Failed to initialize logger: {e}");
    }

    info!(
        "Starting Lumen Platform realtime server [{}]...",
        config.runtime_env()
    );

    let verifier = match JwtIdentityVerifier::new(config.jwt_secret()) {
        Ok(verifier) => Arc::new(verifier),
        Err(e) => {
            error!("Failed to configure access token verification: {e}");
            std::process::exit(1);
        }
    };
    let manager = Arc::new(Manager::new(verifier));
    let shutdown = CancellationToken::new();

    let monitor = tokio::spawn(heartbeat::run_liveness_monitor(
        manager.clone(),
        config.heartbeat_interval(),
        shutdown.child_token(),
    ));

    tokio::spawn({
        let manager = manager.clone();
        let shutdown = shutdown.clone();
        async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for shutdown signal: {e}");
                return;
            }
            info!("Shutdown requested, closing real-time connections");
            let closed = manager.close_all("Server shutting down");
            info!("Asked {closed} connections to close");
            shutdown.cancel();
        }
    });

    // A peer that cannot take a frame within one sweep interval is treated as gone
    let app_state = AppState::new(manager, config.heartbeat_interval());
    if let Err(e) = web::init_server(&config, app_state, shutdown.clone()).await {
        error!("Server stopped with error: {e}");
        shutdown.cancel();
        let _ = monitor.await;
        std::process::exit(1);
    }

    shutdown.cancel();
    if let Err(e) = monitor.await {
        error!("Liveness monitor task failed: {e}");
    }
    info!("Server stopped");
}
