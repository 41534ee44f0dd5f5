//! HTTP surface of the Lumen Platform: the `/ws` real-time endpoint and a
//! health route, served by axum.

use axum::http::{HeaderValue, Method};
use log::*;
use realtime::Manager;
use service::config::Config;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{AllowOrigin, CorsLayer};

mod controller;
pub mod router;
mod ws;

// Web-level state passed to every handler.
// Needs to implement Clone to be able to be passed into Router as State
#[derive(Clone)]
pub struct AppState {
    pub realtime: Arc<Manager>,
    /// Longest a session waits on one socket write before dropping the client.
    pub write_timeout: Duration,
}

impl AppState {
    pub fn new(realtime: Arc<Manager>, write_timeout: Duration) -> Self {
        Self {
            realtime,
            write_timeout,
        }
    }
}

/// Bind the configured address and serve until `shutdown` is cancelled.
pub async fn init_server(
    config: &Config,
    app_state: AppState,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    let listen_addr = config.listen_address();

    let app = router::define_routes(app_state).layer(cors_layer(&config.allowed_origins));

    let listener = TcpListener::bind(&listen_addr).await?;
    info!("Server starting... listening for connections on http://{listen_addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Ignoring invalid CORS origin {origin:?}: {e}");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET])
}
