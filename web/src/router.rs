use crate::{controller::health_check_controller, ws, AppState};
use axum::{routing::get, Router};

pub fn define_routes(app_state: AppState) -> Router {
    Router::new()
        .merge(health_routes(app_state.clone()))
        .merge(realtime_routes(app_state))
}

fn health_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check_controller::health_check))
        .with_state(app_state)
}

// Authentication happens inside the upgrade handler rather than in a route
// layer so rejected clients get a close frame with a reason.
fn realtime_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/ws", get(ws::handler::ws_handler))
        .with_state(app_state)
}
