use crate::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub(crate) struct HealthStatus {
    status: &'static str,
    /// Open real-time connections
    connections: usize,
    /// Distinct users with at least one open connection
    subjects: usize,
}

/// GET the server status and real-time registry size
pub(crate) async fn health_check(State(app_state): State<AppState>) -> impl IntoResponse {
    let body = HealthStatus {
        status: "healthy",
        connections: app_state.realtime.connection_count(),
        subjects: app_state.realtime.connected_subjects().len(),
    };
    (StatusCode::OK, Json(body))
}
