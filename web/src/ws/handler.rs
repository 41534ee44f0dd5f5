use super::credential::{extract_credential, ConnectParams};
use super::session;
use crate::AppState;
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::http::HeaderMap;
use axum::response::Response;
use log::*;

/// Upgrade handler for `/ws`.
///
/// The credential is checked after the upgrade so a rejected client receives a
/// policy-violation close frame with a reason instead of a bare HTTP error.
pub(crate) async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<ConnectParams>,
    headers: HeaderMap,
    State(app_state): State<AppState>,
) -> Response {
    let credential = extract_credential(&params, &headers);
    trace!(
        "WebSocket upgrade requested (credential presented: {})",
        credential.is_some()
    );

    let manager = app_state.realtime.clone();
    let write_timeout = app_state.write_timeout;
    ws.on_upgrade(move |socket| session::run(socket, manager, credential, write_timeout))
}
