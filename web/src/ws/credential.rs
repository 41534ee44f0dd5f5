use axum::http::{header::AUTHORIZATION, HeaderMap};
use serde::Deserialize;

/// Query parameters accepted on the WebSocket upgrade request.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ConnectParams {
    pub(crate) token: Option<String>,
}

/// Picks the bearer credential for an upgrade request.
///
/// The `token` query parameter wins over an `Authorization: Bearer` header when
/// both are present, since browsers cannot set headers on WebSocket requests.
/// Blank values count as absent.
pub(crate) fn extract_credential(params: &ConnectParams, headers: &HeaderMap) -> Option<String> {
    params
        .token
        .as_deref()
        .and_then(non_blank)
        .or_else(|| bearer_token(headers))
        .map(str::to_string)
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    if scheme.eq_ignore_ascii_case("bearer") {
        non_blank(token)
    } else {
        None
    }
}

fn non_blank(value: &str) -> Option<&str> {
    let value = value.trim();
    (!value.is_empty()).then_some(value)
}
