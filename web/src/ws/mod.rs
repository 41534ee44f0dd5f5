//! WebSocket endpoint for real-time panel updates.
//!
//! This module contains only the Axum side of the channel: the upgrade
//! handler, credential extraction and the per-connection session loop. The
//! registry, routing and liveness logic live in the `realtime` crate.

pub(crate) mod credential;
pub(crate) mod handler;
mod session;
