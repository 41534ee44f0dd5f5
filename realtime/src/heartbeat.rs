//! Periodic liveness sweep over the connection registry.
//!
//! A half-open TCP connection never reports its own closure, so without this
//! loop it would stay registered forever. Each tick runs [`Manager::sweep`]:
//! a connection that did not answer the previous probe is closed, every other
//! one is probed again. Silent peers are therefore gone within two intervals.

use crate::Manager;
use log::*;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Sweep `manager` every `interval` until `cancel` fires.
pub async fn run_liveness_monitor(
    manager: Arc<Manager>,
    interval: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // Skip the immediate first tick
    ticker.tick().await;

    info!("Liveness monitor started, sweeping every {interval:?}");

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let report = manager.sweep();
                if report.evicted > 0 {
                    info!(
                        "Liveness sweep evicted {} connection(s), probed {}",
                        report.evicted, report.probed
                    );
                } else {
                    debug!("Liveness sweep probed {} connection(s)", report.probed);
                }
            }
            () = cancel.cancelled() => {
                info!("Liveness monitor stopped");
                break;
            }
        }
    }
}
