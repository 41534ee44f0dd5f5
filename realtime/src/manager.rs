use crate::admission::{Admission, AdmissionError, GOING_AWAY};
use crate::connection::{
    ConnectionId, ConnectionInfo, ConnectionRegistry, Delivery, Liveness, Outbound, Subscribe,
    UserId,
};
use crate::message::{DeliveryReport, Message as RealtimeMessage, MessageScope};
use domain::IdentityVerifier;
use events::{factory, Event};
use log::*;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Outcome of one liveness sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Connections sent a probe and now awaiting a pong.
    pub probed: usize,
    /// Connections closed because they never answered the previous probe.
    pub evicted: usize,
}

/// Owns the live connection registry and routes events to it.
///
/// Every operation takes the registry lock for its whole duration: a routing
/// call iterates a consistent snapshot, and a connection removed by one call is
/// never seen half-removed by another. Sends never block since each connection
/// has an unbounded outbound queue drained by its own session task.
pub struct Manager {
    registry: Mutex<ConnectionRegistry>,
    verifier: Arc<dyn IdentityVerifier>,
}

impl Manager {
    pub fn new(verifier: Arc<dyn IdentityVerifier>) -> Self {
        Self {
            registry: Mutex::new(ConnectionRegistry::new()),
            verifier,
        }
    }

    /// Verify `credential` and, on success, register a new connection for the
    /// verified identity with a `connected` acknowledgement queued on it.
    ///
    /// On failure nothing is registered; the caller closes the stream with
    /// [`crate::admission::POLICY_VIOLATION`].
    pub fn admit(&self, credential: Option<&str>) -> Result<Admission, AdmissionError> {
        let token = credential
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or(AdmissionError::MissingCredential)?;

        let identity = self.verifier.verify(token)?;

        let acknowledgement = encode(&factory::connected(
            &identity.subject_id,
            &identity.display_name,
            &identity.role.to_string(),
        ));

        let (tx, rx) = mpsc::unbounded_channel();
        let connection_id = {
            let mut registry = self.registry.lock();
            let connection_id = registry.register(identity.clone(), tx);
            if let (Some(info), Some(text)) = (registry.get(&connection_id), acknowledgement) {
                info.deliver(Outbound::Text(text));
            }
            connection_id
        };

        info!(
            "Admitted connection {} for user {} ({})",
            connection_id, identity.subject_id, identity.role
        );

        Ok(Admission {
            connection_id,
            identity,
            receiver: rx,
        })
    }

    /// Unregister a connection by ID. Removing an unknown or already removed
    /// connection is a no-op and returns `false`.
    pub fn unregister(&self, connection_id: &ConnectionId) -> bool {
        let removed = self.registry.lock().unregister(connection_id);
        match removed {
            Some(info) => {
                debug!(
                    "Unregistered connection {} for user {}",
                    connection_id,
                    info.identity().subject_id
                );
                true
            }
            None => false,
        }
    }

    /// Users with at least one live connection.
    pub fn connected_subjects(&self) -> HashSet<UserId> {
        self.registry.lock().users().cloned().collect()
    }

    pub fn connection_count(&self) -> usize {
        self.registry.lock().len()
    }

    pub fn subject_connection_count(&self, user_id: &str) -> usize {
        self.registry.lock().user_connection_count(user_id)
    }

    /// Record a peer's answer to the last liveness probe.
    pub fn confirm_alive(&self, connection_id: &ConnectionId) -> bool {
        match self.registry.lock().get_mut(connection_id) {
            Some(info) => {
                info.mark_alive();
                true
            }
            None => false,
        }
    }

    /// Record a client's interest in `resource`. Subscriptions are kept for
    /// diagnostics and do not change which events a connection receives.
    /// Notices past the per-connection caps are logged and ignored.
    ///
    /// Returns `None` when the connection is not registered.
    pub fn record_subscription(
        &self,
        connection_id: &ConnectionId,
        resource: &str,
    ) -> Option<Subscribe> {
        let outcome = self.registry.lock().get_mut(connection_id)?.subscribe(resource);
        match outcome {
            Subscribe::Added => debug!("Connection {connection_id} subscribed to {resource}"),
            Subscribe::AlreadySubscribed => {}
            Subscribe::TooManySubscriptions => warn!(
                "Ignoring subscribe from connection {connection_id}: subscription limit reached"
            ),
            Subscribe::ResourceTooLong => warn!(
                "Ignoring subscribe from connection {connection_id}: resource name of {} bytes is too long",
                resource.len()
            ),
        }
        Some(outcome)
    }

    pub fn subscriptions(&self, connection_id: &ConnectionId) -> Option<HashSet<String>> {
        self.registry
            .lock()
            .get(connection_id)
            .map(|info| info.subscriptions().clone())
    }

    /// Send a message based on its scope
    pub fn send_message(&self, message: RealtimeMessage) -> DeliveryReport {
        match message.scope {
            MessageScope::User { user_id } => self.send_to_user(&user_id, &message.event),
            MessageScope::Elevated => self.send_to_elevated(&message.event),
            MessageScope::Broadcast => self.broadcast(&message.event),
        }
    }

    /// Deliver `event` to every connection of `user_id`. The delivered event
    /// names `user_id` as its recipient. A user with no connections is not an
    /// error; the event is simply dropped.
    pub fn send_to_user(&self, user_id: &str, event: &Event) -> DeliveryReport {
        let Some(text) = encode(&event.addressed_to(user_id)) else {
            return DeliveryReport::default();
        };

        let registry = self.registry.lock();
        let report = deliver_all(
            registry.user_connections(user_id).map(|(_, info)| info),
            &text,
        );

        trace!(
            "Sent {} to user {}: {:?}",
            event.kind(),
            user_id,
            report
        );
        report
    }

    /// Deliver `event` to every connection whose user held an elevated role
    /// when the connection was admitted.
    pub fn send_to_elevated(&self, event: &Event) -> DeliveryReport {
        let Some(text) = encode(event) else {
            return DeliveryReport::default();
        };

        let registry = self.registry.lock();
        let report = deliver_all(
            registry
                .iter()
                .map(|(_, info)| info)
                .filter(|info| info.identity().role.is_elevated()),
            &text,
        );

        trace!("Sent {} to elevated roles: {:?}", event.kind(), report);
        report
    }

    /// Broadcast message to all connections
    pub fn broadcast(&self, event: &Event) -> DeliveryReport {
        let Some(text) = encode(event) else {
            return DeliveryReport::default();
        };

        let registry = self.registry.lock();
        let report = deliver_all(registry.iter().map(|(_, info)| info), &text);

        trace!("Broadcast {}: {:?}", event.kind(), report);
        report
    }

    /// Run one liveness pass over every registered connection.
    ///
    /// Connections still unconfirmed from the previous pass are closed and
    /// removed. Every survivor is marked unconfirmed and sent a fresh probe.
    pub fn sweep(&self) -> SweepReport {
        let mut registry = self.registry.lock();

        let unresponsive: Vec<ConnectionId> = registry
            .iter()
            .filter(|(_, info)| info.liveness() == Liveness::Unconfirmed)
            .map(|(id, _)| id.clone())
            .collect();

        for connection_id in &unresponsive {
            if let Some(mut info) = registry.unregister(connection_id) {
                info!(
                    "Closing unresponsive connection {} for user {}",
                    connection_id,
                    info.identity().subject_id
                );
                info.close(GOING_AWAY, "Liveness probe timed out");
            }
        }

        let mut probed = 0;
        for (_, info) in registry.iter_mut() {
            info.mark_unconfirmed();
            if info.deliver(Outbound::Ping) == Delivery::Sent {
                probed += 1;
            }
        }

        SweepReport {
            probed,
            evicted: unresponsive.len(),
        }
    }

    /// Ask every connection to close, e.g. on server shutdown. Entries stay
    /// registered until their session tasks unregister them.
    pub fn close_all(&self, reason: &str) -> usize {
        let mut registry = self.registry.lock();
        let mut closed = 0;
        for (_, info) in registry.iter_mut() {
            if info.is_writable() {
                info.close(GOING_AWAY, reason);
                closed += 1;
            }
        }
        closed
    }
}

fn encode(event: &Event) -> Option<Arc<str>> {
    match event.to_json() {
        Ok(json) => Some(Arc::from(json)),
        Err(e) => {
            error!("Failed to serialize {} event: {e}", event.kind());
            None
        }
    }
}

fn deliver_all<'a>(
    connections: impl Iterator<Item = &'a ConnectionInfo>,
    text: &Arc<str>,
) -> DeliveryReport {
    let mut report = DeliveryReport::default();
    for info in connections {
        match info.deliver(Outbound::Text(Arc::clone(text))) {
            Delivery::Sent => report.delivered += 1,
            Delivery::Skipped => report.skipped += 1,
        }
    }
    report
}
