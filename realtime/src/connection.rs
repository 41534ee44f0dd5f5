use domain::Identity;
use log::*;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;

pub type UserId = String;

/// Unique identifier for a connection (server-generated)
///
/// This is the only handle code outside the registry holds on a connection.
/// Once the connection is unregistered the id resolves to nothing, so stale
/// handles are harmless.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConnectionId(String);

impl ConnectionId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Liveness state of a registered connection. Evicted connections are simply
/// dropped from the registry, so there is no terminal variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Liveness {
    Alive,
    /// Probed by the last sweep and not yet answered.
    Unconfirmed,
}

/// Frames pushed to a connection's session task, which writes them to the socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// A serialized event.
    Text(Arc<str>),
    /// Liveness probe.
    Ping,
    /// Close the stream with the given code and reason.
    Close { code: u16, reason: String },
}

/// Most resources a single connection may subscribe to.
pub const MAX_SUBSCRIPTIONS: usize = 64;

/// Longest resource name accepted in a subscribe notice, in bytes.
pub const MAX_RESOURCE_LEN: usize = 128;

/// Result of recording a subscribe notice on a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subscribe {
    Added,
    AlreadySubscribed,
    TooManySubscriptions,
    ResourceTooLong,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Sent,
    Skipped,
}

/// Connection state owned by the registry.
#[derive(Debug)]
pub struct ConnectionInfo {
    identity: Identity,
    sender: UnboundedSender<Outbound>,
    liveness: Liveness,
    closing: bool,
    subscriptions: HashSet<String>,
}

impl ConnectionInfo {
    fn new(identity: Identity, sender: UnboundedSender<Outbound>) -> Self {
        Self {
            identity,
            sender,
            liveness: Liveness::Alive,
            closing: false,
            subscriptions: HashSet::new(),
        }
    }

    /// Identity captured at admission. Never refreshed while the connection is open.
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn liveness(&self) -> Liveness {
        self.liveness
    }

    pub fn subscriptions(&self) -> &HashSet<String> {
        &self.subscriptions
    }

    /// A connection is writable until a close has been issued on it or its
    /// session task has dropped the receiving end.
    pub fn is_writable(&self) -> bool {
        !self.closing && !self.sender.is_closed()
    }

    /// Queues `frame` if the connection is writable, otherwise skips it.
    pub fn deliver(&self, frame: Outbound) -> Delivery {
        if !self.is_writable() {
            return Delivery::Skipped;
        }

        match self.sender.send(frame) {
            Ok(()) => Delivery::Sent,
            Err(e) => {
                warn!(
                    "Failed to queue frame for {}: {}. Connection will be cleaned up.",
                    self.identity.subject_id, e
                );
                Delivery::Skipped
            }
        }
    }

    /// Queues a close frame and stops any further writes.
    pub fn close(&mut self, code: u16, reason: &str) {
        let _ = self.deliver(Outbound::Close {
            code,
            reason: reason.to_string(),
        });
        self.closing = true;
    }

    pub(crate) fn mark_alive(&mut self) {
        self.liveness = Liveness::Alive;
    }

    pub(crate) fn mark_unconfirmed(&mut self) {
        self.liveness = Liveness::Unconfirmed;
    }

    pub(crate) fn subscribe(&mut self, resource: &str) -> Subscribe {
        if resource.len() > MAX_RESOURCE_LEN {
            return Subscribe::ResourceTooLong;
        }
        if self.subscriptions.contains(resource) {
            return Subscribe::AlreadySubscribed;
        }
        if self.subscriptions.len() >= MAX_SUBSCRIPTIONS {
            return Subscribe::TooManySubscriptions;
        }

        self.subscriptions.insert(resource.to_string());
        Subscribe::Added
    }
}

/// Connection index with two views: an arena keyed by connection id and a
/// per-user set of connection ids used for routing.
///
/// A user id key exists only while its set is non-empty, and every id in a
/// user set is present in the arena. The registry does no locking of its own;
/// [`crate::Manager`] owns it behind a single lock.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    /// Primary storage: lookup by connection_id for registration/cleanup
    connections: HashMap<ConnectionId, ConnectionInfo>,

    /// Secondary index: lookup by user_id for message routing
    user_index: HashMap<UserId, HashSet<ConnectionId>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new connection for `identity`.
    pub fn register(
        &mut self,
        identity: Identity,
        sender: UnboundedSender<Outbound>,
    ) -> ConnectionId {
        let connection_id = ConnectionId::new();
        let user_id = identity.subject_id.clone();

        self.connections.insert(
            connection_id.clone(),
            ConnectionInfo::new(identity, sender),
        );
        self.user_index
            .entry(user_id)
            .or_default()
            .insert(connection_id.clone());

        connection_id
    }

    /// Remove a connection, dropping its user entry when it was the last one.
    /// Returns `None` when the id is unknown or already removed.
    pub fn unregister(&mut self, connection_id: &ConnectionId) -> Option<ConnectionInfo> {
        let info = self.connections.remove(connection_id)?;
        let user_id = &info.identity.subject_id;

        if let Some(ids) = self.user_index.get_mut(user_id) {
            ids.remove(connection_id);
            if ids.is_empty() {
                self.user_index.remove(user_id);
            }
        }

        Some(info)
    }

    pub fn get(&self, connection_id: &ConnectionId) -> Option<&ConnectionInfo> {
        self.connections.get(connection_id)
    }

    pub fn get_mut(&mut self, connection_id: &ConnectionId) -> Option<&mut ConnectionInfo> {
        self.connections.get_mut(connection_id)
    }

    /// Connections registered for `user_id`, empty if the user has none.
    pub fn user_connections<'a>(
        &'a self,
        user_id: &str,
    ) -> impl Iterator<Item = (&'a ConnectionId, &'a ConnectionInfo)> + 'a {
        self.user_index
            .get(user_id)
            .into_iter()
            .flatten()
            .filter_map(move |id| self.connections.get_key_value(id))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ConnectionId, &ConnectionInfo)> {
        self.connections.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&ConnectionId, &mut ConnectionInfo)> {
        self.connections.iter_mut()
    }

    pub fn users(&self) -> impl Iterator<Item = &UserId> {
        self.user_index.keys()
    }

    pub fn user_connection_count(&self, user_id: &str) -> usize {
        self.user_index.get(user_id).map_or(0, HashSet::len)
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::identity;
    use domain::Role;
    use tokio::sync::mpsc;

    fn register(
        registry: &mut ConnectionRegistry,
        user_id: &str,
    ) -> (ConnectionId, mpsc::UnboundedReceiver<Outbound>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = registry.register(identity(user_id, Role::User), tx);
        (id, rx)
    }

    #[test]
    fn test_connection_ids_are_unique() {
        assert_ne!(ConnectionId::new(), ConnectionId::new());
    }

    #[test]
    fn test_register_indexes_by_user() {
        let mut registry = ConnectionRegistry::new();
        let (first, _rx1) = register(&mut registry, "u1");
        let (second, _rx2) = register(&mut registry, "u1");
        let (_, _rx3) = register(&mut registry, "u2");

        assert_eq!(registry.len(), 3);
        assert_eq!(registry.user_connection_count("u1"), 2);
        assert_eq!(registry.user_connection_count("u2"), 1);

        let mut ids: Vec<_> = registry
            .user_connections("u1")
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        let mut expected = vec![first, second];
        expected.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        assert_eq!(ids, expected);
    }

    #[test]
    fn test_unregister_last_connection_drops_user_key() {
        let mut registry = ConnectionRegistry::new();
        let (first, _rx1) = register(&mut registry, "u1");
        let (second, _rx2) = register(&mut registry, "u1");

        assert!(registry.unregister(&first).is_some());
        assert_eq!(registry.users().count(), 1);

        assert!(registry.unregister(&second).is_some());
        assert_eq!(registry.users().count(), 0);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_unregister_is_idempotent() {
        let mut registry = ConnectionRegistry::new();
        let (id, _rx) = register(&mut registry, "u1");
        let (_, _other_rx) = register(&mut registry, "u2");

        assert!(registry.unregister(&id).is_some());
        assert!(registry.unregister(&id).is_none());
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.users().cloned().collect::<Vec<_>>(), vec!["u2"]);
    }

    #[test]
    fn test_user_connections_for_unknown_user_is_empty() {
        let registry = ConnectionRegistry::new();
        assert_eq!(registry.user_connections("nobody").count(), 0);
    }

    #[test]
    fn test_deliver_skips_closed_receiver() {
        let mut registry = ConnectionRegistry::new();
        let (id, rx) = register(&mut registry, "u1");
        drop(rx);

        let info = registry.get(&id).unwrap();
        assert!(!info.is_writable());
        assert_eq!(info.deliver(Outbound::Ping), Delivery::Skipped);
    }

    #[test]
    fn test_close_sends_close_frame_then_blocks_writes() {
        let mut registry = ConnectionRegistry::new();
        let (id, mut rx) = register(&mut registry, "u1");

        let info = registry.get_mut(&id).unwrap();
        info.close(1001, "bye");

        assert!(!info.is_writable());
        assert_eq!(info.deliver(Outbound::Ping), Delivery::Skipped);
        assert_eq!(
            rx.try_recv().unwrap(),
            Outbound::Close {
                code: 1001,
                reason: "bye".to_string()
            }
        );
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_new_connection_starts_alive() {
        let mut registry = ConnectionRegistry::new();
        let (id, _rx) = register(&mut registry, "u1");

        let info = registry.get_mut(&id).unwrap();
        assert_eq!(info.liveness(), Liveness::Alive);
        info.mark_unconfirmed();
        assert_eq!(info.liveness(), Liveness::Unconfirmed);
        info.mark_alive();
        assert_eq!(info.liveness(), Liveness::Alive);
    }

    #[test]
    fn test_subscriptions_are_capped() {
        let mut registry = ConnectionRegistry::new();
        let (id, _rx) = register(&mut registry, "u1");
        let info = registry.get_mut(&id).unwrap();

        for n in 0..MAX_SUBSCRIPTIONS {
            assert_eq!(info.subscribe(&format!("resource-{n}")), Subscribe::Added);
        }
        assert_eq!(info.subscribe("resource-0"), Subscribe::AlreadySubscribed);
        assert_eq!(info.subscribe("one-too-many"), Subscribe::TooManySubscriptions);
        assert_eq!(info.subscriptions().len(), MAX_SUBSCRIPTIONS);
    }

    #[test]
    fn test_oversized_resource_is_rejected() {
        let mut registry = ConnectionRegistry::new();
        let (id, _rx) = register(&mut registry, "u1");
        let info = registry.get_mut(&id).unwrap();

        let long = "x".repeat(MAX_RESOURCE_LEN + 1);
        assert_eq!(info.subscribe(&long), Subscribe::ResourceTooLong);
        assert_eq!(info.subscribe(&long[..MAX_RESOURCE_LEN]), Subscribe::Added);
        assert_eq!(info.subscriptions().len(), 1);
    }
}
