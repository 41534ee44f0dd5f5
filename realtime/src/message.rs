use events::Event;

/// An event together with the audience it should reach.
#[derive(Debug, Clone)]
pub struct Message {
    pub event: Event,
    pub scope: MessageScope,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageScope {
    /// Send to all connections for a specific user
    User { user_id: String },
    /// Send to every connection whose user holds an elevated role
    Elevated,
    /// Send to all connected users
    Broadcast,
}

/// Outcome of one routing call.
///
/// `skipped` counts connections that matched the scope but were not writable
/// (already closing). Those are left for the close handler or the liveness
/// sweep to reap.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub delivered: usize,
    pub skipped: usize,
}
