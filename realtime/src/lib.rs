//! Real-time event distribution for authenticated WebSocket clients.
//!
//! This crate owns the set of live panel connections and routes typed events
//! from the domain layer to exactly the connections that should see them.
//!
//! # Architecture
//!
//! - **Multiple connections per user**: a user may have several tabs or
//!   devices open at once; each is registered separately under the same user.
//! - **Dual-index registry**: an arena keyed by server-generated
//!   `ConnectionId`, plus a per-user index used for routing. Empty user entries
//!   are removed immediately.
//! - **User, Elevated and Broadcast scopes**: events can target one user, every
//!   administrator, or everyone.
//! - **Ephemeral events**: delivery is best-effort. Offline users miss the
//!   event and see fresh data on their next load.
//! - **Liveness sweep**: half-open connections are probed and evicted.
//! - **Transport agnostic**: the registry only pushes [`connection::Outbound`]
//!   frames into a per-connection channel. The web layer owns the socket.
//!
//! # Message Flow
//!
//! 1. Client opens `/ws` with a bearer token
//! 2. [`Manager::admit`] verifies the token and registers the connection,
//!    queueing a `connected` acknowledgement
//! 3. A domain handler commits a change, builds an event with
//!    `events::factory`, and calls one routing method
//! 4. The manager resolves the target connections under its lock and queues
//!    the serialized event on each writable one
//! 5. The session task writes queued frames to the socket
//!
//! # Example: Sending an event
//!
//! ```rust,ignore
//! use events::factory;
//! use realtime::message::{Message, MessageScope};
//!
//! // In a handler after granting a permission
//! app_state.realtime.send_message(Message {
//!     event: factory::permission_granted(&user_id, permission),
//!     scope: MessageScope::User { user_id },
//! });
//! ```
//!
//! # Modules
//!
//! - `admission`: admission result and error types, close codes
//! - `connection`: ConnectionRegistry with dual-index architecture and type-safe ConnectionId
//! - `heartbeat`: the liveness monitor task
//! - `manager`: locking, admission and routing over the registry
//! - `message`: scope definitions and delivery reports

pub mod admission;
pub mod connection;
pub mod heartbeat;
pub mod manager;
pub mod message;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use admission::{Admission, AdmissionError};
pub use manager::{Manager, SweepReport};
