//! Event system infrastructure for the Lumen Platform.
//!
//! This crate defines the events that are pushed to connected panel clients
//! over the real-time channel, and the constructors that domain mutation
//! handlers use to build them.
//!
//! # Architecture
//!
//! - **EventKind**: closed enumeration of every event type known to clients.
//!   The wire names are a compatibility contract shared with the panel UI and
//!   must not be renamed without a version bump.
//! - **Event**: immutable record stamped with a timestamp, carrying a JSON
//!   payload whose shape is fixed per kind and an optional target user.
//! - **factory**: one constructor per event kind.
//! - **inbound**: messages clients may send back over the stream.
//!
//! This crate has no dependencies on internal crates, so both the domain
//! handlers and the real-time layer can depend on it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

pub mod factory;
pub mod inbound;

pub use inbound::InboundMessage;

/// Every event type a client can receive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventKind {
    /// Acknowledgement sent to a freshly admitted connection only.
    Connected,
    DeviceOnline,
    DeviceOffline,
    DeviceError,
    LampToggled,
    LampBrightnessChanged,
    PermissionGranted,
    PermissionRevoked,
    UserCreated,
    UserUpdated,
    UserDeleted,
    AlertCreated,
    AlertResolved,
    MaintenanceModeChanged,
    ConfigUpdated,
}

impl EventKind {
    pub const ALL: [EventKind; 15] = [
        EventKind::Connected,
        EventKind::DeviceOnline,
        EventKind::DeviceOffline,
        EventKind::DeviceError,
        EventKind::LampToggled,
        EventKind::LampBrightnessChanged,
        EventKind::PermissionGranted,
        EventKind::PermissionRevoked,
        EventKind::UserCreated,
        EventKind::UserUpdated,
        EventKind::UserDeleted,
        EventKind::AlertCreated,
        EventKind::AlertResolved,
        EventKind::MaintenanceModeChanged,
        EventKind::ConfigUpdated,
    ];

    /// The wire name of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Connected => "connected",
            EventKind::DeviceOnline => "device-online",
            EventKind::DeviceOffline => "device-offline",
            EventKind::DeviceError => "device-error",
            EventKind::LampToggled => "lamp-toggled",
            EventKind::LampBrightnessChanged => "lamp-brightness-changed",
            EventKind::PermissionGranted => "permission-granted",
            EventKind::PermissionRevoked => "permission-revoked",
            EventKind::UserCreated => "user-created",
            EventKind::UserUpdated => "user-updated",
            EventKind::UserDeleted => "user-deleted",
            EventKind::AlertCreated => "alert-created",
            EventKind::AlertResolved => "alert-resolved",
            EventKind::MaintenanceModeChanged => "maintenance-mode-changed",
            EventKind::ConfigUpdated => "config-updated",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct EventKindParseError(pub String);

impl fmt::Display for EventKindParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "unknown event type: {}", self.0)
    }
}

impl std::error::Error for EventKindParseError {}

impl FromStr for EventKind {
    type Err = EventKindParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| EventKindParseError(s.to_string()))
    }
}

/// An immutable event as delivered to clients.
///
/// Serializes to `{ "type", "timestamp", "data", "userId"? }`. `userId` is only
/// present for events addressed to a single user and is informational for the
/// client; the server has already filtered delivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    #[serde(rename = "type")]
    kind: EventKind,
    timestamp: DateTime<Utc>,
    data: Value,
    #[serde(rename = "userId", default, skip_serializing_if = "Option::is_none")]
    user_id: Option<String>,
}

impl Event {
    /// Builds an untargeted event stamped with the current time.
    pub fn new(kind: EventKind, data: Value) -> Self {
        Self {
            kind,
            timestamp: Utc::now(),
            data,
            user_id: None,
        }
    }

    /// Builds an event targeted at a single user, stamped with the current time.
    pub fn targeted(kind: EventKind, data: Value, user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            ..Self::new(kind, data)
        }
    }

    /// Returns a copy of this event naming `user_id` as its recipient.
    /// Kind, timestamp and payload are preserved.
    pub fn addressed_to(&self, user_id: &str) -> Self {
        Self {
            kind: self.kind,
            timestamp: self.timestamp,
            data: self.data.clone(),
            user_id: Some(user_id.to_string()),
        }
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn data(&self) -> &Value {
        &self.data
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    /// Serializes the event to its wire representation.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
