use crate::connection::{ConnectionId, Outbound};
use domain::error::{DomainErrorKind, Error as DomainError, UnauthenticatedErrorKind};
use domain::Identity;
use std::error::Error as StdError;
use std::fmt;
use tokio::sync::mpsc::UnboundedReceiver;

/// WebSocket close code sent when admission fails.
pub const POLICY_VIOLATION: u16 = 1008;

/// WebSocket close code sent on liveness eviction and server shutdown.
pub const GOING_AWAY: u16 = 1001;

/// A successfully admitted connection.
///
/// The session task drains `receiver` and writes each frame to the socket.
/// The `connected` acknowledgement is already queued on it.
#[derive(Debug)]
pub struct Admission {
    pub connection_id: ConnectionId,
    pub identity: Identity,
    pub receiver: UnboundedReceiver<Outbound>,
}

/// Why a connection attempt was refused. Always fatal to the attempt; the
/// client may reconnect with a fresh credential.
#[derive(Debug)]
pub enum AdmissionError {
    MissingCredential,
    Rejected(DomainError),
}

impl AdmissionError {
    /// Short human readable reason sent with the policy-violation close frame.
    pub fn close_reason(&self) -> &'static str {
        match self {
            AdmissionError::MissingCredential => "Authentication required",
            AdmissionError::Rejected(err) => match err.error_kind {
                DomainErrorKind::Unauthenticated(UnauthenticatedErrorKind::ExpiredCredential) => {
                    "Token expired"
                }
                _ => "Invalid token",
            },
        }
    }
}

impl fmt::Display for AdmissionError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AdmissionError::MissingCredential => write!(f, "no credential presented"),
            AdmissionError::Rejected(err) => write!(f, "credential rejected: {err}"),
        }
    }
}

impl StdError for AdmissionError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            AdmissionError::MissingCredential => None,
            AdmissionError::Rejected(err) => Some(err),
        }
    }
}

impl From<DomainError> for AdmissionError {
    fn from(err: DomainError) -> Self {
        match err.error_kind {
            DomainErrorKind::Unauthenticated(UnauthenticatedErrorKind::MissingCredential) => {
                AdmissionError::MissingCredential
            }
            _ => AdmissionError::Rejected(err),
        }
    }
}
