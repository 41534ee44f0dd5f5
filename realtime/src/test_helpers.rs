//! Shared fixtures for the realtime unit tests.

use crate::admission::Admission;
use crate::connection::Outbound;
use crate::Manager;
use domain::error::{Error, UnauthenticatedErrorKind};
use domain::{Identity, IdentityVerifier, Role};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;

/// Accepts tokens of the form `<subject>:<role>` and rejects anything else.
pub(crate) struct StaticVerifier;

impl IdentityVerifier for StaticVerifier {
    fn verify(&self, token: &str) -> Result<Identity, Error> {
        let invalid = || Error::unauthenticated(UnauthenticatedErrorKind::InvalidCredential);

        let (subject, role) = token.split_once(':').ok_or_else(invalid)?;
        let role: Role =
            serde_json::from_value(Value::String(role.to_string())).map_err(|_| invalid())?;

        Ok(identity(subject, role))
    }
}

pub(crate) fn identity(subject: &str, role: Role) -> Identity {
    Identity {
        subject_id: subject.to_string(),
        display_name: format!("{subject} display"),
        role,
    }
}

pub(crate) fn token(subject: &str, role: Role) -> String {
    format!("{subject}:{role}")
}

pub(crate) fn manager() -> Manager {
    Manager::new(Arc::new(StaticVerifier))
}

pub(crate) fn admit(manager: &Manager, subject: &str, role: Role) -> Admission {
    manager
        .admit(Some(&token(subject, role)))
        .expect("static verifier accepts well formed tokens")
}

/// Everything currently queued on a connection.
pub(crate) fn drain_frames(receiver: &mut UnboundedReceiver<Outbound>) -> Vec<Outbound> {
    let mut frames = Vec::new();
    while let Ok(frame) = receiver.try_recv() {
        frames.push(frame);
    }
    frames
}

/// Queued events parsed from their wire form. Control frames are discarded.
pub(crate) fn drain_events(receiver: &mut UnboundedReceiver<Outbound>) -> Vec<Value> {
    drain_frames(receiver)
        .into_iter()
        .filter_map(|frame| match frame {
            Outbound::Text(text) => Some(serde_json::from_str(&text).unwrap()),
            _ => None,
        })
        .collect()
}
