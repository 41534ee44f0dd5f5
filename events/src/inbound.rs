//! Messages a client may send over its stream besides protocol control frames.

use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundMessage {
    /// Notice that the client is interested in a resource. Recorded on the
    /// connection, does not affect delivery.
    Subscribe { resource: String },
}

impl InboundMessage {
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}
