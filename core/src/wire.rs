//! JSON envelope exchanged between a hosting editor and its guests.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::SceneSnapshot;

/// Envelope discriminator carried by snapshot messages.
pub const SNAPSHOT_MESSAGE: &str = "snapshot";

/// Messages understood by peers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PeerMessage {
    /// Full replacement of the guest's scene.
    Snapshot {
        /// Scene captured by the host.
        #[serde(rename = "snapShot")]
        snapshot: SceneSnapshot,
    },
}

impl PeerMessage {
    /// Wraps a snapshot into a message.
    #[must_use]
    pub fn snapshot(snapshot: SceneSnapshot) -> Self {
        PeerMessage::Snapshot { snapshot }
    }

    /// Serializes the message into its JSON text form.
    pub fn encode(&self) -> Result<String, WireError> {
        serde_json::to_string(self).map_err(WireError::Malformed)
    }

    /// Parses a JSON payload.
    ///
    /// Payloads whose `type` is not understood decode to `None` so that newer
    /// hosts can introduce message kinds without breaking older guests.
    pub fn decode(payload: &str) -> Result<Option<Self>, WireError> {
        let value: Value = serde_json::from_str(payload).map_err(WireError::Malformed)?;
        let kind = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or(WireError::MissingType)?;
        if kind != SNAPSHOT_MESSAGE {
            return Ok(None);
        }
        serde_json::from_value(value)
            .map(Some)
            .map_err(WireError::Malformed)
    }
}

/// Errors raised while encoding or decoding peer messages.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    /// The payload was not valid JSON for the expected shape.
    #[error("malformed peer message: {0}")]
    Malformed(#[source] serde_json::Error),
    /// The payload had no string `type` discriminator.
    #[error("peer message is missing its `type` field")]
    MissingType,
}
