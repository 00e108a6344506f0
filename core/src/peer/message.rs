use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Event tag carried by every peer alert datagram.
pub const ALERT_EVENT: &str = "ALERT";

/// Wire entity broadcast to peers: compact JSON over UDP.
///
/// The uuid is a random per-process identifier used purely for
/// self-echo suppression; it is not identity or auth. Alerts are
/// advisory and idempotent, so there are no sequence numbers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PeerAlertMessage {
    pub uuid: String,
    pub event: String,
    /// Milliseconds since the Unix epoch at send time.
    pub timestamp: i64,
}

impl PeerAlertMessage {
    /// Builds an alert stamped with the current epoch time.
    pub fn alert(uuid: &str) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0);
        Self {
            uuid: uuid.to_string(),
            event: ALERT_EVENT.to_string(),
            timestamp,
        }
    }

    pub fn encode(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    /// Decodes a datagram payload; malformed payloads yield `None`
    /// and are dropped by the caller.
    pub fn decode(payload: &[u8]) -> Option<Self> {
        serde_json::from_slice(payload).ok()
    }

    /// Short sender identifier surfaced to the UI layer.
    pub fn short_id(&self) -> String {
        self.uuid.chars().take(4).collect()
    }
}
