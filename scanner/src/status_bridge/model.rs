use serde::{Deserialize, Serialize};

/// Snapshot of the scanner state served to UI clients.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StatusModel {
    pub status: String,
    pub label: String,
    pub confidence: f32,
    pub sigma: f32,
    pub active: bool,
    pub cycles: usize,
    pub alerts_sent: usize,
    pub alerts_received: usize,
}
