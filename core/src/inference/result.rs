use serde::{Deserialize, Serialize};

/// Outcome label of one classification cycle.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum DetectionLabel {
    Neutral,
    Device,
    /// Not enough buffered history yet; expected during warm-up.
    Buffering,
    /// History exists but does not reach back to the window start.
    BufferingGap,
    /// Classifier boundary failure; the pipeline keeps running.
    Error,
}

impl DetectionLabel {
    /// True for the labels that carry a usable class probability.
    pub fn is_classified(&self) -> bool {
        matches!(self, DetectionLabel::Neutral | DetectionLabel::Device)
    }
}

impl std::fmt::Display for DetectionLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            DetectionLabel::Neutral => "Neutral",
            DetectionLabel::Device => "Device",
            DetectionLabel::Buffering => "Buffering",
            DetectionLabel::BufferingGap => "Buffering (Gap)",
            DetectionLabel::Error => "Error",
        };
        f.write_str(name)
    }
}

/// Result of one classification cycle, consumed by the detection
/// state machine and surfaced on the session event channel.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DetectionResult {
    pub label: DetectionLabel,
    pub confidence: f32,
    pub sigma: f32,
}

impl DetectionResult {
    pub fn new(label: DetectionLabel, confidence: f32, sigma: f32) -> Self {
        Self {
            label,
            confidence,
            sigma,
        }
    }

    /// Zero-confidence status result (buffering or error).
    pub fn status(label: DetectionLabel) -> Self {
        Self::new(label, 0.0, 0.0)
    }
}
