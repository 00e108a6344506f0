use serde::{Deserialize, Serialize};

/// Shared configuration for a detection session.
///
/// Filter coefficients, window geometry, and grid spacing are fixed
/// deployment constants owned by their modules; only the values a
/// deployment may reasonably override live here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// UDP port shared by all peers on the local network.
    pub peer_port: u16,
    /// Device probability above which `Neutral` becomes `Active`.
    pub activation_threshold: f32,
    /// Device probability below which `Active` returns to `Neutral`.
    pub release_threshold: f32,
    /// Spacing between classification cycles in milliseconds.
    pub inference_interval_ms: u64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            peer_port: 8888,
            activation_threshold: 0.75,
            release_threshold: 0.30,
            inference_interval_ms: 100,
        }
    }
}

/// One raw sensor event: device-frame magnetometer reading plus the
/// orientation quaternion captured at the same instant.
///
/// Timestamps are monotonic nanoseconds and non-decreasing in arrival
/// order within a buffer; duplicates are possible.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorSnapshot {
    pub timestamp: i64,
    pub mx: f64,
    pub my: f64,
    pub mz: f64,
    pub qx: f64,
    pub qy: f64,
    pub qz: f64,
    pub qw: f64,
}

impl SensorSnapshot {
    /// Total field strength of the raw magnetometer vector.
    pub fn magnitude(&self) -> f64 {
        (self.mx * self.mx + self.my * self.my + self.mz * self.mz).sqrt()
    }
}

/// Common error type for the detection pipeline.
#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error("classifier failure: {0}")]
    Classifier(String),
    #[error("network failure: {0}")]
    Network(#[from] std::io::Error),
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

pub type PipelineResult<T> = Result<T, PipelineError>;
