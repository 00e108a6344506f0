use anyhow::Context;
use magcore::prelude::DetectorConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub peer_port: u16,
    pub activation_threshold: f32,
    pub release_threshold: f32,
    pub inference_interval_ms: u64,
    /// Sigma pivot for the stand-in energy classifier.
    pub sigma_threshold: f32,
}

impl Default for ScanConfig {
    fn default() -> Self {
        let detector = DetectorConfig::default();
        Self {
            peer_port: detector.peer_port,
            activation_threshold: detector.activation_threshold,
            release_threshold: detector.release_threshold,
            inference_interval_ms: detector.inference_interval_ms,
            sigma_threshold: 1.0,
        }
    }
}

impl ScanConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading scan config {}", path_ref.display()))?;
        let config: ScanConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing scan config {}", path_ref.display()))?;
        Ok(config)
    }

    pub fn from_args(peer_port: u16, sigma_threshold: f32) -> Self {
        Self {
            peer_port,
            sigma_threshold,
            ..Self::default()
        }
    }

    pub fn to_detector_config(&self) -> DetectorConfig {
        DetectorConfig {
            peer_port: self.peer_port,
            activation_threshold: self.activation_threshold,
            release_threshold: self.release_threshold,
            inference_interval_ms: self.inference_interval_ms,
        }
    }
}
