//! Sensor-fusion and detection core for the magsense platform.
//!
//! The modules turn an irregular, device-frame magnetometer stream into
//! fixed-shape classifier windows, run a hysteretic detection state
//! machine over the classifier output, and corroborate detections with
//! nearby peers over broadcast UDP.

pub mod inference;
pub mod math;
pub mod peer;
pub mod prelude;
pub mod processing;
pub mod session;
pub mod telemetry;

pub use prelude::{DetectorConfig, PipelineError, PipelineResult, SensorSnapshot};
