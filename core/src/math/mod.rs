pub mod filter;
pub mod resample;
pub mod rotation;
pub mod stats;

pub use filter::ZeroPhaseFilter;
pub use resample::Resampler;
pub use rotation::{FrameRotator, Quaternion};
pub use stats::StatsHelper;
