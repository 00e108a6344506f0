pub mod buffer;
pub mod detector;
pub mod features;

pub use buffer::SampleBuffer;
pub use detector::{DetectionState, DetectionStateMachine, Transition};
pub use features::{FeatureBuilder, FeatureWindow, WindowOutcome};
