pub mod adapter;
pub mod result;

pub use adapter::{ClassScores, Classifier, ClassifierAdapter};
pub use result::{DetectionLabel, DetectionResult};
