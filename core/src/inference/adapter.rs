use crate::inference::result::{DetectionLabel, DetectionResult};
use crate::prelude::PipelineResult;
use crate::processing::features::{FeatureWindow, WindowOutcome};
use crate::telemetry::log::LogManager;

/// Raw class scores returned by the inference engine. No contract
/// beyond "higher is more likely".
#[derive(Debug, Clone, Copy)]
pub struct ClassScores {
    pub neutral: f32,
    pub device: f32,
}

/// External inference boundary: a fixed-shape 100x3 window plus a
/// scalar sigma in, two class scores out. Implementations are
/// pluggable oracles; the core only assumes bounded latency.
pub trait Classifier: Send + Sync {
    fn classify(&self, window: &FeatureWindow) -> PipelineResult<ClassScores>;
}

/// Wraps a classifier so that every boundary failure degrades to an
/// `Error` result instead of propagating.
pub struct ClassifierAdapter {
    classifier: Box<dyn Classifier>,
    logger: LogManager,
}

impl ClassifierAdapter {
    pub fn new(classifier: Box<dyn Classifier>) -> Self {
        Self {
            classifier,
            logger: LogManager::new("classifier"),
        }
    }

    /// Converts a feature-builder outcome into a detection result.
    /// Buffering outcomes pass through as zero-confidence status;
    /// ready windows are scored, with argmax deciding the label and
    /// ties resolving to `Neutral`.
    pub fn evaluate(&self, outcome: &WindowOutcome) -> DetectionResult {
        let window = match outcome {
            WindowOutcome::Ready(window) => window,
            WindowOutcome::Buffering => {
                return DetectionResult::status(DetectionLabel::Buffering)
            }
            WindowOutcome::BufferingGap => {
                return DetectionResult::status(DetectionLabel::BufferingGap)
            }
        };

        match self.classifier.classify(window) {
            Ok(scores) => {
                let (label, confidence) = if scores.device > scores.neutral {
                    (DetectionLabel::Device, scores.device)
                } else {
                    (DetectionLabel::Neutral, scores.neutral)
                };
                DetectionResult::new(label, confidence, window.sigma)
            }
            Err(err) => {
                self.logger.record(&format!("classifier failure: {}", err));
                DetectionResult::status(DetectionLabel::Error)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prelude::PipelineError;
    use ndarray::Array2;

    struct FailingClassifier;

    impl Classifier for FailingClassifier {
        fn classify(&self, _window: &FeatureWindow) -> PipelineResult<ClassScores> {
            Err(PipelineError::Classifier("model not loaded".into()))
        }
    }

    struct FixedClassifier(f32, f32);

    impl Classifier for FixedClassifier {
        fn classify(&self, _window: &FeatureWindow) -> PipelineResult<ClassScores> {
            Ok(ClassScores {
                neutral: self.0,
                device: self.1,
            })
        }
    }

    fn blank_window() -> WindowOutcome {
        WindowOutcome::Ready(FeatureWindow {
            wave: Array2::zeros((100, 3)),
            sigma: 0.5,
        })
    }

    #[test]
    fn classifier_failure_degrades_to_error_result() {
        let adapter = ClassifierAdapter::new(Box::new(FailingClassifier));
        let result = adapter.evaluate(&blank_window());
        assert_eq!(result.label, DetectionLabel::Error);
        assert_eq!(result.confidence, 0.0);
    }

    #[test]
    fn argmax_picks_winning_score() {
        let adapter = ClassifierAdapter::new(Box::new(FixedClassifier(0.2, 0.9)));
        let result = adapter.evaluate(&blank_window());
        assert_eq!(result.label, DetectionLabel::Device);
        assert_eq!(result.confidence, 0.9);
        assert_eq!(result.sigma, 0.5);
    }

    #[test]
    fn tied_scores_resolve_to_neutral() {
        let adapter = ClassifierAdapter::new(Box::new(FixedClassifier(0.5, 0.5)));
        let result = adapter.evaluate(&blank_window());
        assert_eq!(result.label, DetectionLabel::Neutral);
    }

    #[test]
    fn buffering_outcomes_pass_through_as_status() {
        let adapter = ClassifierAdapter::new(Box::new(FixedClassifier(0.0, 1.0)));
        let result = adapter.evaluate(&WindowOutcome::Buffering);
        assert_eq!(result.label, DetectionLabel::Buffering);
        let result = adapter.evaluate(&WindowOutcome::BufferingGap);
        assert_eq!(result.label, DetectionLabel::BufferingGap);
    }
}
