use crate::inference::{DetectionLabel, DetectionResult};
use crate::prelude::DetectorConfig;
use crate::telemetry::log::LogManager;

/// Binary detection state with a hysteresis band between the release
/// and activation thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionState {
    Neutral,
    Active,
}

/// Edge emitted by an update that crossed a threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Activated,
    Deactivated,
}

/// Converts the per-cycle device probability into a debounced
/// active/neutral state. Probabilities inside the band hold the
/// current state, so no single-sample oscillation is possible near
/// the decision boundary.
pub struct DetectionStateMachine {
    state: DetectionState,
    activation_threshold: f32,
    release_threshold: f32,
    logger: LogManager,
}

impl DetectionStateMachine {
    pub fn new(config: &DetectorConfig) -> Self {
        Self {
            state: DetectionState::Neutral,
            activation_threshold: config.activation_threshold,
            release_threshold: config.release_threshold,
            logger: LogManager::new("detector"),
        }
    }

    pub fn state(&self) -> DetectionState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == DetectionState::Active
    }

    /// The externally visible label each cycle is the current state
    /// name, not the raw classifier label.
    pub fn current_label(&self) -> DetectionLabel {
        match self.state {
            DetectionState::Active => DetectionLabel::Device,
            DetectionState::Neutral => DetectionLabel::Neutral,
        }
    }

    /// Feeds one classification result through the threshold logic
    /// and returns the transition, if any. Buffering and error
    /// results are status signals only; they never reach the
    /// thresholds and leave the state unchanged.
    pub fn update(&mut self, result: &DetectionResult) -> Option<Transition> {
        if !result.label.is_classified() {
            return None;
        }

        let device_probability = if result.label == DetectionLabel::Device {
            result.confidence
        } else {
            1.0 - result.confidence
        };

        match self.state {
            DetectionState::Neutral if device_probability > self.activation_threshold => {
                self.state = DetectionState::Active;
                self.logger.record(&format!(
                    "detection activated, device probability {:.3}",
                    device_probability
                ));
                Some(Transition::Activated)
            }
            DetectionState::Active if device_probability < self.release_threshold => {
                self.state = DetectionState::Neutral;
                self.logger.record(&format!(
                    "detection released, device probability {:.3}",
                    device_probability
                ));
                Some(Transition::Deactivated)
            }
            _ => None,
        }
    }

    pub fn reset(&mut self) {
        self.state = DetectionState::Neutral;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn machine() -> DetectionStateMachine {
        DetectionStateMachine::new(&DetectorConfig::default())
    }

    fn device(confidence: f32) -> DetectionResult {
        DetectionResult::new(DetectionLabel::Device, confidence, 0.0)
    }

    fn neutral(confidence: f32) -> DetectionResult {
        DetectionResult::new(DetectionLabel::Neutral, confidence, 0.0)
    }

    #[test]
    fn activates_above_threshold_only() {
        let mut sm = machine();
        assert_eq!(sm.update(&device(0.75)), None);
        assert_eq!(sm.state(), DetectionState::Neutral);
        assert_eq!(sm.update(&device(0.76)), Some(Transition::Activated));
        assert_eq!(sm.current_label(), DetectionLabel::Device);
    }

    #[test]
    fn band_holds_active_state() {
        let mut sm = machine();
        sm.update(&device(0.9));
        assert!(sm.is_active());
        // Anything in [0.30, 0.75] holds Active.
        for p in [0.30, 0.40, 0.50, 0.74, 0.75] {
            assert_eq!(sm.update(&device(p)), None);
            assert!(sm.is_active());
        }
        assert_eq!(sm.update(&device(0.29)), Some(Transition::Deactivated));
        assert_eq!(sm.current_label(), DetectionLabel::Neutral);
    }

    #[test]
    fn neutral_label_feeds_inverted_probability() {
        let mut sm = machine();
        // Neutral at confidence 0.1 means device probability 0.9.
        assert_eq!(sm.update(&neutral(0.1)), Some(Transition::Activated));
        // Neutral at 0.9 means device probability 0.1, below release.
        assert_eq!(sm.update(&neutral(0.9)), Some(Transition::Deactivated));
    }

    #[test]
    fn no_oscillation_within_the_band() {
        let mut sm = machine();
        sm.update(&device(0.8));
        let mut transitions = 0;
        for p in [0.5, 0.6, 0.31, 0.74, 0.45, 0.7, 0.35] {
            if sm.update(&device(p)).is_some() {
                transitions += 1;
            }
        }
        assert_eq!(transitions, 0);
        assert!(sm.is_active());
    }

    #[test]
    fn status_results_leave_state_unchanged() {
        let mut sm = machine();
        sm.update(&device(0.9));
        for label in [
            DetectionLabel::Buffering,
            DetectionLabel::BufferingGap,
            DetectionLabel::Error,
        ] {
            let result = DetectionResult::status(label);
            assert_eq!(sm.update(&result), None);
            assert!(sm.is_active());
        }
    }

    #[test]
    fn reset_returns_to_neutral_without_transition() {
        let mut sm = machine();
        sm.update(&device(0.9));
        sm.reset();
        assert_eq!(sm.state(), DetectionState::Neutral);
    }
}
