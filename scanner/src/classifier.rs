use magcore::inference::{ClassScores, Classifier};
use magcore::processing::features::FeatureWindow;
use magcore::PipelineResult;

/// Driver-side stand-in for the neural oracle: maps the window's
/// dispersion statistic through a logistic curve. Good enough to
/// exercise the full pipeline when no trained model is attached.
pub struct EnergyClassifier {
    pub sigma_threshold: f32,
    pub sharpness: f32,
}

impl EnergyClassifier {
    pub fn new(sigma_threshold: f32) -> Self {
        Self {
            sigma_threshold,
            sharpness: 8.0,
        }
    }
}

impl Classifier for EnergyClassifier {
    fn classify(&self, window: &FeatureWindow) -> PipelineResult<ClassScores> {
        let x = (window.sigma - self.sigma_threshold) * self.sharpness;
        let device = 1.0 / (1.0 + (-x).exp());
        Ok(ClassScores {
            neutral: 1.0 - device,
            device,
        })
    }
}

/// Constant-score oracle for forced scenarios and tests.
pub struct FixedClassifier {
    pub neutral: f32,
    pub device: f32,
}

impl Classifier for FixedClassifier {
    fn classify(&self, _window: &FeatureWindow) -> PipelineResult<ClassScores> {
        Ok(ClassScores {
            neutral: self.neutral,
            device: self.device,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn window_with_sigma(sigma: f32) -> FeatureWindow {
        FeatureWindow {
            wave: Array2::zeros((100, 3)),
            sigma,
        }
    }

    #[test]
    fn quiet_window_scores_neutral() {
        let classifier = EnergyClassifier::new(1.0);
        let scores = classifier.classify(&window_with_sigma(0.1)).unwrap();
        assert!(scores.neutral > scores.device);
    }

    #[test]
    fn energetic_window_scores_device() {
        let classifier = EnergyClassifier::new(1.0);
        let scores = classifier.classify(&window_with_sigma(3.0)).unwrap();
        assert!(scores.device > 0.9);
    }
}
