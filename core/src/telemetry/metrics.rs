use std::sync::Mutex;

/// Counters for one detection session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub cycles: usize,
    pub classifier_errors: usize,
    pub alerts_sent: usize,
    pub alerts_received: usize,
}

pub struct MetricsRecorder {
    inner: Mutex<MetricsSnapshot>,
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(MetricsSnapshot::default()),
        }
    }

    pub fn record_cycle(&self) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.cycles += 1;
        }
    }

    pub fn record_classifier_error(&self) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.classifier_errors += 1;
        }
    }

    pub fn record_alert_sent(&self) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.alerts_sent += 1;
        }
    }

    pub fn record_alert_received(&self) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.alerts_received += 1;
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        self.inner
            .lock()
            .map(|metrics| *metrics)
            .unwrap_or_default()
    }
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate_independently() {
        let recorder = MetricsRecorder::new();
        recorder.record_cycle();
        recorder.record_cycle();
        recorder.record_classifier_error();
        recorder.record_alert_sent();
        recorder.record_alert_received();

        let snapshot = recorder.snapshot();
        assert_eq!(snapshot.cycles, 2);
        assert_eq!(snapshot.classifier_errors, 1);
        assert_eq!(snapshot.alerts_sent, 1);
        assert_eq!(snapshot.alerts_received, 1);
    }
}
