use log::info;

/// Facade over the `log` macros that stamps every record with the
/// pipeline component it came from, so one session's interleaved
/// output stays attributable.
pub struct LogManager {
    component: &'static str,
}

impl LogManager {
    pub fn new(component: &'static str) -> Self {
        Self { component }
    }

    pub fn component(&self) -> &'static str {
        self.component
    }

    pub fn record(&self, message: &str) {
        info!(target: self.component, "{}", message);
    }
}
