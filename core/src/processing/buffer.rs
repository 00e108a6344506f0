use crate::prelude::SensorSnapshot;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Retention horizon: samples older than this relative to the newest
/// entry are evicted on every push.
pub const RETENTION_NS: i64 = 1_500_000_000;

/// Time-bounded ordered collection of raw sensor snapshots, written
/// by the producer thread and read by periodic consumers.
///
/// Append/evict and snapshot reads run under one mutex; readers copy
/// out before releasing the lock, so feature computation never runs
/// while holding it. Memory is bounded by retention x sample rate,
/// with no explicit size cap.
pub struct SampleBuffer {
    inner: Mutex<VecDeque<SensorSnapshot>>,
}

impl SampleBuffer {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(VecDeque::new()),
        }
    }

    /// Appends at the tail, then evicts from the head while the head
    /// is older than the retention horizon behind the newest entry.
    pub fn push(&self, snapshot: SensorSnapshot) {
        let mut guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let latest = snapshot.timestamp;
        guard.push_back(snapshot);
        while let Some(head) = guard.front() {
            if head.timestamp < latest - RETENTION_NS {
                guard.pop_front();
            } else {
                break;
            }
        }
    }

    /// Consistent point-in-time copy. Callers must not assume it is
    /// later than wall-clock "now".
    pub fn snapshot_view(&self) -> Vec<SensorSnapshot> {
        let guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        guard.iter().copied().collect()
    }

    pub fn clear(&self) {
        let mut guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        guard.clear();
    }

    pub fn latest_timestamp(&self) -> Option<i64> {
        let guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        guard.back().map(|s| s.timestamp)
    }

    /// Time span covered by the retained entries, in nanoseconds.
    pub fn span_ns(&self) -> i64 {
        let guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        match (guard.front(), guard.back()) {
            (Some(first), Some(last)) => last.timestamp - first.timestamp,
            _ => 0,
        }
    }
}

impl Default for SampleBuffer {
    fn default() -> Self {
        Self::new()
    }
}
