//! Detection session: wires the sample buffer, feature builder,
//! classifier adapter, state machine, and peer link into one
//! long-lived object with an outbound event channel.

use crate::inference::{Classifier, ClassifierAdapter, DetectionLabel};
use crate::peer::PeerLink;
use crate::prelude::{DetectorConfig, PipelineResult, SensorSnapshot};
use crate::processing::{DetectionStateMachine, FeatureBuilder, SampleBuffer, Transition};
use crate::telemetry::log::LogManager;
use crate::telemetry::metrics::{MetricsRecorder, MetricsSnapshot};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

/// Alerts sent per activation burst.
pub const ALERT_BURST_COUNT: usize = 5;
/// Spacing between burst sends; also gives the radio time to wake.
pub const ALERT_BURST_SPACING_MS: u64 = 200;
/// Period of the repeating local-feedback tick while active.
pub const FEEDBACK_INTERVAL_MS: u64 = 1000;
/// A classification cycle only fires once the buffer covers the full
/// one-second window.
pub const MIN_WINDOW_SPAN_NS: i64 = 1_000_000_000;

/// Outbound callback surface consumed by the UI layer. One channel,
/// one closed set of variants.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// Free-text status line.
    Status(String),
    /// Raw magnetometer magnitude, one per sensor event.
    Magnitude(f32),
    /// Per-cycle detection output.
    Prediction {
        label: DetectionLabel,
        confidence: f32,
        sigma: f32,
    },
    /// A peer on the local network reported a detection.
    PeerAlert { sender_short: String },
    /// Repeating cue (vibration/sound in the UI layer) while active.
    LocalFeedback,
}

/// Long-lived detection session. The sample buffer is the only
/// structure shared between the producer path (`ingest`) and the
/// periodic inference loop; everything else is owned here.
pub struct DetectionSession {
    config: DetectorConfig,
    buffer: Arc<SampleBuffer>,
    adapter: Arc<ClassifierAdapter>,
    detector: Mutex<DetectionStateMachine>,
    peer: Arc<PeerLink>,
    events: mpsc::UnboundedSender<SessionEvent>,
    metrics: Arc<MetricsRecorder>,
    running: AtomicBool,
    inference_task: Mutex<Option<JoinHandle<()>>>,
    feedback_task: Mutex<Option<JoinHandle<()>>>,
    listener_task: Mutex<Option<JoinHandle<()>>>,
    logger: LogManager,
}

impl DetectionSession {
    /// Binds the peer socket, starts the inbound listener, and hands
    /// back the session together with the event receiver. Detection
    /// itself starts only on `start()`.
    pub async fn connect(
        config: DetectorConfig,
        session_uuid: String,
        classifier: Box<dyn Classifier>,
    ) -> PipelineResult<(Arc<Self>, mpsc::UnboundedReceiver<SessionEvent>)> {
        let peer = PeerLink::bind(session_uuid, config.peer_port).await?;
        Ok(Self::connect_with_link(config, peer, classifier))
    }

    /// Variant taking an already-bound link, for callers that pin the
    /// alert target before the session takes ownership of the socket.
    pub fn connect_with_link(
        config: DetectorConfig,
        peer: PeerLink,
        classifier: Box<dyn Classifier>,
    ) -> (Arc<Self>, mpsc::UnboundedReceiver<SessionEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();

        let session = Arc::new(Self {
            detector: Mutex::new(DetectionStateMachine::new(&config)),
            config,
            buffer: Arc::new(SampleBuffer::new()),
            adapter: Arc::new(ClassifierAdapter::new(classifier)),
            peer: Arc::new(peer),
            events: tx,
            metrics: Arc::new(MetricsRecorder::new()),
            running: AtomicBool::new(false),
            inference_task: Mutex::new(None),
            feedback_task: Mutex::new(None),
            listener_task: Mutex::new(None),
            logger: LogManager::new("session"),
        });

        session.spawn_listener();
        (session, rx)
    }

    /// Producer path. Emits the raw magnitude for the UI stream and,
    /// while detecting, appends to the buffer. Never blocks on
    /// inference.
    pub fn ingest(&self, snapshot: SensorSnapshot) {
        self.emit(SessionEvent::Magnitude(snapshot.magnitude() as f32));
        if self.running.load(Ordering::SeqCst) {
            self.buffer.push(snapshot);
        }
    }

    /// Starts detecting: clears state from any previous run and
    /// spawns the periodic inference loop.
    pub fn start(self: &Arc<Self>) {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }
        self.buffer.clear();
        self.lock_detector().reset();
        self.logger.record("detection session started");
        self.emit(SessionEvent::Status("Detecting...".into()));

        // The loop holds only a weak handle so a dropped session does
        // not keep its own task alive.
        let session = Arc::downgrade(self);
        let interval_ms = self.config.inference_interval_ms;
        let handle = tokio::spawn(async move {
            Self::inference_loop(session, interval_ms).await;
        });
        self.store_task(&self.inference_task, handle);
    }

    /// Stops detecting synchronously: the feedback tick halts, state
    /// resets to neutral, and any in-flight cycle is discarded.
    pub fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        if let Some(handle) = self.take_task(&self.inference_task) {
            handle.abort();
        }
        self.cancel_feedback_tick();
        self.lock_detector().reset();
        self.logger.record("detection session stopped");
        self.emit(SessionEvent::Status("Detection stopped".into()));
        self.emit(SessionEvent::Prediction {
            label: DetectionLabel::Neutral,
            confidence: 0.0,
            sigma: 0.0,
        });
    }

    pub fn is_active(&self) -> bool {
        self.lock_detector().is_active()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn peer(&self) -> &Arc<PeerLink> {
        &self.peer
    }

    async fn inference_loop(session: std::sync::Weak<Self>, interval_ms: u64) {
        let builder = FeatureBuilder::new();
        let mut ticker = interval(Duration::from_millis(interval_ms));
        // A cycle that outlives its interval must not queue a backlog
        // of catch-up cycles behind it.
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            let session = match session.upgrade() {
                Some(session) => session,
                None => break,
            };
            if !session.running.load(Ordering::SeqCst) {
                break;
            }
            if session.buffer.span_ns() < MIN_WINDOW_SPAN_NS {
                continue;
            }
            let now = match session.buffer.latest_timestamp() {
                Some(ts) => ts,
                None => continue,
            };

            let view = session.buffer.snapshot_view();
            let outcome = builder.build(&view, now);
            let result = session.adapter.evaluate(&outcome);
            session.metrics.record_cycle();
            if result.label == DetectionLabel::Error {
                session.metrics.record_classifier_error();
            }

            // A cycle finishing after stop must not resurrect an
            // active state. The re-check, the state-machine update,
            // and the transition side effects all happen under the
            // feedback-task slot lock: stop() flips `running` before
            // draining that slot, so a racing cycle either finishes
            // its side effects first (and its tick gets aborted by
            // stop) or observes the flag and bails out.
            {
                let mut feedback_slot = session
                    .feedback_task
                    .lock()
                    .unwrap_or_else(|e| e.into_inner());
                if !session.running.load(Ordering::SeqCst) {
                    break;
                }
                match session.lock_detector().update(&result) {
                    Some(Transition::Activated) => {
                        session
                            .emit(SessionEvent::Status("Magnetic anomaly detected".into()));
                        session.spawn_alert_burst();
                        let handle = session.feedback_tick_task();
                        if let Some(previous) = feedback_slot.replace(handle) {
                            previous.abort();
                        }
                    }
                    Some(Transition::Deactivated) => {
                        if let Some(handle) = feedback_slot.take() {
                            handle.abort();
                        }
                    }
                    None => {}
                }

                // Emitting under the same lock keeps a discarded
                // cycle fully silent: once stop() has drained the
                // slot, no event from this cycle can trail it.
                let label = if result.label.is_classified() {
                    session.lock_detector().current_label()
                } else {
                    result.label
                };
                session.emit(SessionEvent::Prediction {
                    label,
                    confidence: result.confidence,
                    sigma: result.sigma,
                });
            }
        }
    }

    /// One burst per activation: `ALERT_BURST_COUNT` sends spaced
    /// `ALERT_BURST_SPACING_MS` apart, each internally redundant.
    /// Send failures are logged and swallowed; there is no retry
    /// beyond the fixed redundancy.
    fn spawn_alert_burst(&self) {
        let peer = Arc::clone(&self.peer);
        let metrics = Arc::clone(&self.metrics);
        tokio::spawn(async move {
            let logger = LogManager::new("peer");
            for _ in 0..ALERT_BURST_COUNT {
                match peer.send_alert().await {
                    Ok(()) => metrics.record_alert_sent(),
                    Err(err) => logger.record(&format!("peer alert send failed: {}", err)),
                }
                tokio::time::sleep(Duration::from_millis(ALERT_BURST_SPACING_MS)).await;
            }
        });
    }

    /// Spawns the repeating local-feedback tick; the caller stores
    /// the handle in the feedback slot under its own lock.
    fn feedback_tick_task(&self) -> JoinHandle<()> {
        let events = self.events.clone();
        tokio::spawn(async move {
            let mut ticker = interval(Duration::from_millis(FEEDBACK_INTERVAL_MS));
            loop {
                ticker.tick().await;
                let _ = events.send(SessionEvent::LocalFeedback);
            }
        })
    }

    fn cancel_feedback_tick(&self) {
        if let Some(handle) = self.take_task(&self.feedback_task) {
            handle.abort();
        }
    }

    /// Inbound alerts surface on the same event channel as local
    /// results. The loop survives malformed datagrams (dropped inside
    /// the link) and ends only on a socket error.
    fn spawn_listener(&self) {
        let peer = Arc::clone(&self.peer);
        let metrics = Arc::clone(&self.metrics);
        let events = self.events.clone();
        let handle = tokio::spawn(async move {
            let logger = LogManager::new("peer");
            loop {
                match peer.recv_alert().await {
                    Ok(alert) => {
                        metrics.record_alert_received();
                        let _ = events.send(SessionEvent::Status(format!(
                            "ALERT FROM {}",
                            alert.sender_short
                        )));
                        let _ = events.send(SessionEvent::PeerAlert {
                            sender_short: alert.sender_short,
                        });
                    }
                    Err(err) => {
                        logger.record(&format!("peer listener stopped: {}", err));
                        break;
                    }
                }
            }
        });
        self.store_task(&self.listener_task, handle);
    }

    fn emit(&self, event: SessionEvent) {
        // A dropped receiver just means no UI is attached.
        let _ = self.events.send(event);
    }

    fn lock_detector(&self) -> std::sync::MutexGuard<'_, DetectionStateMachine> {
        self.detector.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn store_task(
        &self,
        slot: &Mutex<Option<JoinHandle<()>>>,
        handle: JoinHandle<()>,
    ) -> Option<JoinHandle<()>> {
        slot.lock().unwrap_or_else(|e| e.into_inner()).replace(handle)
    }

    fn take_task(&self, slot: &Mutex<Option<JoinHandle<()>>>) -> Option<JoinHandle<()>> {
        slot.lock().unwrap_or_else(|e| e.into_inner()).take()
    }
}

impl Drop for DetectionSession {
    fn drop(&mut self) {
        for slot in [&self.inference_task, &self.feedback_task, &self.listener_task] {
            if let Some(handle) = slot.lock().unwrap_or_else(|e| e.into_inner()).take() {
                handle.abort();
            }
        }
    }
}
