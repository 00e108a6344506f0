use magcore::math::{FrameRotator, Quaternion};
use magcore::SensorSnapshot;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Ambient geomagnetic field in the earth frame, microtesla. Rough
/// mid-latitude values; the pipeline only cares about deviations.
const BASE_FIELD: [f64; 3] = [20.0, 5.0, -40.0];

/// Configuration for generating synthetic magnetometer traces.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TraceConfig {
    pub duration_ms: u64,
    /// Nominal sensor rate; actual spacing gets per-sample jitter.
    pub rate_hz: f64,
    pub jitter_ms: f64,
    /// Standard deviation of the per-axis noise floor.
    pub noise: f64,
    /// Slow yaw drift so frame rotation actually does work.
    pub spin: bool,
    pub seed: u64,
    pub anomaly: Option<AnomalyConfig>,
}

/// A magnetic-signature segment injected into the trace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnomalyConfig {
    pub start_ms: u64,
    pub end_ms: u64,
    /// Peak amplitude in microtesla on top of the ambient field.
    pub amplitude: f64,
    /// Tone frequency; 30 Hz sits inside the detection passband.
    pub frequency_hz: f64,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            duration_ms: 2000,
            rate_hz: 110.0,
            jitter_ms: 2.0,
            noise: 0.05,
            spin: false,
            seed: 0,
            anomaly: None,
        }
    }
}

impl TraceConfig {
    pub fn with_anomaly(seed: u64) -> Self {
        Self {
            seed,
            anomaly: Some(AnomalyConfig {
                start_ms: 0,
                end_ms: 2000,
                amplitude: 5.0,
                frequency_hz: 30.0,
            }),
            ..Self::default()
        }
    }

    pub fn neutral(seed: u64) -> Self {
        Self {
            seed,
            ..Self::default()
        }
    }
}

/// Stateful sampler producing one snapshot per requested instant.
/// Used both for offline trace construction and the live feed.
pub struct TraceSampler {
    config: TraceConfig,
    rng: StdRng,
}

impl TraceSampler {
    pub fn new(config: TraceConfig) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);
        Self { config, rng }
    }

    /// Synthesizes the sensor reading at `t_ns` (nanoseconds from
    /// trace start): earth-frame field plus anomaly, counter-rotated
    /// into the device frame of the current orientation.
    pub fn sample(&mut self, t_ns: i64) -> SensorSnapshot {
        let t_ms = t_ns as f64 / 1_000_000.0;
        let mut earth = BASE_FIELD;

        if let Some(anomaly) = &self.config.anomaly {
            if t_ms >= anomaly.start_ms as f64 && t_ms <= anomaly.end_ms as f64 {
                let phase = 2.0 * PI * anomaly.frequency_hz * t_ms / 1000.0;
                earth[0] += anomaly.amplitude * phase.sin();
                earth[2] += anomaly.amplitude * 0.5 * phase.cos();
            }
        }
        if self.config.noise > 0.0 {
            for component in &mut earth {
                *component += self.rng.gen_range(-(self.config.noise)..self.config.noise);
            }
        }

        let q = if self.config.spin {
            // 0.2 rad/s yaw drift about the vertical axis.
            let half_angle = 0.2 * (t_ms / 1000.0) / 2.0;
            Quaternion::new(0.0, 0.0, half_angle.sin(), half_angle.cos())
        } else {
            Quaternion::IDENTITY
        };
        // The magnetometer reports the field in the device frame:
        // apply the inverse of the earth-frame transform.
        let device = FrameRotator::rotate_to_earth(earth, q.conjugate());

        SensorSnapshot {
            timestamp: t_ns,
            mx: device[0],
            my: device[1],
            mz: device[2],
            qx: q.x,
            qy: q.y,
            qz: q.z,
            qw: q.w,
        }
    }

    /// Jittered spacing to the next sample, in nanoseconds.
    pub fn next_spacing_ns(&mut self) -> i64 {
        let nominal_ms = 1000.0 / self.config.rate_hz;
        let jitter = if self.config.jitter_ms > 0.0 {
            self.rng
                .gen_range(-(self.config.jitter_ms)..self.config.jitter_ms)
        } else {
            0.0
        };
        let spacing_ms = (nominal_ms + jitter).max(0.5);
        (spacing_ms * 1_000_000.0) as i64
    }
}

/// Builds a complete offline trace covering the configured duration.
pub fn build_trace(config: &TraceConfig) -> Vec<SensorSnapshot> {
    let duration_ns = config.duration_ms as i64 * 1_000_000;
    let mut sampler = TraceSampler::new(config.clone());
    let mut samples = Vec::new();
    let mut t_ns: i64 = 0;
    while t_ns <= duration_ns {
        samples.push(sampler.sample(t_ns));
        t_ns += sampler.next_spacing_ns();
    }
    samples
}
