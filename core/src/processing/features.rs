use crate::math::{FrameRotator, Quaternion, Resampler, StatsHelper, ZeroPhaseFilter};
use crate::prelude::SensorSnapshot;
use crate::telemetry::log::LogManager;
use ndarray::Array2;

/// Number of points on the uniform classifier grid.
pub const WINDOW_SIZE: usize = 100;
/// Length of the classifier window in nanoseconds.
pub const WINDOW_NS: i64 = 1_000_000_000;
/// Extra look-back beyond the window start so that a sample bracketing
/// the first grid point is available despite arrival jitter.
pub const SAFE_MARGIN_NS: i64 = 200_000_000;

/// Fixed-shape feature window handed to the classifier: 100x3
/// normalized earth-frame components plus the pre-normalization
/// dispersion statistic. Ephemeral, one per inference cycle.
#[derive(Debug, Clone)]
pub struct FeatureWindow {
    pub wave: Array2<f32>,
    pub sigma: f32,
}

/// Outcome of one feature-building attempt.
#[derive(Debug, Clone)]
pub enum WindowOutcome {
    Ready(FeatureWindow),
    /// No usable samples in the look-back range yet.
    Buffering,
    /// Retained history starts after the window start; a short window
    /// must never silently degrade the classifier input.
    BufferingGap,
}

/// Orchestrates filter, rotator, resampler, and normalization into a
/// classifier-ready window.
pub struct FeatureBuilder {
    logger: LogManager,
}

impl FeatureBuilder {
    pub fn new() -> Self {
        Self {
            logger: LogManager::new("features"),
        }
    }

    /// Builds the feature window for the second preceding `now` (in
    /// buffer-time nanoseconds) from a point-in-time buffer copy.
    pub fn build(&self, buffer: &[SensorSnapshot], now: i64) -> WindowOutcome {
        let window_start = now - WINDOW_NS;
        let relevant: Vec<&SensorSnapshot> = buffer
            .iter()
            .filter(|s| s.timestamp >= window_start - SAFE_MARGIN_NS)
            .collect();

        if relevant.is_empty() {
            return WindowOutcome::Buffering;
        }
        if relevant[0].timestamp > window_start {
            self.logger.record("history gap ahead of window start");
            return WindowOutcome::BufferingGap;
        }

        let rel_time: Vec<f64> = relevant
            .iter()
            .map(|s| (s.timestamp - window_start) as f64 / 1_000_000.0)
            .collect();

        let raw_mx: Vec<f64> = relevant.iter().map(|s| s.mx).collect();
        let raw_my: Vec<f64> = relevant.iter().map(|s| s.my).collect();
        let raw_mz: Vec<f64> = relevant.iter().map(|s| s.mz).collect();

        // Filter first, then rotate each filtered sample with its own
        // quaternion, at the original sample index.
        let filt_mx = ZeroPhaseFilter::filtfilt(&raw_mx);
        let filt_my = ZeroPhaseFilter::filtfilt(&raw_my);
        let filt_mz = ZeroPhaseFilter::filtfilt(&raw_mz);

        let mut earth_mx = vec![0.0; relevant.len()];
        let mut earth_my = vec![0.0; relevant.len()];
        let mut earth_mz = vec![0.0; relevant.len()];
        for (i, s) in relevant.iter().enumerate() {
            let q = Quaternion::new(s.qx, s.qy, s.qz, s.qw);
            let earth = FrameRotator::rotate_to_earth([filt_mx[i], filt_my[i], filt_mz[i]], q);
            earth_mx[i] = earth[0];
            earth_my[i] = earth[1];
            earth_mz[i] = earth[2];
        }

        let interp_mx = Resampler::interpolate_to_grid(&rel_time, &earth_mx, WINDOW_SIZE, 0.0);
        let interp_my = Resampler::interpolate_to_grid(&rel_time, &earth_my, WINDOW_SIZE, 0.0);
        let interp_mz = Resampler::interpolate_to_grid(&rel_time, &earth_mz, WINDOW_SIZE, 0.0);

        let sigma = (StatsHelper::population_std(&interp_mx)
            + StatsHelper::population_std(&interp_my)
            + StatsHelper::population_std(&interp_mz))
            / 3.0;

        let (norm_mx, norm_my, norm_mz) = global_z_score(&interp_mx, &interp_my, &interp_mz);

        let mut wave = Array2::<f32>::zeros((WINDOW_SIZE, 3));
        for i in 0..WINDOW_SIZE {
            wave[[i, 0]] = norm_mx[i] as f32;
            wave[[i, 1]] = norm_my[i] as f32;
            wave[[i, 2]] = norm_mz[i] as f32;
        }

        WindowOutcome::Ready(FeatureWindow {
            wave,
            sigma: sigma as f32,
        })
    }
}

impl Default for FeatureBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Normalizes all three axes against one pooled mean and population
/// standard deviation. The shared scale is intentional: relative axis
/// magnitude differences are a detection feature. A degenerate flat
/// window (std 0) divides by 1 instead.
fn global_z_score(mx: &[f64], my: &[f64], mz: &[f64]) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
    let count = mx.len() + my.len() + mz.len();
    let sum: f64 = mx.iter().chain(my).chain(mz).sum();
    let mean = if count > 0 { sum / count as f64 } else { 0.0 };

    let sum_sq_diff: f64 = mx
        .iter()
        .chain(my)
        .chain(mz)
        .map(|&v| (v - mean) * (v - mean))
        .sum();
    let std = if count > 0 {
        (sum_sq_diff / count as f64).sqrt()
    } else {
        0.0
    };
    let divisor = if std == 0.0 { 1.0 } else { std };

    let normalize = |series: &[f64]| series.iter().map(|&v| (v - mean) / divisor).collect();
    (normalize(mx), normalize(my), normalize(mz))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(timestamp: i64, mx: f64, my: f64, mz: f64) -> SensorSnapshot {
        SensorSnapshot {
            timestamp,
            mx,
            my,
            mz,
            qx: 0.0,
            qy: 0.0,
            qz: 0.0,
            qw: 1.0,
        }
    }

    /// ~110 Hz of constant-orientation samples spanning the given
    /// range, with a small deterministic ripple on x.
    fn steady_trace(start_ns: i64, end_ns: i64) -> Vec<SensorSnapshot> {
        let step = 9_000_000;
        let mut out = Vec::new();
        let mut t = start_ns;
        let mut i = 0u32;
        while t <= end_ns {
            let ripple = ((i % 7) as f64 - 3.0) * 0.01;
            out.push(snapshot(t, 20.0 + ripple, 5.0, -40.0));
            t += step;
            i += 1;
        }
        out
    }

    #[test]
    fn empty_buffer_reports_buffering() {
        let builder = FeatureBuilder::new();
        assert!(matches!(
            builder.build(&[], 5_000_000_000),
            WindowOutcome::Buffering
        ));
    }

    #[test]
    fn stale_only_buffer_reports_buffering() {
        // Samples all older than the look-back range.
        let builder = FeatureBuilder::new();
        let now = 10_000_000_000;
        let trace = steady_trace(0, 8_000_000_000);
        assert!(matches!(
            builder.build(&trace, now),
            WindowOutcome::Buffering
        ));
    }

    #[test]
    fn short_history_reports_gap() {
        // Samples only cover [now - 500ms, now]; the window start is
        // not reachable, so the builder must fail fast.
        let builder = FeatureBuilder::new();
        let now = 10_000_000_000;
        let trace = steady_trace(now - 500_000_000, now);
        assert!(matches!(
            builder.build(&trace, now),
            WindowOutcome::BufferingGap
        ));
    }

    #[test]
    fn full_history_yields_fixed_shape_window() {
        let builder = FeatureBuilder::new();
        let now = 10_000_000_000;
        let trace = steady_trace(now - 1_400_000_000, now);
        match builder.build(&trace, now) {
            WindowOutcome::Ready(window) => {
                assert_eq!(window.wave.shape(), &[WINDOW_SIZE, 3]);
                assert!(window.sigma.is_finite());
            }
            other => panic!("expected a ready window, got {:?}", other),
        }
    }

    #[test]
    fn margin_samples_participate_in_the_window() {
        // A sample 150ms before the window start sits inside the
        // 200ms look-back margin. The slack is preserved behavior:
        // slightly stale samples are included without flagging.
        let builder = FeatureBuilder::new();
        let now = 10_000_000_000;
        let window_start = now - WINDOW_NS;
        let mut trace = vec![snapshot(window_start - 150_000_000, 500.0, 0.0, 0.0)];
        trace.extend(steady_trace(window_start, now));
        match builder.build(&trace, now) {
            WindowOutcome::Ready(_) => {}
            other => panic!("margin sample rejected: {:?}", other),
        }
        // Removing the margin sample must not change the outcome
        // class, proving it was the filter input set that differed.
        let without = steady_trace(window_start, now);
        let with_margin = match builder.build(&trace, now) {
            WindowOutcome::Ready(w) => w,
            _ => unreachable!(),
        };
        let without_margin = match builder.build(&without, now) {
            WindowOutcome::Ready(w) => w,
            _ => unreachable!(),
        };
        // The stale spike leaks into the filtered series, so the two
        // windows differ; this pins the intentional-slack behavior.
        assert_ne!(with_margin.sigma, without_margin.sigma);
    }

    #[test]
    fn normalized_window_has_pooled_mean_zero_and_unit_std() {
        let builder = FeatureBuilder::new();
        let now = 10_000_000_000;
        let trace = steady_trace(now - 1_400_000_000, now);
        let window = match builder.build(&trace, now) {
            WindowOutcome::Ready(w) => w,
            other => panic!("expected a ready window, got {:?}", other),
        };
        let values: Vec<f64> = window.wave.iter().map(|&v| v as f64).collect();
        let mean = StatsHelper::mean(&values);
        let std = StatsHelper::population_std(&values);
        assert!(mean.abs() < 1e-4, "pooled mean {}", mean);
        assert!((std - 1.0).abs() < 1e-3, "pooled std {}", std);
    }

    #[test]
    fn constant_window_normalizes_to_zeros() {
        // Perfectly constant input has zero pooled std; the divisor
        // guard maps everything to exactly zero.
        let builder = FeatureBuilder::new();
        let now = 10_000_000_000;
        let step = 9_000_000;
        let mut trace = Vec::new();
        let mut t = now - 1_400_000_000;
        while t <= now {
            trace.push(snapshot(t, 0.0, 0.0, 0.0));
            t += step;
        }
        let window = match builder.build(&trace, now) {
            WindowOutcome::Ready(w) => w,
            other => panic!("expected a ready window, got {:?}", other),
        };
        assert!(window.wave.iter().all(|&v| v == 0.0));
        assert_eq!(window.sigma, 0.0);
    }

    #[test]
    fn global_z_score_couples_axes_to_one_scale() {
        let (nx, ny, nz) = global_z_score(&[1.0, 1.0], &[1.0, 1.0], &[7.0, 7.0]);
        // Pooled mean 3, pooled std sqrt(8); both axes share them.
        let expected_low = (1.0 - 3.0) / 8.0_f64.sqrt();
        let expected_high = (7.0 - 3.0) / 8.0_f64.sqrt();
        assert!((nx[0] - expected_low).abs() < 1e-12);
        assert!((ny[1] - expected_low).abs() < 1e-12);
        assert!((nz[0] - expected_high).abs() < 1e-12);
    }
}
