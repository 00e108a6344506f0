/// Spacing of the uniform target grid in milliseconds. 100 points at
/// 10 ms covers exactly the one-second classifier window.
pub const TARGET_INTERVAL_MS: f64 = 10.0;

pub struct Resampler;

impl Resampler {
    /// Maps irregularly-timed samples onto a uniform grid by linear
    /// interpolation. Targets before the first sample clamp to the
    /// first value, targets past the last sample clamp to the last
    /// value, and an empty source yields zeros.
    ///
    /// The per-target forward scan is linear; the source arrays stay
    /// small (~150 entries), so simplicity wins over a binary search.
    pub fn interpolate_to_grid(
        times: &[f64],
        values: &[f64],
        count: usize,
        start_offset: f64,
    ) -> Vec<f64> {
        let mut result = vec![0.0; count];
        for (i, slot) in result.iter_mut().enumerate() {
            let target = start_offset + i as f64 * TARGET_INTERVAL_MS;
            let k = times.iter().position(|&t| t > target);
            match k {
                Some(k) if k > 0 => {
                    let (t1, t2) = (times[k - 1], times[k]);
                    let (v1, v2) = (values[k - 1], values[k]);
                    *slot = if t2 - t1 > 0.0 {
                        v1 + (v2 - v1) * ((target - t1) / (t2 - t1))
                    } else {
                        v1
                    };
                }
                Some(_) => *slot = values.first().copied().unwrap_or(0.0),
                None => *slot = values.last().copied().unwrap_or(0.0),
            }
        }
        result
    }
}
