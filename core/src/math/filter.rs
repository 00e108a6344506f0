/// Fixed 4th-order IIR tuned for the magnetic-signature band at the
/// 100 Hz resampling rate. The coefficients are deployment constants;
/// the trained classifier depends on bit-for-bit equivalent
/// preprocessing, so they are never re-derived at runtime.
const B: [f64; 5] = [
    0.43284664499029174,
    -1.731386579961167,
    2.5970798699417506,
    -1.731386579961167,
    0.43284664499029174,
];
const A: [f64; 5] = [
    1.0,
    -2.3695130071820376,
    2.31398841441588,
    -1.0546654058785674,
    0.18737949236818488,
];

/// Zero-phase smoothing helper wrapping the fixed IIR recursion.
pub struct ZeroPhaseFilter;

impl ZeroPhaseFilter {
    /// Applies the recursion forward, reverses, applies it again, and
    /// reverses back. The forward and backward phase shifts cancel, at
    /// the cost of needing the whole signal in memory.
    pub fn filtfilt(data: &[f64]) -> Vec<f64> {
        let forward = Self::lfilter(data);
        let mut reversed: Vec<f64> = forward.into_iter().rev().collect();
        reversed = Self::lfilter(&reversed);
        reversed.reverse();
        reversed
    }

    /// Direct-form causal recursion. Out-of-range indices contribute
    /// zero; no wraparound or reflection padding.
    fn lfilter(x: &[f64]) -> Vec<f64> {
        let mut y = vec![0.0; x.len()];
        for n in 0..x.len() {
            for (i, &b) in B.iter().enumerate() {
                if n >= i {
                    y[n] += b * x[n - i];
                }
            }
            for (j, &a) in A.iter().enumerate().skip(1) {
                if n >= j {
                    y[n] -= a * y[n - j];
                }
            }
            y[n] /= A[0];
        }
        y
    }
}
