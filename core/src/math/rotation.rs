/// Unit orientation quaternion as delivered by the sensor source.
/// Normalization is assumed, not validated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quaternion {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

impl Quaternion {
    pub const IDENTITY: Self = Self {
        x: 0.0,
        y: 0.0,
        z: 0.0,
        w: 1.0,
    };

    pub fn new(x: f64, y: f64, z: f64, w: f64) -> Self {
        Self { x, y, z, w }
    }

    pub fn conjugate(&self) -> Self {
        Self {
            x: -self.x,
            y: -self.y,
            z: -self.z,
            w: self.w,
        }
    }
}

pub struct FrameRotator;

impl FrameRotator {
    /// Rotates a device-frame vector into the earth frame using the
    /// conjugate of the supplied orientation quaternion.
    ///
    /// The conjugate-vs-raw convention is load-bearing: it decides
    /// whether the anomaly signature aligns across device
    /// orientations, and getting it backward degrades the classifier
    /// silently instead of raising an error.
    pub fn rotate_to_earth(v: [f64; 3], q: Quaternion) -> [f64; 3] {
        let (qx, qy, qz, qw) = (-q.x, -q.y, -q.z, q.w);
        let (vx, vy, vz) = (v[0], v[1], v[2]);

        let c1x = qy * vz - qz * vy;
        let c1y = qz * vx - qx * vz;
        let c1z = qx * vy - qy * vx;
        let t1x = c1x + qw * vx;
        let t1y = c1y + qw * vy;
        let t1z = c1z + qw * vz;
        let c2x = qy * t1z - qz * t1y;
        let c2y = qz * t1x - qx * t1z;
        let c2z = qx * t1y - qy * t1x;

        [vx + 2.0 * c2x, vy + 2.0 * c2y, vz + 2.0 * c2z]
    }
}
