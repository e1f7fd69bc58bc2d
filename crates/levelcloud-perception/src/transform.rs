//! Rotation primitives.
//!
//! [`Quaternion`] is the attitude representation delivered by the IMU and
//! knows how to decompose itself into fixed-axis roll/pitch/yaw angles.
//! [`Rotation3`] is the 3×3 matrix the leveler applies to every point.
//!
//! # Example
//!
//! ```rust
//! use levelcloud_perception::transform::{Point3, Rotation3};
//!
//! let r = Rotation3::about_y(0.0).mul(&Rotation3::about_x(0.0));
//! let p = r.apply(Point3::new(1.0, 2.0, 3.0));
//! assert!((p.y - 2.0).abs() < 1e-6);
//! ```

use std::f64::consts::FRAC_PI_2;

use levelcloud_types::QuaternionMsg;

// ────────────────────────────────────────────────────────────────────────────
// Primitive types
// ────────────────────────────────────────────────────────────────────────────

/// A single 3-D point.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Point3 {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// `true` when all three coordinates are finite.
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

/// A quaternion in (w, x, y, z) convention.  Not required to be unit length.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quaternion {
    pub w: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Fixed-axis roll/pitch/yaw angles in radians.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rpy {
    pub roll: f64,
    pub pitch: f64,
    pub yaw: f64,
}

impl Quaternion {
    pub fn new(w: f64, x: f64, y: f64, z: f64) -> Self {
        Self { w, x, y, z }
    }

    /// Build from roll/pitch/yaw: `Rz(yaw) · Ry(pitch) · Rx(roll)`.
    #[cfg(test)]
    pub(crate) fn from_rpy(roll: f64, pitch: f64, yaw: f64) -> Self {
        let (sr, cr) = (roll * 0.5).sin_cos();
        let (sp, cp) = (pitch * 0.5).sin_cos();
        let (sy, cy) = (yaw * 0.5).sin_cos();
        Self::new(
            cr * cp * cy + sr * sp * sy,
            sr * cp * cy - cr * sp * sy,
            cr * sp * cy + sr * cp * sy,
            cr * cp * sy - sr * sp * cy,
        )
    }

    /// Expand into a row-major rotation matrix.
    ///
    /// Scales by `2 / |q|²`, so a non-unit quaternion still yields a proper
    /// rotation; a zero quaternion yields NaN entries.
    pub fn to_matrix(self) -> [[f64; 3]; 3] {
        let d = self.w * self.w + self.x * self.x + self.y * self.y + self.z * self.z;
        let s = 2.0 / d;
        let (xs, ys, zs) = (self.x * s, self.y * s, self.z * s);
        let (wx, wy, wz) = (self.w * xs, self.w * ys, self.w * zs);
        let (xx, xy, xz) = (self.x * xs, self.x * ys, self.x * zs);
        let (yy, yz, zz) = (self.y * ys, self.y * zs, self.z * zs);
        [
            [1.0 - (yy + zz), xy - wz, xz + wy],
            [xy + wz, 1.0 - (xx + zz), yz - wx],
            [xz - wy, yz + wx, 1.0 - (xx + yy)],
        ]
    }

    /// Decompose into fixed-axis roll (X), pitch (Y), yaw (Z).
    ///
    /// At gimbal lock (`|m20| >= 1`) yaw is pinned to zero and the whole
    /// residual rotation is attributed to roll.
    pub fn to_rpy(self) -> Rpy {
        let m = self.to_matrix();
        if m[2][0].abs() >= 1.0 {
            let pitch = if m[2][0] < 0.0 { FRAC_PI_2 } else { -FRAC_PI_2 };
            return Rpy {
                roll: (-m[1][2]).atan2(m[1][1]),
                pitch,
                yaw: 0.0,
            };
        }
        Rpy {
            roll: m[2][1].atan2(m[2][2]),
            pitch: -m[2][0].asin(),
            yaw: m[1][0].atan2(m[0][0]),
        }
    }
}

impl From<QuaternionMsg> for Quaternion {
    fn from(q: QuaternionMsg) -> Self {
        Self::new(q.w, q.x, q.y, q.z)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Rotation3
// ────────────────────────────────────────────────────────────────────────────

/// Row-major 3×3 rotation matrix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rotation3 {
    pub m: [[f32; 3]; 3],
}

impl Rotation3 {
    /// Right-handed rotation of `angle` radians about +X.
    pub fn about_x(angle: f32) -> Self {
        let (s, c) = angle.sin_cos();
        Self {
            m: [[1.0, 0.0, 0.0], [0.0, c, -s], [0.0, s, c]],
        }
    }

    /// Right-handed rotation of `angle` radians about +Y.
    pub fn about_y(angle: f32) -> Self {
        let (s, c) = angle.sin_cos();
        Self {
            m: [[c, 0.0, s], [0.0, 1.0, 0.0], [-s, 0.0, c]],
        }
    }

    /// Matrix product `self · rhs` (`rhs` acts on a point first).
    pub fn mul(&self, rhs: &Self) -> Self {
        let mut m = [[0.0f32; 3]; 3];
        for (i, row) in m.iter_mut().enumerate() {
            for (j, cell) in row.iter_mut().enumerate() {
                *cell = (0..3).map(|k| self.m[i][k] * rhs.m[k][j]).sum();
            }
        }
        Self { m }
    }

    /// Rotate a point.
    pub fn apply(&self, p: Point3) -> Point3 {
        let m = &self.m;
        Point3::new(
            m[0][0] * p.x + m[0][1] * p.y + m[0][2] * p.z,
            m[1][0] * p.x + m[1][1] * p.y + m[1][2] * p.z,
            m[2][0] * p.x + m[2][1] * p.y + m[2][2] * p.z,
        )
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
