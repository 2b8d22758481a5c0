use std::ops::Mul;

use serde::{Deserialize, Serialize};

use crate::constants::EPSILON;

/// Unit quaternion used for component orientation.
///
/// Always normalized. Built from the Euler angles a model component carries
/// and written out as the `rotation` of a glTF node.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Quaternion {
    pub w: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl PartialEq for Quaternion {
    fn eq(&self, other: &Self) -> bool {
        (self.w - other.w).abs() < EPSILON
            && (self.x - other.x).abs() < EPSILON
            && (self.y - other.y).abs() < EPSILON
            && (self.z - other.z).abs() < EPSILON
    }
}

impl Quaternion {
    /// Create a new quaternion, automatically normalized.
    pub fn new(w: f64, x: f64, y: f64, z: f64) -> Self {
        Self { w, x, y, z }.normalize()
    }

    /// Identity quaternion (1, 0, 0, 0).
    pub fn identity() -> Self {
        Self {
            w: 1.0,
            x: 0.0,
            y: 0.0,
            z: 0.0,
        }
    }

    /// Normalize to unit length. Returns identity if near-zero magnitude.
    pub fn normalize(self) -> Self {
        let norm = (self.w * self.w + self.x * self.x + self.y * self.y + self.z * self.z).sqrt();
        if norm < EPSILON || !norm.is_finite() {
            return Self::identity();
        }
        Self {
            w: self.w / norm,
            x: self.x / norm,
            y: self.y / norm,
            z: self.z / norm,
        }
    }

    /// Rotation about a unit axis by `angle` radians.
    pub fn from_axis_angle(axis: [f64; 3], angle: f64) -> Self {
        let (s, c) = (angle / 2.0).sin_cos();
        Self::new(c, axis[0] * s, axis[1] * s, axis[2] * s)
    }

    /// Intrinsic XYZ Euler angles (radians): rotate about X, then the new Y,
    /// then the new Z. Equivalent to `qx * qy * qz`.
    pub fn from_euler_xyz(rotation: [f64; 3]) -> Self {
        let (s1, c1) = (rotation[0] / 2.0).sin_cos();
        let (s2, c2) = (rotation[1] / 2.0).sin_cos();
        let (s3, c3) = (rotation[2] / 2.0).sin_cos();
        Self::new(
            c1 * c2 * c3 - s1 * s2 * s3,
            s1 * c2 * c3 + c1 * s2 * s3,
            c1 * s2 * c3 - s1 * c2 * s3,
            c1 * c2 * s3 + s1 * s2 * c3,
        )
    }

    pub fn conjugate(self) -> Self {
        Self {
            w: self.w,
            x: -self.x,
            y: -self.y,
            z: -self.z,
        }
    }

    /// Rotate a vector: q · v · q*.
    pub fn rotate(self, v: [f64; 3]) -> [f64; 3] {
        let p = Self {
            w: 0.0,
            x: v[0],
            y: v[1],
            z: v[2],
        };
        let r = hamilton(hamilton(self, p), self.conjugate());
        [r.x, r.y, r.z]
    }

    /// glTF component order `[x, y, z, w]`.
    pub fn to_xyzw(self) -> [f32; 4] {
        [self.x as f32, self.y as f32, self.z as f32, self.w as f32]
    }
}

/// Hamilton product without renormalizing (pure quaternions pass through).
fn hamilton(a: Quaternion, b: Quaternion) -> Quaternion {
    Quaternion {
        w: a.w * b.w - a.x * b.x - a.y * b.y - a.z * b.z,
        x: a.w * b.x + a.x * b.w + a.y * b.z - a.z * b.y,
        y: a.w * b.y - a.x * b.z + a.y * b.w + a.z * b.x,
        z: a.w * b.z + a.x * b.y - a.y * b.x + a.z * b.w,
    }
}

impl Mul for Quaternion {
    type Output = Self;

    /// Hamilton product, normalized.
    fn mul(self, rhs: Self) -> Self {
        hamilton(self, rhs).normalize()
    }
}
