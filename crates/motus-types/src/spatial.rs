//! Spatial primitives.
//!
//! Points are expressed in millimetres.  Orientations are unit quaternions in
//! (w, x, y, z) order.  A [`Pose`] describes where a child frame sits relative
//! to its parent: to move a point from the child into the parent, rotate it by
//! `orientation` then add `point`.

use serde::{Deserialize, Serialize};

// ────────────────────────────────────────────────────────────────────────────
// Vec3
// ────────────────────────────────────────────────────────────────────────────

/// A 3-D vector.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    pub fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }

    pub fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }

    pub fn scale(self, k: f64) -> Self {
        Self::new(self.x * k, self.y * k, self.z * k)
    }

    /// Euclidean length.
    pub fn norm(self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Quaternion
// ────────────────────────────────────────────────────────────────────────────

/// A unit quaternion representing a 3-D rotation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quaternion {
    pub w: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::identity()
    }
}

impl Quaternion {
    /// The caller is responsible for providing a unit quaternion.
    pub fn new(w: f64, x: f64, y: f64, z: f64) -> Self {
        Self { w, x, y, z }
    }

    pub fn identity() -> Self {
        Self::new(1.0, 0.0, 0.0, 0.0)
    }

    /// Rotation of `angle_rad` about `axis`.  A zero axis yields the identity.
    pub fn from_axis_angle(axis: Vec3, angle_rad: f64) -> Self {
        let len = axis.norm();
        if len == 0.0 {
            return Self::identity();
        }
        let (s, c) = (angle_rad / 2.0).sin_cos();
        let a = axis.scale(1.0 / len);
        Self::new(c, a.x * s, a.y * s, a.z * s)
    }

    /// Hamilton product: `self` then `rhs`.
    pub fn mul(self, rhs: Self) -> Self {
        Self::new(
            self.w * rhs.w - self.x * rhs.x - self.y * rhs.y - self.z * rhs.z,
            self.w * rhs.x + self.x * rhs.w + self.y * rhs.z - self.z * rhs.y,
            self.w * rhs.y - self.x * rhs.z + self.y * rhs.w + self.z * rhs.x,
            self.w * rhs.z + self.x * rhs.y - self.y * rhs.x + self.z * rhs.w,
        )
    }

    /// Conjugate (== inverse for a unit quaternion).
    pub fn conjugate(self) -> Self {
        Self::new(self.w, -self.x, -self.y, -self.z)
    }

    /// Rotate a vector: p' = q * p * q*.
    pub fn rotate(self, v: Vec3) -> Vec3 {
        let p = Self::new(0.0, v.x, v.y, v.z);
        let rotated = self.mul(p).mul(self.conjugate());
        Vec3::new(rotated.x, rotated.y, rotated.z)
    }

    /// Smallest rotation angle (radians, in `[0, π]`) taking `self` to
    /// `other`.
    pub fn angle_to(self, other: Self) -> f64 {
        let dot = self.w * other.w + self.x * other.x + self.y * other.y + self.z * other.z;
        2.0 * dot.abs().min(1.0).acos()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Pose
// ────────────────────────────────────────────────────────────────────────────

/// A rigid-body transform: position in millimetres plus orientation.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose {
    pub point: Vec3,
    pub orientation: Quaternion,
}

impl Pose {
    pub fn new(point: Vec3, orientation: Quaternion) -> Self {
        Self { point, orientation }
    }

    /// A pure translation.
    pub fn from_point(x: f64, y: f64, z: f64) -> Self {
        Self::new(Vec3::new(x, y, z), Quaternion::identity())
    }

    pub fn identity() -> Self {
        Self::new(Vec3::zero(), Quaternion::identity())
    }

    /// If `self` = T_A_B and `other` = T_B_C, the result is T_A_C.
    pub fn compose(self, other: Self) -> Self {
        let point = self.point.add(self.orientation.rotate(other.point));
        Self::new(point, self.orientation.mul(other.orientation))
    }

    /// T_B_A for `self` = T_A_B.
    pub fn inverse(self) -> Self {
        let inv = self.orientation.conjugate();
        Self::new(inv.rotate(self.point.scale(-1.0)), inv)
    }
}

/// A [`Pose`] tagged with the name of the frame it is expressed in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoseInFrame {
    pub frame: String,
    pub pose: Pose,
}

impl PoseInFrame {
    pub fn new(frame: impl Into<String>, pose: Pose) -> Self {
        Self {
            frame: frame.into(),
            pose,
        }
    }
}
