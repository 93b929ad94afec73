//! Shared primitive types used across the entire supervisor.

use serde::{Deserialize, Serialize};

/// A simulation tick. One tick = one fixed physics step.
pub type Tick = u64;

/// The canonical round identifier.
pub type RunId = String;

/// Simulated time in seconds.
pub type SimTime = f64;

pub type Vec3 = [f64; 3];

/// A 3x3 rotation matrix stored column-major.
pub type Rotation = [f64; 9];

pub const IDENTITY_ROTATION: Rotation = [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0];

/// Opaque handle of a body inside the physics world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BodyId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RigidTransform {
    pub rotation:    Rotation,
    pub translation: Vec3,
}

impl RigidTransform {
    pub fn from_translation(translation: Vec3) -> Self {
        Self { rotation: IDENTITY_ROTATION, translation }
    }

    /// Same rotation, translation shifted by `offset`.
    pub fn translated(&self, offset: Vec3) -> Self {
        Self {
            rotation:    self.rotation,
            translation: add(self.translation, offset),
        }
    }

    /// Express a world point in this frame: R^T (p - t).
    pub fn inverse_apply(&self, point: Vec3) -> Vec3 {
        let d = sub(point, self.translation);
        let r = &self.rotation;
        [
            r[0] * d[0] + r[1] * d[1] + r[2] * d[2],
            r[3] * d[0] + r[4] * d[1] + r[5] * d[2],
            r[6] * d[0] + r[7] * d[1] + r[8] * d[2],
        ]
    }
}

impl Default for RigidTransform {
    fn default() -> Self {
        Self::from_translation([0.0; 3])
    }
}

/// Angular and linear velocity of a body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Twist {
    pub angular: Vec3,
    pub linear:  Vec3,
}

impl Twist {
    pub const ZERO: Twist = Twist { angular: [0.0; 3], linear: [0.0; 3] };

    pub fn linear(linear: Vec3) -> Self {
        Self { angular: [0.0; 3], linear }
    }
}

pub fn add(a: Vec3, b: Vec3) -> Vec3 {
    [a[0] + b[0], a[1] + b[1], a[2] + b[2]]
}

pub fn sub(a: Vec3, b: Vec3) -> Vec3 {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

pub fn scale(a: Vec3, s: f64) -> Vec3 {
    [a[0] * s, a[1] * s, a[2] * s]
}

pub fn distance(a: Vec3, b: Vec3) -> f64 {
    let d = sub(a, b);
    (d[0] * d[0] + d[1] * d[1] + d[2] * d[2]).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inverse_apply_uses_transposed_rotation() {
        // Camera looking down +x: columns are (0,-1,0), (0,0,-1), (1,0,0).
        let camera = RigidTransform {
            rotation:    [0.0, -1.0, 0.0, 0.0, 0.0, -1.0, 1.0, 0.0, 0.0],
            translation: [-1.5, -0.5, 0.25],
        };
        let local = camera.inverse_apply([0.5, -0.5, 0.25]);
        assert_eq!(local, [0.0, 0.0, 2.0]);
    }

    #[test]
    fn translated_keeps_rotation() {
        let t = RigidTransform::from_translation([1.0, 2.0, 3.0]).translated([0.0, 0.5, 0.0]);
        assert_eq!(t.translation, [1.0, 2.5, 3.0]);
        assert_eq!(t.rotation, IDENTITY_ROTATION);
    }
}
