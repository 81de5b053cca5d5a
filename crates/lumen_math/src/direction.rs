use std::ops::{Mul, Neg};

use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::{MathError, MathResult, EPSILON};

/// A unit-length direction vector.
///
/// Construction normalizes the input and rejects zero-length or non-finite
/// vectors, so every `Direction` in the program is a valid unit vector.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "DVec3", into = "DVec3")]
pub struct Direction(DVec3);

impl Direction {
    pub const X: Direction = Direction(DVec3::X);
    pub const Y: Direction = Direction(DVec3::Y);
    pub const Z: Direction = Direction(DVec3::Z);
    pub const NEG_X: Direction = Direction(DVec3::NEG_X);
    pub const NEG_Y: Direction = Direction(DVec3::NEG_Y);
    pub const NEG_Z: Direction = Direction(DVec3::NEG_Z);

    /// Normalize `v` into a direction.
    pub fn new(v: DVec3) -> MathResult<Self> {
        if !v.is_finite() {
            return Err(MathError::NonFinite);
        }
        let length = v.length();
        if length < EPSILON {
            return Err(MathError::DegenerateVector);
        }
        Ok(Self(v / length))
    }

    /// Direction pointing from `from` towards `to`.
    pub fn between(from: DVec3, to: DVec3) -> MathResult<Self> {
        Self::new(to - from)
    }

    /// The underlying unit vector.
    #[inline]
    pub fn get(self) -> DVec3 {
        self.0
    }

    #[inline]
    pub fn dot(self, v: DVec3) -> f64 {
        self.0.dot(v)
    }

    /// Cross product; the result may be zero for parallel inputs.
    #[inline]
    pub fn cross(self, v: DVec3) -> DVec3 {
        self.0.cross(v)
    }

    /// Returns true if `other` is orthogonal to this direction.
    pub fn is_orthogonal_to(self, other: Direction) -> bool {
        self.0.dot(other.0).abs() < 1e-6
    }

    /// Any unit vector perpendicular to this one.
    pub fn any_orthogonal(self) -> Direction {
        Direction(self.0.any_orthonormal_vector())
    }
}

impl From<Direction> for DVec3 {
    fn from(d: Direction) -> Self {
        d.0
    }
}

impl TryFrom<DVec3> for Direction {
    type Error = MathError;

    fn try_from(v: DVec3) -> MathResult<Self> {
        Direction::new(v)
    }
}

impl Neg for Direction {
    type Output = Direction;

    fn neg(self) -> Direction {
        Direction(-self.0)
    }
}

impl Mul<f64> for Direction {
    type Output = DVec3;

    fn mul(self, s: f64) -> DVec3 {
        self.0 * s
    }
}
