use crate::{Direction, MathResult, SHADOW_BIAS};
use glam::DVec3;

/// A ray in 3D space with an origin and a unit direction.
///
/// Rays are immutable once built. The direction is always unit length, so
/// the ray parameter `t` is a world-space distance.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Ray {
    pub origin: DVec3,
    pub direction: Direction,
}

impl Ray {
    /// Create a new ray.
    pub fn new(origin: DVec3, direction: Direction) -> Self {
        Self { origin, direction }
    }

    /// Create a ray from `origin` aimed at `target`.
    pub fn towards(origin: DVec3, target: DVec3) -> MathResult<Self> {
        Ok(Self::new(origin, Direction::between(origin, target)?))
    }

    /// Create a ray leaving a surface.
    ///
    /// The origin is pushed along `normal` by [`SHADOW_BIAS`], towards the side
    /// the ray travels into, so the ray does not re-hit the surface it starts on.
    pub fn offset(origin: DVec3, direction: Direction, normal: DVec3) -> Self {
        let side = if direction.dot(normal) >= 0.0 { 1.0 } else { -1.0 };
        Self::new(origin + normal * (SHADOW_BIAS * side), direction)
    }

    /// Get the point along the ray at parameter t.
    ///
    /// Returns: origin + t * direction
    #[inline]
    pub fn at(&self, t: f64) -> DVec3 {
        self.origin + self.direction * t
    }
}
