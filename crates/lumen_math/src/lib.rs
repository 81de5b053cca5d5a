//! Lumen math - double precision vector algebra for the ray tracer.
//!
//! Points and free vectors are plain `glam::DVec3` values. Directions that
//! must never be degenerate are wrapped in [`Direction`].

// Re-export glam for convenience
pub use glam::*;

mod aabb;
mod direction;
mod interval;
mod ray;

pub use aabb::Aabb;
pub use direction::Direction;
pub use interval::Interval;
pub use ray::Ray;

use thiserror::Error;

/// A point in world space.
pub type Point = DVec3;

/// Values whose magnitude is below this are treated as exactly zero.
pub const EPSILON: f64 = 1e-7;

/// Distance a secondary ray origin is pushed off a surface to avoid
/// re-hitting the surface it starts on.
pub const SHADOW_BIAS: f64 = 1e-5;

/// Errors raised when constructing math types.
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum MathError {
    #[error("Degenerate vector: length is zero")]
    DegenerateVector,

    #[error("Vector contains a non-finite component")]
    NonFinite,
}

/// Result type for math constructors.
pub type MathResult<T> = Result<T, MathError>;

/// Returns true if `x` is close enough to zero to be treated as zero.
#[inline]
pub fn is_near_zero(x: f64) -> bool {
    x.abs() < EPSILON
}
