//! Point and disk lights.

use lumen_math::DVec3;

use crate::error::RenderResult;
use crate::Color;

/// A light source.
///
/// A light with a positive `radius` is treated as a disk facing the shading
/// point; soft shadows sample positions on that disk.
#[derive(Debug, Clone, PartialEq)]
pub struct Light {
    pub position: DVec3,
    pub color: Color,
    pub radius: f64,
}

impl Light {
    /// Create a point light.
    pub fn point(position: DVec3, color: Color) -> Self {
        Self {
            position,
            color,
            radius: 0.0,
        }
    }

    /// Create a disk light of the given radius.
    pub fn disk(position: DVec3, color: Color, radius: f64) -> RenderResult<Self> {
        let radius = crate::error::ensure_positive("light radius", radius)?;
        Ok(Self {
            position,
            color,
            radius,
        })
    }

    pub fn is_area(&self) -> bool {
        self.radius > 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_light_kinds() {
        assert!(!Light::point(DVec3::ZERO, Color::ONE).is_area());
        assert!(Light::disk(DVec3::ZERO, Color::ONE, 0.5).unwrap().is_area());
        assert!(Light::disk(DVec3::ZERO, Color::ONE, 0.0).is_err());
    }
}
