//! Surface materials for Whitted-style shading.

use lumen_math::DVec3;

/// Color type alias (linear RGB, non-negative, not clamped).
pub type Color = DVec3;

/// Describes how a surface responds to light.
///
/// Coefficients are plain scalars; the renderer never clamps colors, that is
/// left to whoever encodes the final image.
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    /// Base surface color
    pub color: Color,
    /// Lambert diffuse coefficient
    pub diffuse: f64,
    /// Phong specular coefficient
    pub specular: f64,
    /// Phong exponent
    pub shininess: f64,
    /// Fraction of light mirrored (0 = none, 1 = perfect mirror)
    pub reflectivity: f64,
    /// Fraction of light transmitted through the surface
    pub transparency: f64,
    /// Index of refraction (1.0 = air, 1.5 = glass)
    pub refractive_index: f64,
    /// Light emitted by the surface itself
    pub emission: Color,
    /// Radius of the disk sampled around the mirror direction (0 = sharp)
    pub glossiness: f64,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            color: Color::splat(0.5),
            diffuse: 0.8,
            specular: 0.0,
            shininess: 32.0,
            reflectivity: 0.0,
            transparency: 0.0,
            refractive_index: 1.0,
            emission: Color::ZERO,
            glossiness: 0.0,
        }
    }
}

impl Material {
    /// Create a diffuse material with the given color.
    pub fn new(color: Color) -> Self {
        Self {
            color,
            ..Default::default()
        }
    }

    /// Set the Phong highlight.
    pub fn with_specular(mut self, specular: f64, shininess: f64) -> Self {
        self.specular = specular.max(0.0);
        self.shininess = shininess.max(1.0);
        self
    }

    /// Make the surface reflective. `glossiness` blurs the reflection.
    pub fn with_reflection(mut self, reflectivity: f64, glossiness: f64) -> Self {
        self.reflectivity = reflectivity.clamp(0.0, 1.0);
        self.glossiness = glossiness.max(0.0);
        self
    }

    /// Make the surface transparent.
    pub fn with_transparency(mut self, transparency: f64, refractive_index: f64) -> Self {
        self.transparency = transparency.clamp(0.0, 1.0);
        self.refractive_index = refractive_index.max(1.0);
        self
    }

    /// Make the surface emit light.
    pub fn with_emission(mut self, emission: Color) -> Self {
        self.emission = emission.max(Color::ZERO);
        self
    }

    /// Set the diffuse coefficient.
    pub fn with_diffuse(mut self, diffuse: f64) -> Self {
        self.diffuse = diffuse.max(0.0);
        self
    }
}

/// Reflect a vector about a normal.
#[inline]
pub(crate) fn reflect(v: DVec3, n: DVec3) -> DVec3 {
    v - 2.0 * v.dot(n) * n
}

/// Refract a unit vector through a surface with unit normal `n` facing the
/// incoming side. Returns `None` on total internal reflection.
#[inline]
pub(crate) fn refract(uv: DVec3, n: DVec3, eta_ratio: f64) -> Option<DVec3> {
    let cos_theta = (-uv).dot(n).min(1.0);
    let sin2_theta = eta_ratio * eta_ratio * (1.0 - cos_theta * cos_theta);
    if sin2_theta > 1.0 {
        return None;
    }
    let r_out_perp = eta_ratio * (uv + cos_theta * n);
    let r_out_parallel = -(1.0 - r_out_perp.length_squared()).abs().sqrt() * n;
    Some(r_out_perp + r_out_parallel)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_clamps() {
        let m = Material::new(Color::ONE)
            .with_reflection(2.0, -1.0)
            .with_transparency(0.5, 0.2)
            .with_emission(Color::new(-1.0, 1.0, 0.0));

        assert_eq!(m.reflectivity, 1.0);
        assert_eq!(m.glossiness, 0.0);
        assert_eq!(m.refractive_index, 1.0);
        assert_eq!(m.emission, Color::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn test_reflect() {
        let r = reflect(DVec3::new(1.0, -1.0, 0.0), DVec3::Y);
        assert_eq!(r, DVec3::new(1.0, 1.0, 0.0));
    }

    #[test]
    fn test_refract_straight_through() {
        let t = refract(DVec3::NEG_Y, DVec3::Y, 1.0 / 1.5).unwrap();
        assert!((t - DVec3::NEG_Y).length() < 1e-12);
    }

    #[test]
    fn test_total_internal_reflection() {
        let grazing = DVec3::new(1.0, -0.1, 0.0).normalize();
        assert!(refract(grazing, DVec3::Y, 1.5).is_none());
    }
}
