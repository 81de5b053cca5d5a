//! Sphere primitive for ray tracing.

use lumen_math::{Aabb, DVec3, Ray, EPSILON};

use super::{accept_roots, Geometry};
use crate::error::{ensure_positive, RenderResult};

/// A sphere primitive.
#[derive(Debug, Clone, PartialEq)]
pub struct Sphere {
    center: DVec3,
    radius: f64,
}

impl Sphere {
    /// Create a new sphere. The radius must be positive.
    pub fn new(center: DVec3, radius: f64) -> RenderResult<Self> {
        Ok(Self {
            center,
            radius: ensure_positive("sphere radius", radius)?,
        })
    }

    pub fn center(&self) -> DVec3 {
        self.center
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }
}

impl Geometry for Sphere {
    /// Roots of `|O + tD - C|^2 = r^2` with a unit `D`.
    ///
    /// A zero or negative discriminant counts as a miss, so tangent rays
    /// never produce a single grazing hit.
    fn intersect(&self, ray: &Ray, max_distance: f64) -> Vec<f64> {
        let oc = self.center - ray.origin;
        let h = ray.direction.dot(oc);
        let c = oc.length_squared() - self.radius * self.radius;

        let discriminant = h * h - c;
        if discriminant <= EPSILON {
            return Vec::new();
        }

        let sqrtd = discriminant.sqrt();
        accept_roots(h - sqrtd, h + sqrtd, max_distance)
    }

    fn normal(&self, point: DVec3) -> DVec3 {
        (point - self.center) / self.radius
    }

    fn bounding_box(&self) -> Option<Aabb> {
        let rvec = DVec3::splat(self.radius);
        Some(Aabb::from_points(self.center - rvec, self.center + rvec))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_math::Direction;

    fn unit_sphere() -> Sphere {
        Sphere::new(DVec3::new(0.0, 0.0, -3.0), 1.0).unwrap()
    }

    #[test]
    fn test_sphere_hit_through_center_is_symmetric() {
        let sphere = unit_sphere();
        let ray = Ray::new(DVec3::ZERO, Direction::NEG_Z);
        let hits = sphere.intersect(&ray, f64::INFINITY);

        assert_eq!(hits.len(), 2);
        assert!((hits[0] - 2.0).abs() < 1e-9);
        assert!((hits[1] - 4.0).abs() < 1e-9);
        // Symmetric about the center distance
        assert!(((hits[0] + hits[1]) / 2.0 - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_sphere_miss_and_tangent() {
        let sphere = unit_sphere();

        // Ray pointing away from sphere
        let away = Ray::new(DVec3::ZERO, Direction::Y);
        assert!(sphere.intersect(&away, f64::INFINITY).is_empty());

        // Grazing ray: zero discriminant
        let tangent = Ray::new(DVec3::new(1.0, 0.0, 0.0), Direction::NEG_Z);
        assert!(sphere.intersect(&tangent, f64::INFINITY).is_empty());

        // Slightly inside the silhouette: two hits
        let inside = Ray::new(DVec3::new(0.9, 0.0, 0.0), Direction::NEG_Z);
        assert_eq!(sphere.intersect(&inside, f64::INFINITY).len(), 2);
    }

    #[test]
    fn test_sphere_from_inside_has_one_hit() {
        let sphere = unit_sphere();
        let ray = Ray::new(DVec3::new(0.0, 0.0, -3.0), Direction::X);
        let hits = sphere.intersect(&ray, f64::INFINITY);
        assert_eq!(hits.len(), 1);
        assert!((hits[0] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_sphere_max_distance() {
        let ray = Ray::new(DVec3::ZERO, Direction::NEG_Z);
        assert_eq!(unit_sphere().intersect(&ray, 3.0).len(), 1);
        assert!(unit_sphere().intersect(&ray, 1.0).is_empty());
    }

    #[test]
    fn test_sphere_normal_and_bounds() {
        let sphere = unit_sphere();
        let n = sphere.normal(DVec3::new(0.0, 1.0, -3.0));
        assert!((n - DVec3::Y).length() < 1e-12);

        let b = sphere.bounding_box().unwrap();
        assert!(b.contains_point(DVec3::new(0.0, 0.0, -4.0)));
        assert!(b.contains_point(DVec3::new(1.0, 1.0, -2.0)));
        assert!(Sphere::new(DVec3::ZERO, -1.0).is_err());
    }
}
