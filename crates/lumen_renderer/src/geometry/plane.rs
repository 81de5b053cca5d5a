//! Infinite plane.

use lumen_math::{is_near_zero, Aabb, DVec3, Direction, Ray, EPSILON};

use super::{in_range, Geometry};
use crate::error::RenderResult;

/// An infinite plane through `point` with unit `normal`.
#[derive(Debug, Clone, PartialEq)]
pub struct Plane {
    point: DVec3,
    normal: Direction,
}

impl Plane {
    /// Create a plane. Fails if `normal` is the zero vector.
    pub fn new(point: DVec3, normal: DVec3) -> RenderResult<Self> {
        Ok(Self {
            point,
            normal: Direction::new(normal)?,
        })
    }

    pub(crate) fn from_parts(point: DVec3, normal: Direction) -> Self {
        Self { point, normal }
    }

    pub fn point(&self) -> DVec3 {
        self.point
    }

    pub fn plane_normal(&self) -> Direction {
        self.normal
    }

    /// Signed distance of `p` from the plane along its normal.
    pub fn signed_distance(&self, p: DVec3) -> f64 {
        self.normal.dot(p - self.point)
    }

    /// Ray parameter of the hit, if any.
    ///
    /// `t = (point - origin) . n / (direction . n)`. Rays parallel to the plane
    /// and hits landing exactly on the reference point report no hit.
    pub fn hit_distance(&self, ray: &Ray, max_distance: f64) -> Option<f64> {
        let denom = ray.direction.dot(self.normal.get());
        if is_near_zero(denom) {
            return None;
        }
        let t = (self.point - ray.origin).dot(self.normal.get()) / denom;
        if !in_range(t, max_distance) {
            return None;
        }
        if ray.at(t).distance_squared(self.point) < EPSILON * EPSILON {
            return None;
        }
        Some(t)
    }
}

impl Geometry for Plane {
    fn intersect(&self, ray: &Ray, max_distance: f64) -> Vec<f64> {
        self.hit_distance(ray, max_distance).into_iter().collect()
    }

    fn normal(&self, _point: DVec3) -> DVec3 {
        self.normal.get()
    }

    fn bounding_box(&self) -> Option<Aabb> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ground() -> Plane {
        Plane::new(DVec3::new(0.0, -1.0, 0.0), DVec3::Y).unwrap()
    }

    #[test]
    fn test_plane_hit() {
        let ray = Ray::new(DVec3::new(0.5, 0.0, 0.0), Direction::NEG_Y);
        let hits = ground().intersect(&ray, f64::INFINITY);
        assert_eq!(hits.len(), 1);
        assert!((hits[0] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_plane_parallel_and_behind() {
        let parallel = Ray::new(DVec3::ZERO, Direction::X);
        assert!(ground().intersect(&parallel, f64::INFINITY).is_empty());

        let away = Ray::new(DVec3::ZERO, Direction::Y);
        assert!(ground().intersect(&away, f64::INFINITY).is_empty());
    }

    #[test]
    fn test_plane_max_distance() {
        let ray = Ray::new(DVec3::new(0.5, 0.0, 0.0), Direction::NEG_Y);
        assert!(ground().intersect(&ray, 0.5).is_empty());
    }

    #[test]
    fn test_plane_reference_point_is_skipped() {
        let ray = Ray::new(DVec3::ZERO, Direction::NEG_Y);
        assert!(ground().intersect(&ray, f64::INFINITY).is_empty());
    }

    #[test]
    fn test_plane_is_unbounded() {
        assert!(ground().bounding_box().is_none());
        assert!(Plane::new(DVec3::ZERO, DVec3::ZERO).is_err());
    }
}
