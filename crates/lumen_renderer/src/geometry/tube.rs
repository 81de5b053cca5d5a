//! Infinite tube and finite capped cylinder.
//!
//! Both share the radial part of the math: the ray is projected onto the
//! plane perpendicular to the axis, which turns the surface into a circle.

use lumen_math::{Aabb, DVec3, Direction, Ray, EPSILON};

use super::{accept_roots, in_range, Geometry};
use crate::error::{ensure_positive, RenderResult};

/// An infinite cylinder of `radius` around the line through `center` along `axis`.
#[derive(Debug, Clone, PartialEq)]
pub struct Tube {
    center: DVec3,
    axis: Direction,
    radius: f64,
}

impl Tube {
    pub fn new(center: DVec3, axis: DVec3, radius: f64) -> RenderResult<Self> {
        Ok(Self {
            center,
            axis: Direction::new(axis)?,
            radius: ensure_positive("tube radius", radius)?,
        })
    }

    pub fn axis(&self) -> Direction {
        self.axis
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// Component of `v` perpendicular to the axis.
    #[inline]
    fn perpendicular(&self, v: DVec3) -> DVec3 {
        v - self.axis * self.axis.dot(v)
    }

    /// Scalar projection of `p` onto the axis, measured from `center`.
    #[inline]
    fn axial_offset(&self, p: DVec3) -> f64 {
        self.axis.dot(p - self.center)
    }

    fn radial_normal(&self, point: DVec3) -> DVec3 {
        self.perpendicular(point - self.center)
            .try_normalize()
            .unwrap_or_else(|| self.axis.any_orthogonal().get())
    }
}

impl Geometry for Tube {
    fn intersect(&self, ray: &Ray, max_distance: f64) -> Vec<f64> {
        let d_perp = self.perpendicular(ray.direction.get());
        let a = d_perp.length_squared();

        // Parallel to the axis: never crosses the lateral surface
        if a < EPSILON {
            return Vec::new();
        }

        let oc_perp = self.perpendicular(ray.origin - self.center);

        // Origin on the axis: the roots are symmetric, only the forward one counts
        if oc_perp.length_squared() < EPSILON * EPSILON {
            let t = self.radius / a.sqrt();
            return if in_range(t, max_distance) { vec![t] } else { Vec::new() };
        }

        let b = 2.0 * d_perp.dot(oc_perp);
        let c = oc_perp.length_squared() - self.radius * self.radius;
        let discriminant = b * b - 4.0 * a * c;
        if discriminant <= EPSILON {
            return Vec::new();
        }

        let sqrtd = discriminant.sqrt();
        accept_roots((-b - sqrtd) / (2.0 * a), (-b + sqrtd) / (2.0 * a), max_distance)
    }

    fn normal(&self, point: DVec3) -> DVec3 {
        self.radial_normal(point)
    }

    fn bounding_box(&self) -> Option<Aabb> {
        None
    }
}

/// A finite cylinder: a tube cut to `[0, height]` along its axis plus two caps.
#[derive(Debug, Clone, PartialEq)]
pub struct Cylinder {
    /// Tube whose `center` is the middle of the bottom cap
    tube: Tube,
    height: f64,
}

impl Cylinder {
    /// Create a cylinder standing on `base` and extending `height` along `axis`.
    pub fn new(base: DVec3, axis: DVec3, radius: f64, height: f64) -> RenderResult<Self> {
        Ok(Self {
            tube: Tube::new(base, axis, radius)?,
            height: ensure_positive("cylinder height", height)?,
        })
    }

    pub fn base(&self) -> DVec3 {
        self.tube.center
    }

    pub fn top(&self) -> DVec3 {
        self.tube.center + self.tube.axis * self.height
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    /// Hit on the cap disk centered at `cap`, if any.
    fn cap_hit(&self, ray: &Ray, cap: DVec3, max_distance: f64) -> Option<f64> {
        let denom = ray.direction.dot(self.tube.axis.get());
        if denom.abs() < EPSILON {
            return None;
        }
        let t = self.tube.axis.dot(cap - ray.origin) / denom;
        if !in_range(t, max_distance) {
            return None;
        }
        let r = self.tube.radius;
        (ray.at(t).distance_squared(cap) <= r * r).then_some(t)
    }
}

impl Geometry for Cylinder {
    fn intersect(&self, ray: &Ray, max_distance: f64) -> Vec<f64> {
        let mut hits: Vec<f64> = self
            .tube
            .intersect(ray, max_distance)
            .into_iter()
            .filter(|&t| {
                let s = self.tube.axial_offset(ray.at(t));
                (0.0..=self.height).contains(&s)
            })
            .collect();

        hits.extend(self.cap_hit(ray, self.base(), max_distance));
        hits.extend(self.cap_hit(ray, self.top(), max_distance));

        hits.sort_by(f64::total_cmp);
        // A ray through the rim reports the same crossing for side and cap
        hits.dedup_by(|a, b| (*a - *b).abs() < EPSILON);
        hits
    }

    /// Bottom cap for `t <= 0`, top cap for `t >= height`, radial otherwise,
    /// where `t` is the projection of the point onto the axis.
    fn normal(&self, point: DVec3) -> DVec3 {
        let t = self.tube.axial_offset(point);
        if t <= EPSILON {
            -self.tube.axis.get()
        } else if t >= self.height - EPSILON {
            self.tube.axis.get()
        } else {
            self.tube.radial_normal(point)
        }
    }

    fn bounding_box(&self) -> Option<Aabb> {
        // A disk of radius r with normal a spans r * sqrt(1 - a_i^2) on axis i
        let a = self.tube.axis.get();
        let extent = (DVec3::ONE - a * a).max(DVec3::ZERO).map(f64::sqrt) * self.tube.radius;
        let (base, top) = (self.base(), self.top());
        Some(Aabb::from_points(
            base.min(top) - extent,
            base.max(top) + extent,
        ))
    }
}
