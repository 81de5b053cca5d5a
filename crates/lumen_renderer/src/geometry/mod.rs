//! Primitive geometries and the hit records they produce.
//!
//! Every primitive implements the [`Geometry`] capability set. [`Shape`] is
//! the closed set of variants the renderer knows about, dispatched with an
//! exhaustive `match` so adding a variant is checked by the compiler.

mod cuboid;
mod plane;
mod polygon;
mod sphere;
mod triangle;
mod tube;

pub use cuboid::Cuboid;
pub use plane::Plane;
pub use polygon::Polygon;
pub use sphere::Sphere;
pub use triangle::Triangle;
pub use tube::{Cylinder, Tube};

use std::cell::OnceCell;
use std::sync::OnceLock;

use lumen_math::{Aabb, DVec3, Direction, Ray, EPSILON};

use crate::Material;

/// Capabilities shared by every primitive.
pub trait Geometry: Send + Sync {
    /// Ray parameters of the surface crossings in `(EPSILON, max_distance]`,
    /// sorted nearest first.
    fn intersect(&self, ray: &Ray, max_distance: f64) -> Vec<f64>;

    /// Outward unit normal at a point on the surface.
    fn normal(&self, point: DVec3) -> DVec3;

    /// Tight axis-aligned bounds, or `None` for infinite primitives.
    fn bounding_box(&self) -> Option<Aabb>;
}

/// Returns true if `t` is an acceptable hit distance.
#[inline]
pub(crate) fn in_range(t: f64, max_distance: f64) -> bool {
    t > EPSILON && t <= max_distance
}

/// Keep the acceptable roots of a quadratic, nearest first.
pub(crate) fn accept_roots(t0: f64, t1: f64, max_distance: f64) -> Vec<f64> {
    let (near, far) = if t0 <= t1 { (t0, t1) } else { (t1, t0) };
    [near, far]
        .into_iter()
        .filter(|&t| in_range(t, max_distance))
        .collect()
}

/// Barycentric weights of `p` relative to triangle `(a, b, c)`.
pub(crate) fn barycentric(p: DVec3, a: DVec3, b: DVec3, c: DVec3) -> (f64, f64, f64) {
    let v0 = b - a;
    let v1 = c - a;
    let v2 = p - a;
    let d00 = v0.dot(v0);
    let d01 = v0.dot(v1);
    let d11 = v1.dot(v1);
    let d20 = v2.dot(v0);
    let d21 = v2.dot(v1);
    let denom = d00 * d11 - d01 * d01;
    if denom.abs() < EPSILON * EPSILON {
        return (1.0, 0.0, 0.0);
    }
    let v = (d11 * d20 - d01 * d21) / denom;
    let w = (d00 * d21 - d01 * d20) / denom;
    (1.0 - v - w, v, w)
}

/// The closed set of primitive variants.
#[derive(Debug, Clone)]
pub enum Shape {
    Plane(Plane),
    Sphere(Sphere),
    Triangle(Triangle),
    Polygon(Polygon),
    Tube(Tube),
    Cylinder(Cylinder),
    Cuboid(Cuboid),
}

impl Geometry for Shape {
    fn intersect(&self, ray: &Ray, max_distance: f64) -> Vec<f64> {
        match self {
            Shape::Plane(s) => s.intersect(ray, max_distance),
            Shape::Sphere(s) => s.intersect(ray, max_distance),
            Shape::Triangle(s) => s.intersect(ray, max_distance),
            Shape::Polygon(s) => s.intersect(ray, max_distance),
            Shape::Tube(s) => s.intersect(ray, max_distance),
            Shape::Cylinder(s) => s.intersect(ray, max_distance),
            Shape::Cuboid(s) => s.intersect(ray, max_distance),
        }
    }

    fn normal(&self, point: DVec3) -> DVec3 {
        match self {
            Shape::Plane(s) => s.normal(point),
            Shape::Sphere(s) => s.normal(point),
            Shape::Triangle(s) => s.normal(point),
            Shape::Polygon(s) => s.normal(point),
            Shape::Tube(s) => s.normal(point),
            Shape::Cylinder(s) => s.normal(point),
            Shape::Cuboid(s) => s.normal(point),
        }
    }

    fn bounding_box(&self) -> Option<Aabb> {
        match self {
            Shape::Plane(s) => s.bounding_box(),
            Shape::Sphere(s) => s.bounding_box(),
            Shape::Triangle(s) => s.bounding_box(),
            Shape::Polygon(s) => s.bounding_box(),
            Shape::Tube(s) => s.bounding_box(),
            Shape::Cylinder(s) => s.bounding_box(),
            Shape::Cuboid(s) => s.bounding_box(),
        }
    }
}

macro_rules! impl_from_shape {
    ($($variant:ident),*) => {
        $(
            impl From<$variant> for Shape {
                fn from(s: $variant) -> Self {
                    Shape::$variant(s)
                }
            }
        )*
    };
}

impl_from_shape!(Plane, Sphere, Triangle, Polygon, Tube, Cylinder, Cuboid);

/// A shape with a material attached.
///
/// The bounding box is computed on first request and published through a
/// `OnceLock`, so render threads may query it concurrently.
#[derive(Debug)]
pub struct Primitive {
    shape: Shape,
    material: Material,
    bbox: OnceLock<Option<Aabb>>,
}

impl Primitive {
    pub fn new(shape: impl Into<Shape>, material: Material) -> Self {
        Self {
            shape: shape.into(),
            material,
            bbox: OnceLock::new(),
        }
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn material(&self) -> &Material {
        &self.material
    }

    /// Memoized bounding box.
    pub fn bounding_box(&self) -> Option<Aabb> {
        *self.bbox.get_or_init(|| self.shape.bounding_box())
    }

    pub fn is_bounded(&self) -> bool {
        self.bounding_box().is_some()
    }

    /// All hits of the ray on this primitive, nearest first.
    pub fn intersect(&self, ray: &Ray, max_distance: f64) -> Vec<Intersection<'_>> {
        self.shape
            .intersect(ray, max_distance)
            .into_iter()
            .map(|t| Intersection::new(self, t, ray.at(t)))
            .collect()
    }

    /// Nearest hit of the ray on this primitive.
    pub fn nearest_hit(&self, ray: &Ray, max_distance: f64) -> Option<Intersection<'_>> {
        self.shape
            .intersect(ray, max_distance)
            .first()
            .map(|&t| Intersection::new(self, t, ray.at(t)))
    }
}

/// Record of a ray-primitive intersection.
///
/// Built fresh per query and never shared between threads; the normal is
/// computed on first use and cached in the record.
#[derive(Debug, Clone)]
pub struct Intersection<'a> {
    primitive: &'a Primitive,
    /// Ray parameter (world distance) of the hit
    pub t: f64,
    /// World-space hit point
    pub point: DVec3,
    normal: OnceCell<DVec3>,
}

impl<'a> Intersection<'a> {
    pub fn new(primitive: &'a Primitive, t: f64, point: DVec3) -> Self {
        Self {
            primitive,
            t,
            point,
            normal: OnceCell::new(),
        }
    }

    pub fn primitive(&self) -> &'a Primitive {
        self.primitive
    }

    pub fn material(&self) -> &'a Material {
        &self.primitive.material
    }

    /// Outward surface normal at the hit point.
    pub fn normal(&self) -> DVec3 {
        *self
            .normal
            .get_or_init(|| self.primitive.shape.normal(self.point))
    }

    /// Normal flipped to face against `ray`, plus whether the ray hit the front face.
    pub fn facing_normal(&self, ray: &Ray) -> (DVec3, bool) {
        let n = self.normal();
        let front_face = ray.direction.dot(n) < 0.0;
        if front_face {
            (n, true)
        } else {
            (-n, false)
        }
    }
}

/// Keep whichever of two optional hits is nearer.
pub fn nearer<'a>(a: Option<Intersection<'a>>, b: Option<Intersection<'a>>) -> Option<Intersection<'a>> {
    match (a, b) {
        (Some(a), Some(b)) => Some(if b.t < a.t { b } else { a }),
        (a, None) => a,
        (None, b) => b,
    }
}

/// An unordered aggregate of primitives, itself queryable like a primitive.
#[derive(Debug, Default)]
pub struct Composite {
    primitives: Vec<Primitive>,
}

impl Composite {
    /// Create a new empty composite.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a primitive.
    pub fn add(&mut self, primitive: Primitive) {
        self.primitives.push(primitive);
    }

    pub fn len(&self) -> usize {
        self.primitives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.primitives.is_empty()
    }

    pub fn primitives(&self) -> &[Primitive] {
        &self.primitives
    }

    /// All hits on every member, nearest first.
    pub fn intersect(&self, ray: &Ray, max_distance: f64) -> Vec<Intersection<'_>> {
        let mut hits: Vec<_> = self
            .primitives
            .iter()
            .flat_map(|p| p.intersect(ray, max_distance))
            .collect();
        hits.sort_by(|a, b| a.t.total_cmp(&b.t));
        hits
    }

    /// Nearest hit on any member.
    pub fn nearest_hit(&self, ray: &Ray, max_distance: f64) -> Option<Intersection<'_>> {
        let mut closest = None;
        let mut limit = max_distance;
        for primitive in &self.primitives {
            if let Some(hit) = primitive.nearest_hit(ray, limit) {
                limit = hit.t;
                closest = Some(hit);
            }
        }
        closest
    }

    /// Union of member bounds; `None` if empty or if any member is unbounded.
    pub fn bounding_box(&self) -> Option<Aabb> {
        self.primitives
            .iter()
            .try_fold(None, |acc: Option<Aabb>, p| {
                let b = p.bounding_box()?;
                Some(Some(acc.map_or(b, |a| Aabb::surrounding(&a, &b))))
            })
            .flatten()
    }

    /// Union of the bounds of bounded members only.
    pub fn bounded_box(&self) -> Option<Aabb> {
        self.primitives
            .iter()
            .filter_map(Primitive::bounding_box)
            .reduce(|a, b| Aabb::surrounding(&a, &b))
    }
}

/// Distance from a surface point at which [`Composite`] looks back along a
/// member's normal to check that the point lies on that member.
const SURFACE_LOOKBACK: f64 = 1e-4;

impl Geometry for Composite {
    fn intersect(&self, ray: &Ray, max_distance: f64) -> Vec<f64> {
        let mut hits: Vec<f64> = self
            .primitives
            .iter()
            .flat_map(|p| p.shape.intersect(ray, max_distance))
            .collect();
        hits.sort_by(f64::total_cmp);
        hits
    }

    /// Normal of the member whose surface passes closest to `point`.
    ///
    /// Each member's own normal at `point` is checked with a short ray cast
    /// back onto its surface; the member hit nearest that distance wins.
    /// Zero if no member passes through `point`.
    fn normal(&self, point: DVec3) -> DVec3 {
        self.primitives
            .iter()
            .filter_map(|p| {
                let n = Direction::new(p.shape.normal(point)).ok()?;
                let back = Ray::new(point + n * SURFACE_LOOKBACK, -n);
                let t = *p.shape.intersect(&back, 2.0 * SURFACE_LOOKBACK).first()?;
                Some(((t - SURFACE_LOOKBACK).abs(), n.get()))
            })
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map_or(DVec3::ZERO, |(_, n)| n)
    }

    fn bounding_box(&self) -> Option<Aabb> {
        Composite::bounding_box(self)
    }
}

impl From<Vec<Primitive>> for Composite {
    fn from(primitives: Vec<Primitive>) -> Self {
        Self { primitives }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_math::Direction;

    fn sphere_at(z: f64) -> Primitive {
        Primitive::new(
            Sphere::new(DVec3::new(0.0, 0.0, z), 1.0).unwrap(),
            Material::default(),
        )
    }

    #[test]
    fn test_bounding_box_is_stable() {
        let p = sphere_at(-3.0);
        let first = p.bounding_box().unwrap();
        let second = p.bounding_box().unwrap();
        assert_eq!(first.min(), second.min());
        assert_eq!(first.max(), second.max());
    }

    #[test]
    fn test_bounding_box_concurrent_reads_agree() {
        let p = sphere_at(-3.0);
        let boxes: Vec<_> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..4).map(|_| s.spawn(|| p.bounding_box())).collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        assert!(boxes.windows(2).all(|w| w[0] == w[1]));
    }

    #[test]
    fn test_intersection_normal_is_cached() {
        let p = sphere_at(-3.0);
        let ray = Ray::new(DVec3::ZERO, Direction::NEG_Z);
        let hit = p.nearest_hit(&ray, f64::INFINITY).unwrap();
        assert!((hit.t - 2.0).abs() < 1e-9);
        assert_eq!(hit.normal(), hit.normal());
        let (n, front) = hit.facing_normal(&ray);
        assert!(front);
        assert!((n - DVec3::Z).length() < 1e-9);
    }

    #[test]
    fn test_composite_nearest() {
        let composite = Composite::from(vec![sphere_at(-10.0), sphere_at(-3.0)]);
        let ray = Ray::new(DVec3::ZERO, Direction::NEG_Z);

        let hit = composite.nearest_hit(&ray, f64::INFINITY).unwrap();
        assert!((hit.t - 2.0).abs() < 1e-9);
        assert_eq!(composite.intersect(&ray, f64::INFINITY).len(), 4);
        assert!(composite.nearest_hit(&ray, 1.5).is_none());
    }

    #[test]
    fn test_composite_bounds() {
        let mut composite = Composite::from(vec![sphere_at(-10.0), sphere_at(-3.0)]);
        let b = composite.bounding_box().unwrap();
        assert!((b.min().z + 11.0).abs() < 1e-3);
        assert!((b.max().z + 2.0).abs() < 1e-3);

        composite.add(Primitive::new(
            Plane::new(DVec3::ZERO, DVec3::Y).unwrap(),
            Material::default(),
        ));
        assert!(composite.bounding_box().is_none());
        assert!(composite.bounded_box().is_some());
        assert!(Composite::new().bounding_box().is_none());
    }

    #[test]
    fn test_composite_as_geometry() {
        let mut composite = Composite::from(vec![sphere_at(-10.0), sphere_at(-3.0)]);
        let ray = Ray::new(DVec3::ZERO, Direction::NEG_Z);
        let ts = Geometry::intersect(&composite, &ray, f64::INFINITY);
        let expected = [2.0, 4.0, 9.0, 11.0];
        assert_eq!(ts.len(), expected.len());
        for (t, e) in ts.iter().zip(expected) {
            assert!((t - e).abs() < 1e-9);
        }

        composite.add(Primitive::new(
            Plane::new(DVec3::new(0.0, -5.0, 0.0), DVec3::Y).unwrap(),
            Material::default(),
        ));
        let shape: &dyn Geometry = &composite;
        assert!(shape.bounding_box().is_none());

        // Front of the near sphere, side of the far one, and the floor
        assert!((shape.normal(DVec3::new(0.0, 0.0, -2.0)) - DVec3::Z).length() < 1e-9);
        assert!((shape.normal(DVec3::new(1.0, 0.0, -10.0)) - DVec3::X).length() < 1e-9);
        assert!((shape.normal(DVec3::new(1.0, -5.0, -7.0)) - DVec3::Y).length() < 1e-9);
        assert_eq!(Composite::new().normal(DVec3::ZERO), DVec3::ZERO);
    }

    #[test]
    fn test_barycentric_vertices() {
        let (a, b, c) = (DVec3::ZERO, DVec3::X, DVec3::Y);
        let (u, v, w) = barycentric(DVec3::new(0.25, 0.25, 0.0), a, b, c);
        assert!((u - 0.5).abs() < 1e-12);
        assert!((v - 0.25).abs() < 1e-12);
        assert!((w - 0.25).abs() < 1e-12);
    }
}
