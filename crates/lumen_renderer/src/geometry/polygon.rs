//! Convex planar polygon.

use std::f64::consts::TAU;

use lumen_math::{Aabb, DVec3, Direction, MathError, Ray};

use super::{barycentric, Geometry, Plane};
use crate::error::{RenderError, RenderResult};

/// Relative tolerance used by the coplanarity and convexity checks.
const SHAPE_TOLERANCE: f64 = 1e-6;

/// A convex, planar polygon with consistently wound vertices.
///
/// Optional per-vertex normals give smooth shading: the normal at a point is
/// interpolated over the triangle of the `v0` fan that contains it.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    vertices: Vec<DVec3>,
    plane: Plane,
    vertex_normals: Option<Vec<DVec3>>,
}

impl Polygon {
    /// Create a polygon, validating that the vertices are coplanar and convex.
    pub fn new(vertices: Vec<DVec3>) -> RenderResult<Self> {
        if vertices.len() < 3 {
            return Err(RenderError::TooFewVertices(vertices.len()));
        }

        let normal = Direction::new(newell_normal(&vertices)).map_err(|e| match e {
            MathError::DegenerateVector => RenderError::NonCoplanar,
            other => other.into(),
        })?;
        let plane = Plane::from_parts(vertices[0], normal);

        let scale = Aabb::enclosing(vertices.iter().copied()).size().max_element().max(1.0);
        let tolerance = SHAPE_TOLERANCE * scale;

        if vertices
            .iter()
            .any(|&v| plane.signed_distance(v).abs() > tolerance)
        {
            return Err(RenderError::NonCoplanar);
        }

        check_convex(&vertices, normal, tolerance)?;

        Ok(Self {
            vertices,
            plane,
            vertex_normals: None,
        })
    }

    /// Create a polygon with one shading normal per vertex.
    pub fn with_normals(vertices: Vec<DVec3>, normals: Vec<DVec3>) -> RenderResult<Self> {
        if normals.len() != vertices.len() {
            return Err(RenderError::NormalCountMismatch {
                expected: vertices.len(),
                found: normals.len(),
            });
        }
        let mut polygon = Self::new(vertices)?;
        let normals = normals
            .into_iter()
            .map(|n| Direction::new(n).map(Direction::get))
            .collect::<Result<Vec<_>, _>>()?;
        polygon.vertex_normals = Some(normals);
        Ok(polygon)
    }

    pub fn vertices(&self) -> &[DVec3] {
        &self.vertices
    }

    /// Unit normal of the supporting plane.
    pub fn face_normal(&self) -> Direction {
        self.plane.plane_normal()
    }

    /// Edge vectors `v[i+1] - v[i]`, closing back to `v0`.
    pub fn edges(&self) -> impl Iterator<Item = DVec3> + '_ {
        let n = self.vertices.len();
        (0..n).map(move |i| self.vertices[(i + 1) % n] - self.vertices[i])
    }

    /// Returns true if the line of `ray` passes through the polygon.
    ///
    /// Each edge and the ray origin span a triangle; the ray crosses the
    /// polygon only if it sees every edge with the same winding sign.
    fn encloses_line(&self, ray: &Ray) -> bool {
        let n = self.vertices.len();
        let mut positive = false;
        let mut negative = false;
        for i in 0..n {
            let a = self.vertices[i] - ray.origin;
            let b = self.vertices[(i + 1) % n] - ray.origin;
            let side = ray.direction.dot(a.cross(b));
            if side > 0.0 {
                positive = true;
            } else if side < 0.0 {
                negative = true;
            }
            if positive && negative {
                return false;
            }
        }
        positive || negative
    }
}

/// Polygon normal by Newell's method, robust to collinear leading vertices.
fn newell_normal(vertices: &[DVec3]) -> DVec3 {
    let n = vertices.len();
    (0..n).fold(DVec3::ZERO, |acc, i| {
        let a = vertices[i];
        let b = vertices[(i + 1) % n];
        acc + DVec3::new(
            (a.y - b.y) * (a.z + b.z),
            (a.z - b.z) * (a.x + b.x),
            (a.x - b.x) * (a.y + b.y),
        )
    })
}

/// Every turn must bend the same way around `normal`, and the turns must add
/// up to exactly one revolution (rules out star-shaped vertex orders).
fn check_convex(vertices: &[DVec3], normal: Direction, tolerance: f64) -> RenderResult<()> {
    let n = vertices.len();
    let mut total_turn = 0.0;
    for i in 0..n {
        let e1 = vertices[(i + 1) % n] - vertices[i];
        let e2 = vertices[(i + 2) % n] - vertices[(i + 1) % n];
        let turn = normal.dot(e1.cross(e2));
        if turn < -tolerance * e1.length().max(e2.length()) {
            return Err(RenderError::NonConvex);
        }
        total_turn += turn.atan2(e1.dot(e2));
    }
    if (total_turn - TAU).abs() > 1e-6 {
        return Err(RenderError::NonConvex);
    }
    Ok(())
}

impl Geometry for Polygon {
    fn intersect(&self, ray: &Ray, max_distance: f64) -> Vec<f64> {
        if !self.encloses_line(ray) {
            return Vec::new();
        }
        self.plane.hit_distance(ray, max_distance).into_iter().collect()
    }

    fn normal(&self, point: DVec3) -> DVec3 {
        let face = self.plane.plane_normal().get();
        let Some(normals) = &self.vertex_normals else {
            return face;
        };

        let v0 = self.vertices[0];
        for i in 1..self.vertices.len() - 1 {
            let (w0, w1, w2) = barycentric(point, v0, self.vertices[i], self.vertices[i + 1]);
            if w0 >= -SHAPE_TOLERANCE && w1 >= -SHAPE_TOLERANCE && w2 >= -SHAPE_TOLERANCE {
                let n = normals[0] * w0 + normals[i] * w1 + normals[i + 1] * w2;
                return n.try_normalize().unwrap_or(face);
            }
        }
        face
    }

    fn bounding_box(&self) -> Option<Aabb> {
        Some(Aabb::enclosing(self.vertices.iter().copied()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Vec<DVec3> {
        vec![
            DVec3::new(-1.0, -1.0, -2.0),
            DVec3::new(1.0, -1.0, -2.0),
            DVec3::new(1.0, 1.0, -2.0),
            DVec3::new(-1.0, 1.0, -2.0),
        ]
    }

    #[test]
    fn test_polygon_hit_and_miss() {
        let poly = Polygon::new(square()).unwrap();

        let ray = Ray::new(DVec3::new(0.5, 0.5, 0.0), Direction::NEG_Z);
        let hits = poly.intersect(&ray, f64::INFINITY);
        assert_eq!(hits.len(), 1);
        assert!((hits[0] - 2.0).abs() < 1e-9);

        let outside = Ray::new(DVec3::new(1.5, 0.0, 0.0), Direction::NEG_Z);
        assert!(poly.intersect(&outside, f64::INFINITY).is_empty());

        let behind = Ray::new(DVec3::new(0.5, 0.5, 0.0), Direction::Z);
        assert!(poly.intersect(&behind, f64::INFINITY).is_empty());
    }

    #[test]
    fn test_normal_is_unit_and_orthogonal_to_edges() {
        let tilted = vec![
            DVec3::new(0.0, 0.0, 0.0),
            DVec3::new(2.0, 0.0, 1.0),
            DVec3::new(3.0, 2.0, 1.5),
            DVec3::new(1.0, 3.0, 0.5),
            DVec3::new(-0.5, 1.5, -0.25),
        ];
        let poly = Polygon::new(tilted).unwrap();
        let n = poly.face_normal().get();

        assert!((n.length() - 1.0).abs() < 1e-12);
        for edge in poly.edges() {
            assert!(n.dot(edge).abs() < 1e-9);
        }
    }

    #[test]
    fn test_too_few_vertices() {
        let err = Polygon::new(vec![DVec3::ZERO, DVec3::X]).unwrap_err();
        assert_eq!(err, RenderError::TooFewVertices(2));
    }

    #[test]
    fn test_non_coplanar_rejected() {
        let mut verts = square();
        verts[2].z += 0.5;
        assert_eq!(Polygon::new(verts).unwrap_err(), RenderError::NonCoplanar);

        let collinear = vec![DVec3::ZERO, DVec3::X, DVec3::X * 2.0];
        assert_eq!(Polygon::new(collinear).unwrap_err(), RenderError::NonCoplanar);
    }

    #[test]
    fn test_non_convex_rejected() {
        // Arrow head: the fourth vertex is pushed inwards
        let dented = vec![
            DVec3::new(0.0, 0.0, 0.0),
            DVec3::new(2.0, 0.0, 0.0),
            DVec3::new(2.0, 2.0, 0.0),
            DVec3::new(1.0, 0.5, 0.0),
            DVec3::new(0.0, 2.0, 0.0),
        ];
        assert_eq!(Polygon::new(dented).unwrap_err(), RenderError::NonConvex);

        // Pentagram order: every turn bends the same way but winds twice
        let star: Vec<DVec3> = (0..5)
            .map(|i| {
                let a = (i * 2) as f64 * TAU / 5.0;
                DVec3::new(a.cos(), a.sin(), 0.0)
            })
            .collect();
        assert_eq!(Polygon::new(star).unwrap_err(), RenderError::NonConvex);
    }

    #[test]
    fn test_normal_count_mismatch() {
        let err = Polygon::with_normals(square(), vec![DVec3::Z; 3]).unwrap_err();
        assert_eq!(err, RenderError::NormalCountMismatch { expected: 4, found: 3 });
    }

    #[test]
    fn test_smooth_normals() {
        let normals = vec![
            DVec3::Z,
            DVec3::Z,
            DVec3::new(1.0, 0.0, 1.0),
            DVec3::Z,
        ];
        let poly = Polygon::with_normals(square(), normals).unwrap();

        // Near the bent vertex the normal leans towards +X
        let near_corner = poly.normal(DVec3::new(0.99, 0.99, -2.0));
        assert!(near_corner.x > 0.5);
        assert!((near_corner.length() - 1.0).abs() < 1e-12);

        // At the opposite corner it is the face normal
        let far_corner = poly.normal(DVec3::new(-1.0, -1.0, -2.0));
        assert!((far_corner - DVec3::Z).length() < 1e-12);
    }

    #[test]
    fn test_bounds_contain_vertices() {
        let poly = Polygon::new(square()).unwrap();
        let b = poly.bounding_box().unwrap();
        for v in poly.vertices() {
            assert!(b.contains_point(*v));
        }
    }
}
