//! Triangle primitive for ray tracing.
//!
//! Uses the Möller-Trumbore barycentric test layered on the supporting plane.

use lumen_math::{is_near_zero, Aabb, DVec3, Direction, Ray};

use super::{barycentric, Geometry, Plane};
use crate::error::RenderResult;

/// A triangle primitive.
#[derive(Debug, Clone, PartialEq)]
pub struct Triangle {
    /// Vertices
    v0: DVec3,
    v1: DVec3,
    v2: DVec3,
    /// Supporting plane (reference point `v0`, face normal)
    plane: Plane,
    /// Per-vertex normals for smooth shading
    vertex_normals: Option<[DVec3; 3]>,
}

impl Triangle {
    /// Create a new triangle from three vertices.
    ///
    /// The face normal follows the winding `v0 -> v1 -> v2`. Collinear
    /// vertices are rejected.
    pub fn new(v0: DVec3, v1: DVec3, v2: DVec3) -> RenderResult<Self> {
        let normal = Direction::new((v1 - v0).cross(v2 - v0))?;
        Ok(Self {
            v0,
            v1,
            v2,
            plane: Plane::from_parts(v0, normal),
            vertex_normals: None,
        })
    }

    /// Create a triangle with per-vertex normals (for smooth shading).
    pub fn with_normals(v0: DVec3, v1: DVec3, v2: DVec3, normals: [DVec3; 3]) -> RenderResult<Self> {
        let mut tri = Self::new(v0, v1, v2)?;
        let [n0, n1, n2] = normals;
        tri.vertex_normals = Some([
            Direction::new(n0)?.get(),
            Direction::new(n1)?.get(),
            Direction::new(n2)?.get(),
        ]);
        Ok(tri)
    }

    pub fn vertices(&self) -> [DVec3; 3] {
        [self.v0, self.v1, self.v2]
    }

    pub fn face_normal(&self) -> Direction {
        self.plane.plane_normal()
    }
}

impl Geometry for Triangle {
    fn intersect(&self, ray: &Ray, max_distance: f64) -> Vec<f64> {
        let edge1 = self.v1 - self.v0;
        let edge2 = self.v2 - self.v0;

        let h = ray.direction.cross(edge2);
        let a = edge1.dot(h);

        // Ray is parallel to triangle
        if is_near_zero(a) {
            return Vec::new();
        }

        let f = 1.0 / a;
        let s = ray.origin - self.v0;
        let u = f * s.dot(h);
        if u <= 0.0 || u >= 1.0 {
            return Vec::new();
        }

        let q = s.cross(edge1);
        let v = f * ray.direction.dot(q);
        if v <= 0.0 || v >= 1.0 || u + v >= 1.0 {
            return Vec::new();
        }

        self.plane.hit_distance(ray, max_distance).into_iter().collect()
    }

    fn normal(&self, point: DVec3) -> DVec3 {
        match &self.vertex_normals {
            Some([n0, n1, n2]) => {
                let (w0, w1, w2) = barycentric(point, self.v0, self.v1, self.v2);
                let n = *n0 * w0 + *n1 * w1 + *n2 * w2;
                n.try_normalize().unwrap_or(self.plane.plane_normal().get())
            }
            None => self.plane.plane_normal().get(),
        }
    }

    fn bounding_box(&self) -> Option<Aabb> {
        Some(Aabb::enclosing([self.v0, self.v1, self.v2]))
    }
}
