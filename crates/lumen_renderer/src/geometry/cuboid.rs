//! Oriented box built from six convex quadrilaterals.

use lumen_math::{Aabb, DQuat, DVec3, Ray, EPSILON};

use super::{Geometry, Polygon};
use crate::error::{ensure_positive, RenderResult};

/// Local `(u, v)` face axes for each `(axis, sign)`, chosen so `u x v` points
/// out of the box and the face vertices wind counter-clockwise from outside.
const FACE_AXES: [(usize, f64, usize, usize); 6] = [
    (0, 1.0, 1, 2),
    (0, -1.0, 2, 1),
    (1, 1.0, 2, 0),
    (1, -1.0, 0, 2),
    (2, 1.0, 0, 1),
    (2, -1.0, 1, 0),
];

/// A box with arbitrary orientation.
#[derive(Debug, Clone, PartialEq)]
pub struct Cuboid {
    center: DVec3,
    half_extents: DVec3,
    rotation: DQuat,
    faces: Vec<Polygon>,
}

impl Cuboid {
    /// Axis-aligned box of the given full `size` around `center`.
    pub fn new(center: DVec3, size: DVec3) -> RenderResult<Self> {
        Self::rotated(center, size, DQuat::IDENTITY)
    }

    /// Box of the given full `size` around `center`, rotated by `rotation`.
    pub fn rotated(center: DVec3, size: DVec3, rotation: DQuat) -> RenderResult<Self> {
        let half_extents = DVec3::new(
            ensure_positive("box width", size.x)?,
            ensure_positive("box height", size.y)?,
            ensure_positive("box depth", size.z)?,
        ) * 0.5;
        let rotation = rotation.normalize();

        let to_world = |local: DVec3| center + rotation * local;
        let faces = FACE_AXES
            .iter()
            .map(|&(axis, sign, u, v)| {
                let face_center = DVec3::AXES[axis] * (sign * half_extents[axis]);
                let du = DVec3::AXES[u] * half_extents[u];
                let dv = DVec3::AXES[v] * half_extents[v];
                Polygon::new(vec![
                    to_world(face_center - du - dv),
                    to_world(face_center + du - dv),
                    to_world(face_center + du + dv),
                    to_world(face_center - du + dv),
                ])
            })
            .collect::<RenderResult<Vec<_>>>()?;

        Ok(Self {
            center,
            half_extents,
            rotation,
            faces,
        })
    }

    pub fn center(&self) -> DVec3 {
        self.center
    }

    pub fn faces(&self) -> &[Polygon] {
        &self.faces
    }

    /// The eight corner points in world space.
    pub fn corners(&self) -> [DVec3; 8] {
        let h = self.half_extents;
        std::array::from_fn(|i| {
            let local = DVec3::new(
                if i & 1 == 0 { -h.x } else { h.x },
                if i & 2 == 0 { -h.y } else { h.y },
                if i & 4 == 0 { -h.z } else { h.z },
            );
            self.center + self.rotation * local
        })
    }
}

impl Geometry for Cuboid {
    /// All face hits collapse into the single nearest one.
    fn intersect(&self, ray: &Ray, max_distance: f64) -> Vec<f64> {
        self.faces
            .iter()
            .flat_map(|face| face.intersect(ray, max_distance))
            .min_by(f64::total_cmp)
            .into_iter()
            .collect()
    }

    /// Normal of the face the point lies on.
    ///
    /// Exact face tests run in axis order X, Y, Z with the positive face
    /// first, so edges and corners resolve to the lowest axis. Points that
    /// fail every exact test due to rounding fall back to the axis with the
    /// smallest residual, again preferring the lowest axis on ties.
    fn normal(&self, point: DVec3) -> DVec3 {
        let local = self.rotation.inverse() * (point - self.center);
        let h = self.half_extents;
        let tolerance = EPSILON * h.max_element().max(1.0);

        for axis in 0..3 {
            if (local[axis] - h[axis]).abs() < tolerance {
                return self.rotation * DVec3::AXES[axis];
            }
            if (local[axis] + h[axis]).abs() < tolerance {
                return self.rotation * -DVec3::AXES[axis];
            }
        }

        let mut best_axis = 0;
        let mut best_residual = f64::INFINITY;
        for axis in 0..3 {
            let residual = (local[axis].abs() - h[axis]).abs();
            if residual < best_residual {
                best_residual = residual;
                best_axis = axis;
            }
        }
        let sign = if local[best_axis] >= 0.0 { 1.0 } else { -1.0 };
        self.rotation * (DVec3::AXES[best_axis] * sign)
    }

    fn bounding_box(&self) -> Option<Aabb> {
        Some(Aabb::enclosing(self.corners()))
    }
}
