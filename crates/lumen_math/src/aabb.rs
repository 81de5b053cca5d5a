use crate::{Interval, Ray};
use glam::DVec3;

/// Axis-Aligned Bounding Box used by the voxel grid.
///
/// An AABB is defined by three intervals (one per axis) that bound a 3D volume.
/// Invariant: for a non-empty box, `min()` is componentwise `<=` `max()`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Aabb {
    pub x: Interval,
    pub y: Interval,
    pub z: Interval,
}

impl Aabb {
    /// Create a new AABB from three intervals.
    pub fn new(x: Interval, y: Interval, z: Interval) -> Self {
        let mut aabb = Self { x, y, z };
        aabb.pad_to_minimums();
        aabb
    }

    /// Create an AABB from two corner points.
    pub fn from_points(a: DVec3, b: DVec3) -> Self {
        Self::new(
            Interval::new(a.x.min(b.x), a.x.max(b.x)),
            Interval::new(a.y.min(b.y), a.y.max(b.y)),
            Interval::new(a.z.min(b.z), a.z.max(b.z)),
        )
    }

    /// Create the tightest AABB around a set of points.
    ///
    /// Returns `Aabb::EMPTY` for an empty set.
    pub fn enclosing<I: IntoIterator<Item = DVec3>>(points: I) -> Self {
        let mut min = DVec3::splat(f64::INFINITY);
        let mut max = DVec3::splat(f64::NEG_INFINITY);
        let mut any = false;
        for p in points {
            min = min.min(p);
            max = max.max(p);
            any = true;
        }
        if !any {
            return Aabb::EMPTY;
        }
        Aabb::from_points(min, max)
    }

    /// Create an AABB that surrounds two other AABBs.
    pub fn surrounding(box0: &Aabb, box1: &Aabb) -> Self {
        Self {
            x: Interval::surrounding(&box0.x, &box1.x),
            y: Interval::surrounding(&box0.y, &box1.y),
            z: Interval::surrounding(&box0.z, &box1.z),
        }
    }

    /// Minimum corner.
    pub fn min(&self) -> DVec3 {
        DVec3::new(self.x.min, self.y.min, self.z.min)
    }

    /// Maximum corner.
    pub fn max(&self) -> DVec3 {
        DVec3::new(self.x.max, self.y.max, self.z.max)
    }

    /// Edge lengths along each axis.
    pub fn size(&self) -> DVec3 {
        self.max() - self.min()
    }

    /// Returns true if the box contains nothing.
    pub fn is_empty(&self) -> bool {
        self.x.is_empty() || self.y.is_empty() || self.z.is_empty()
    }

    /// Get the interval for a specific axis (0=X, 1=Y, 2=Z).
    pub fn axis_interval(&self, n: usize) -> Interval {
        match n {
            0 => self.x,
            1 => self.y,
            _ => self.z,
        }
    }

    /// Returns true if `p` lies inside or on the box.
    pub fn contains_point(&self, p: DVec3) -> bool {
        self.x.contains(p.x) && self.y.contains(p.y) && self.z.contains(p.z)
    }

    /// Returns true if `other` lies entirely inside this box.
    pub fn contains(&self, other: &Aabb) -> bool {
        self.x.encloses(&other.x) && self.y.encloses(&other.y) && self.z.encloses(&other.z)
    }

    /// Test if a ray intersects this AABB within the given interval.
    pub fn hit(&self, r: &Ray, ray_t: Interval) -> bool {
        self.clip(r, ray_t).is_some()
    }

    /// Clip a ray parameter range against the box.
    ///
    /// Uses the slab method. Returns the sub-range of `ray_t` during which the
    /// ray is inside the box, or `None` if the ray misses it.
    pub fn clip(&self, r: &Ray, mut ray_t: Interval) -> Option<Interval> {
        let origin = r.origin;
        let dir = r.direction.get();

        for axis in 0..3 {
            let slab = self.axis_interval(axis);
            let d = dir[axis];
            let o = origin[axis];

            // Parallel to the slab: either always inside it or never.
            if d == 0.0 {
                if !slab.contains(o) {
                    return None;
                }
                continue;
            }

            let adinv = 1.0 / d;
            let mut t0 = (slab.min - o) * adinv;
            let mut t1 = (slab.max - o) * adinv;
            if adinv < 0.0 {
                std::mem::swap(&mut t0, &mut t1);
            }
            ray_t.min = t0.max(ray_t.min);
            ray_t.max = t1.min(ray_t.max);
            if ray_t.max < ray_t.min {
                return None;
            }
        }

        Some(ray_t)
    }

    /// Pad intervals to avoid zero-width AABBs (degenerate cases).
    fn pad_to_minimums(&mut self) {
        let delta = 0.0001;
        if self.x.size() < delta {
            self.x = self.x.expand(delta);
        }
        if self.y.size() < delta {
            self.y = self.y.expand(delta);
        }
        if self.z.size() < delta {
            self.z = self.z.expand(delta);
        }
    }

    pub const EMPTY: Aabb = Aabb {
        x: Interval::EMPTY,
        y: Interval::EMPTY,
        z: Interval::EMPTY,
    };
}
