//! Uniform voxel grid acceleration structure.
//!
//! Bounded primitives are binned into every cell their AABB overlaps. A ray
//! walks the cells front to back with a 3D DDA and only tests the primitives
//! registered in the cells it crosses.

use std::ops::{ControlFlow, Range};

use lumen_math::{Aabb, DVec3, Interval, Ray};

use crate::{Intersection, Primitive};

/// Target ratio of cells to primitives: `resolution^3 ~= DEFAULT_DENSITY * count`.
pub const DEFAULT_DENSITY: f64 = 2.0;

/// Upper bound on cells per axis.
const MAX_RESOLUTION: usize = 128;

/// A uniform 3D grid of cells holding primitive ids.
///
/// Invariant: `bounds` is the union of the boxes of every inserted entry. A
/// primitive may be registered in several cells.
#[derive(Debug, Clone)]
pub struct VoxelGrid {
    bounds: Aabb,
    resolution: [usize; 3],
    cell_size: DVec3,
    cells: Vec<Vec<u32>>,
    entries: Vec<(u32, Aabb)>,
    density: f64,
}

impl VoxelGrid {
    /// Create an empty grid. Bounds grow with the inserted boxes.
    pub fn new(density: f64) -> Self {
        Self {
            bounds: Aabb::EMPTY,
            resolution: [1; 3],
            cell_size: DVec3::ONE,
            cells: vec![Vec::new()],
            entries: Vec::new(),
            density: if density > 0.0 { density } else { DEFAULT_DENSITY },
        }
    }

    /// Build a grid over the bounded primitives of `primitives`.
    ///
    /// Cell ids are indices into `primitives`; unbounded primitives are skipped.
    pub fn from_primitives(primitives: &[Primitive], density: f64) -> Self {
        let entries: Vec<(u32, Aabb)> = primitives
            .iter()
            .enumerate()
            .filter_map(|(i, p)| p.bounding_box().map(|b| (i as u32, b)))
            .collect();

        let mut grid = Self::new(density);
        if let Some(bounds) = entries
            .iter()
            .map(|(_, b)| *b)
            .reduce(|a, b| Aabb::surrounding(&a, &b))
        {
            grid.bounds = bounds;
            grid.entries = entries;
            grid.rebin();
        }

        log::debug!(
            "Built voxel grid: {} entries, resolution {:?}, {} populated cells",
            grid.entries.len(),
            grid.resolution,
            grid.populated_cells()
        );
        grid
    }

    /// Cells per axis for `count` primitives at the given density.
    pub fn resolution_for(count: usize, density: f64) -> usize {
        ((density * count as f64).cbrt().ceil() as usize).clamp(1, MAX_RESOLUTION)
    }

    /// Register a primitive id with its bounding box.
    ///
    /// A box reaching outside the current bounds grows the grid, and a count
    /// that calls for a finer resolution refines it. Either way everything
    /// inserted so far is re-binned.
    pub fn insert(&mut self, id: u32, bbox: Aabb) {
        self.entries.push((id, bbox));
        if self.entries.len() == 1 {
            self.bounds = bbox;
            self.rebin();
        } else if !self.bounds.contains(&bbox) {
            self.bounds = Aabb::surrounding(&self.bounds, &bbox);
            self.rebin();
        } else if Self::resolution_for(self.entries.len(), self.density) > self.resolution[0] {
            self.rebin();
        } else {
            self.bin(id, &bbox);
        }
    }

    /// Overall grid bounds, `None` while empty.
    pub fn bounds(&self) -> Option<Aabb> {
        (!self.entries.is_empty()).then_some(self.bounds)
    }

    pub fn resolution(&self) -> [usize; 3] {
        self.resolution
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Ids registered in cell `(x, y, z)`.
    pub fn cell(&self, x: usize, y: usize, z: usize) -> &[u32] {
        &self.cells[self.flat_index([x, y, z])]
    }

    /// Number of cells holding at least one id.
    pub fn populated_cells(&self) -> usize {
        self.cells.iter().filter(|c| !c.is_empty()).count()
    }

    fn rebin(&mut self) {
        let n = Self::resolution_for(self.entries.len(), self.density);
        self.resolution = [n; 3];
        self.cell_size = self.bounds.size() / n as f64;
        self.cells = vec![Vec::new(); n * n * n];

        let entries = std::mem::take(&mut self.entries);
        for (id, bbox) in &entries {
            self.bin(*id, bbox);
        }
        self.entries = entries;
    }

    fn bin(&mut self, id: u32, bbox: &Aabb) {
        let [xs, ys, zs] = self.cell_range(bbox);
        for z in zs {
            for y in ys.clone() {
                for x in xs.clone() {
                    let index = self.flat_index([x, y, z]);
                    self.cells[index].push(id);
                }
            }
        }
    }

    #[inline]
    fn flat_index(&self, [x, y, z]: [usize; 3]) -> usize {
        let [nx, ny, _] = self.resolution;
        (z * ny + y) * nx + x
    }

    /// Cell coordinate of `value` on `axis`, clamped to the grid.
    #[inline]
    fn cell_coord(&self, axis: usize, value: f64) -> usize {
        let rel = (value - self.bounds.axis_interval(axis).min) / self.cell_size[axis];
        (rel.floor().max(0.0) as usize).min(self.resolution[axis] - 1)
    }

    fn cell_range(&self, bbox: &Aabb) -> [Range<usize>; 3] {
        std::array::from_fn(|axis| {
            let span = bbox.axis_interval(axis);
            self.cell_coord(axis, span.min)..self.cell_coord(axis, span.max) + 1
        })
    }

    /// Walk the populated cells pierced by `ray`, nearest first.
    ///
    /// `visit` receives the ids of each cell and the ray parameter at which
    /// the ray leaves that cell; returning `Break` stops the walk.
    pub fn walk<F>(&self, ray: &Ray, max_distance: f64, mut visit: F)
    where
        F: FnMut(&[u32], f64) -> ControlFlow<()>,
    {
        if self.entries.is_empty() {
            return;
        }
        let Some(span) = self.bounds.clip(ray, Interval::new(0.0, max_distance)) else {
            return;
        };

        let origin = ray.origin;
        let dir = ray.direction.get();
        let entry = ray.at(span.min);

        let mut index = [0usize; 3];
        let mut step = [0isize; 3];
        let mut t_max = [f64::INFINITY; 3];
        let mut t_delta = [f64::INFINITY; 3];

        for axis in 0..3 {
            index[axis] = self.cell_coord(axis, entry[axis]);
            let cell_min = self.bounds.axis_interval(axis).min + index[axis] as f64 * self.cell_size[axis];
            let d = dir[axis];
            if d > 0.0 {
                step[axis] = 1;
                t_max[axis] = (cell_min + self.cell_size[axis] - origin[axis]) / d;
                t_delta[axis] = self.cell_size[axis] / d;
            } else if d < 0.0 {
                step[axis] = -1;
                t_max[axis] = (cell_min - origin[axis]) / d;
                t_delta[axis] = -self.cell_size[axis] / d;
            }
        }

        loop {
            let t_exit = t_max[0].min(t_max[1]).min(t_max[2]).min(span.max);

            let ids = &self.cells[self.flat_index(index)];
            if !ids.is_empty() && visit(ids, t_exit).is_break() {
                return;
            }
            if t_exit >= span.max {
                return;
            }

            let axis = if t_max[0] < t_max[1] {
                if t_max[0] < t_max[2] { 0 } else { 2 }
            } else if t_max[1] < t_max[2] {
                1
            } else {
                2
            };

            let next = index[axis] as isize + step[axis];
            if next < 0 || next >= self.resolution[axis] as isize {
                return;
            }
            index[axis] = next as usize;
            t_max[axis] += t_delta[axis];
        }
    }

    /// Nearest hit among the gridded `primitives`.
    ///
    /// Stops as soon as the best hit so far lies before the exit of the current
    /// cell: every later cell starts beyond it. Primitives spanning several
    /// cells may be tested more than once.
    pub fn nearest_hit<'a>(
        &self,
        primitives: &'a [Primitive],
        ray: &Ray,
        max_distance: f64,
    ) -> Option<Intersection<'a>> {
        let mut best: Option<Intersection<'a>> = None;
        self.walk(ray, max_distance, |ids, t_exit| {
            let mut limit = best.as_ref().map_or(max_distance, |h| h.t);
            for &id in ids {
                if let Some(hit) = primitives[id as usize].nearest_hit(ray, limit) {
                    limit = hit.t;
                    best = Some(hit);
                }
            }
            match &best {
                Some(hit) if hit.t <= t_exit => ControlFlow::Break(()),
                _ => ControlFlow::Continue(()),
            }
        });
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Material, Sphere, Triangle};
    use lumen_math::Direction;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn sphere(center: DVec3, radius: f64) -> Primitive {
        Primitive::new(Sphere::new(center, radius).unwrap(), Material::default())
    }

    fn brute_force<'a>(primitives: &'a [Primitive], ray: &Ray) -> Option<Intersection<'a>> {
        primitives
            .iter()
            .filter_map(|p| p.nearest_hit(ray, f64::INFINITY))
            .min_by(|a, b| a.t.total_cmp(&b.t))
    }

    #[test]
    fn test_resolution_for() {
        assert_eq!(VoxelGrid::resolution_for(0, 2.0), 1);
        assert_eq!(VoxelGrid::resolution_for(3, 2.0), 2);
        assert_eq!(VoxelGrid::resolution_for(400, 2.0), 10);
        assert_eq!(VoxelGrid::resolution_for(10_000_000, 2.0), MAX_RESOLUTION);
    }

    #[test]
    fn test_empty_grid() {
        let grid = VoxelGrid::from_primitives(&[], DEFAULT_DENSITY);
        assert!(grid.is_empty());
        assert!(grid.bounds().is_none());

        let ray = Ray::new(DVec3::ZERO, Direction::X);
        let mut visited = 0;
        grid.walk(&ray, f64::INFINITY, |_, _| {
            visited += 1;
            ControlFlow::Continue(())
        });
        assert_eq!(visited, 0);
    }

    #[test]
    fn test_bounds_are_union_of_entries() {
        let prims = vec![
            sphere(DVec3::new(-5.0, 0.0, 0.0), 1.0),
            sphere(DVec3::new(5.0, 2.0, 1.0), 0.5),
        ];
        let grid = VoxelGrid::from_primitives(&prims, DEFAULT_DENSITY);
        let b = grid.bounds().unwrap();
        assert!((b.min() - DVec3::new(-6.0, -1.0, -1.0)).length() < 1e-9);
        assert!((b.max() - DVec3::new(5.5, 2.5, 1.5)).length() < 1e-9);
    }

    #[test]
    fn test_primitive_spans_multiple_cells() {
        let mut grid = VoxelGrid::new(DEFAULT_DENSITY);
        grid.insert(0, Aabb::from_points(DVec3::ZERO, DVec3::splat(1.0)));
        grid.insert(1, Aabb::from_points(DVec3::splat(3.0), DVec3::splat(4.0)));
        grid.insert(2, Aabb::from_points(DVec3::ZERO, DVec3::splat(4.0)));
        grid.insert(3, Aabb::from_points(DVec3::splat(2.5), DVec3::splat(3.5)));

        assert_eq!(grid.resolution(), [2, 2, 2]);
        let holding_big = (0..8)
            .filter(|i| grid.cell(i & 1, (i >> 1) & 1, i >> 2).contains(&2))
            .count();
        assert_eq!(holding_big, 8);
        assert!(grid.cell(0, 0, 0).contains(&0));
        assert!(!grid.cell(1, 1, 1).contains(&0));
    }

    #[test]
    fn test_incremental_insert_grows_bounds() {
        let mut grid = VoxelGrid::new(DEFAULT_DENSITY);
        grid.insert(0, Aabb::from_points(DVec3::ZERO, DVec3::ONE));
        grid.insert(1, Aabb::from_points(DVec3::splat(9.0), DVec3::splat(10.0)));
        let b = grid.bounds().unwrap();
        assert_eq!(b.min(), DVec3::ZERO);
        assert_eq!(b.max(), DVec3::splat(10.0));
        assert_eq!(grid.len(), 2);
    }

    #[test]
    fn test_incremental_insert_refines_resolution() {
        let mut grid = VoxelGrid::new(DEFAULT_DENSITY);
        grid.insert(0, Aabb::from_points(DVec3::ZERO, DVec3::splat(100.0)));
        assert_eq!(grid.resolution(), [2, 2, 2]);

        for i in 1..2000u32 {
            let corner = DVec3::new(
                (i % 10) as f64 * 10.0 + 1.0,
                ((i / 10) % 10) as f64 * 10.0 + 1.0,
                (i / 100) as f64 * 5.0 + 1.0,
            );
            grid.insert(i, Aabb::from_points(corner, corner + DVec3::ONE));
            let n = VoxelGrid::resolution_for(grid.len(), DEFAULT_DENSITY);
            assert_eq!(grid.resolution(), [n; 3], "after {} inserts", grid.len());
        }

        assert_eq!(grid.len(), 2000);
        assert_eq!(grid.resolution(), [16; 3]);
        // The big box still covers every cell, the small ones stay local
        assert!(grid.cell(0, 0, 0).contains(&0));
        assert!(grid.cell(15, 15, 15).contains(&0));
        assert_eq!(grid.populated_cells(), 16 * 16 * 16);
        let max_per_cell = (0..16 * 16 * 16)
            .map(|i| grid.cell(i % 16, (i / 16) % 16, i / 256).len())
            .max()
            .unwrap();
        assert!(max_per_cell < 100, "cell holds {max_per_cell} ids");
    }

    #[test]
    fn test_walk_visits_cells_in_order() {
        let prims: Vec<_> = (0..8)
            .map(|i| sphere(DVec3::new(i as f64 * 3.0, 0.0, 0.0), 1.0))
            .collect();
        let grid = VoxelGrid::from_primitives(&prims, DEFAULT_DENSITY);
        let ray = Ray::new(DVec3::new(-10.0, 0.0, 0.0), Direction::X);

        let mut exits = Vec::new();
        grid.walk(&ray, f64::INFINITY, |_, t_exit| {
            exits.push(t_exit);
            ControlFlow::Continue(())
        });
        assert!(!exits.is_empty());
        assert!(exits.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_ray_missing_grid() {
        let prims = vec![sphere(DVec3::ZERO, 1.0)];
        let grid = VoxelGrid::from_primitives(&prims, DEFAULT_DENSITY);
        let ray = Ray::new(DVec3::new(0.0, 5.0, 0.0), Direction::X);
        assert!(grid.nearest_hit(&prims, &ray, f64::INFINITY).is_none());
    }

    #[test]
    fn test_grid_matches_brute_force() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut prims: Vec<Primitive> = (0..60)
            .map(|_| {
                let c = DVec3::new(
                    rng.gen_range(-10.0..10.0),
                    rng.gen_range(-10.0..10.0),
                    rng.gen_range(-10.0..10.0),
                );
                sphere(c, rng.gen_range(0.2..1.5))
            })
            .collect();
        for _ in 0..20 {
            let a = DVec3::new(rng.gen_range(-10.0..10.0), rng.gen_range(-10.0..10.0), rng.gen_range(-10.0..10.0));
            let tri = Triangle::new(a, a + DVec3::new(2.0, 0.5, 0.0), a + DVec3::new(0.3, 2.0, 1.0)).unwrap();
            prims.push(Primitive::new(tri, Material::default()));
        }
        let grid = VoxelGrid::from_primitives(&prims, DEFAULT_DENSITY);

        for _ in 0..500 {
            let origin = DVec3::new(
                rng.gen_range(-15.0..15.0),
                rng.gen_range(-15.0..15.0),
                rng.gen_range(-15.0..15.0),
            );
            let dir = Direction::new(DVec3::new(
                rng.gen_range(-1.0..1.0),
                rng.gen_range(-1.0..1.0),
                rng.gen_range(-1.0..1.0),
            ))
            .unwrap();
            let ray = Ray::new(origin, dir);

            let expected = brute_force(&prims, &ray);
            let actual = grid.nearest_hit(&prims, &ray, f64::INFINITY);
            match (expected, actual) {
                (None, None) => {}
                (Some(e), Some(a)) => assert!((e.t - a.t).abs() < 1e-9, "{} vs {}", e.t, a.t),
                (e, a) => panic!("mismatch: brute force {:?} vs grid {:?}", e.map(|h| h.t), a.map(|h| h.t)),
            }
        }
    }
}
