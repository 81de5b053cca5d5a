//! Ray-tracing strategies.
//!
//! A [`Tracer`] answers two geometric queries against a scene: the nearest
//! hit along a ray, and how much light survives along a ray through
//! translucent surfaces. Shading is shared by every strategy and lives in
//! [`crate::shading`]; strategies only differ in how they find hits.

use std::ops::ControlFlow;
use std::sync::Arc;

use lumen_math::Ray;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::grid::{VoxelGrid, DEFAULT_DENSITY};
use crate::{nearer, shading, Color, Intersection, Primitive, Sampler, Scene};

/// Transmittance below which a shadow ray counts as fully blocked.
pub const MIN_TRANSMITTANCE: f64 = 1e-3;

/// Shading and acceleration settings shared by all strategies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShadingConfig {
    /// Maximum number of reflection/refraction bounces
    pub max_depth: u32,
    /// Secondary rays whose weight drops below this are not traced
    pub min_contribution: f64,
    /// Target cells per primitive for the voxel grid
    pub grid_density: f64,
}

impl Default for ShadingConfig {
    fn default() -> Self {
        Self {
            max_depth: 5,
            min_contribution: 0.01,
            grid_density: DEFAULT_DENSITY,
        }
    }
}

impl ShadingConfig {
    pub fn with_max_depth(mut self, max_depth: u32) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_min_contribution(mut self, min_contribution: f64) -> Self {
        self.min_contribution = min_contribution.max(0.0);
        self
    }

    pub fn with_grid_density(mut self, grid_density: f64) -> Self {
        self.grid_density = grid_density;
        self
    }
}

/// A strategy for resolving rays against a scene.
pub trait Tracer: Send + Sync {
    fn scene(&self) -> &Scene;

    fn config(&self) -> &ShadingConfig;

    /// Nearest intersection along `ray` within `max_distance`.
    fn nearest_hit(&self, ray: &Ray, max_distance: f64) -> Option<Intersection<'_>>;

    /// Fraction of light that survives travelling `max_distance` along `ray`.
    ///
    /// Every surface crossed multiplies in its material's transparency.
    fn transmittance(&self, ray: &Ray, max_distance: f64) -> f64;

    /// Color seen along `ray`, with secondary effects driven by `sampler`.
    fn trace(&self, ray: &Ray, sampler: &Sampler, rng: &mut dyn RngCore) -> Color {
        shading::radiance(self, ray, sampler, rng)
    }

    /// Color seen along `ray` with every sampled effect disabled.
    fn trace_ray(&self, ray: &Ray) -> Color {
        let mut rng = StdRng::seed_from_u64(0);
        self.trace(ray, &Sampler::default(), &mut rng)
    }
}

/// Attenuate `transmittance` by every crossing of `ray` with `primitive`.
fn attenuate(transmittance: f64, primitive: &Primitive, ray: &Ray, max_distance: f64) -> f64 {
    let crossings = primitive.intersect(ray, max_distance).len();
    if crossings == 0 {
        transmittance
    } else {
        transmittance * primitive.material().transparency.powi(crossings as i32)
    }
}

/// Tests every primitive of the scene for every ray.
#[derive(Debug)]
pub struct BruteForceTracer {
    scene: Arc<Scene>,
    config: ShadingConfig,
}

impl BruteForceTracer {
    pub fn new(scene: Arc<Scene>, config: ShadingConfig) -> Self {
        scene.precompute_bounds();
        Self { scene, config }
    }
}

impl Tracer for BruteForceTracer {
    fn scene(&self) -> &Scene {
        &self.scene
    }

    fn config(&self) -> &ShadingConfig {
        &self.config
    }

    fn nearest_hit(&self, ray: &Ray, max_distance: f64) -> Option<Intersection<'_>> {
        self.scene.geometry().nearest_hit(ray, max_distance)
    }

    fn transmittance(&self, ray: &Ray, max_distance: f64) -> f64 {
        let mut transmittance = 1.0;
        for primitive in self.scene.primitives() {
            transmittance = attenuate(transmittance, primitive, ray, max_distance);
            if transmittance < MIN_TRANSMITTANCE {
                return 0.0;
            }
        }
        transmittance
    }
}

/// Walks a voxel grid for bounded primitives and tests unbounded ones
/// exhaustively.
#[derive(Debug)]
pub struct GridTracer {
    scene: Arc<Scene>,
    config: ShadingConfig,
    grid: VoxelGrid,
    /// Indices of the primitives kept out of the grid
    unbounded: Vec<usize>,
}

impl GridTracer {
    pub fn new(scene: Arc<Scene>, config: ShadingConfig) -> Self {
        scene.precompute_bounds();
        let grid = VoxelGrid::from_primitives(scene.primitives(), config.grid_density);
        let unbounded: Vec<usize> = scene
            .primitives()
            .iter()
            .enumerate()
            .filter(|(_, p)| !p.is_bounded())
            .map(|(i, _)| i)
            .collect();

        log::debug!(
            "Grid tracer: {} gridded, {} unbounded primitives",
            grid.len(),
            unbounded.len()
        );

        Self {
            scene,
            config,
            grid,
            unbounded,
        }
    }

    pub fn grid(&self) -> &VoxelGrid {
        &self.grid
    }

    fn unbounded(&self) -> impl Iterator<Item = &Primitive> {
        let primitives = self.scene.primitives();
        self.unbounded.iter().map(move |&i| &primitives[i])
    }
}

impl Tracer for GridTracer {
    fn scene(&self) -> &Scene {
        &self.scene
    }

    fn config(&self) -> &ShadingConfig {
        &self.config
    }

    fn nearest_hit(&self, ray: &Ray, max_distance: f64) -> Option<Intersection<'_>> {
        let mut closest = None;
        let mut limit = max_distance;
        for primitive in self.unbounded() {
            if let Some(hit) = primitive.nearest_hit(ray, limit) {
                limit = hit.t;
                closest = Some(hit);
            }
        }
        let gridded = self.grid.nearest_hit(self.scene.primitives(), ray, limit);
        nearer(closest, gridded)
    }

    fn transmittance(&self, ray: &Ray, max_distance: f64) -> f64 {
        let mut transmittance = 1.0;
        for primitive in self.unbounded() {
            transmittance = attenuate(transmittance, primitive, ray, max_distance);
            if transmittance < MIN_TRANSMITTANCE {
                return 0.0;
            }
        }

        // A primitive spanning several cells must only attenuate once
        let primitives = self.scene.primitives();
        let mut seen: Vec<u32> = Vec::new();
        self.grid.walk(ray, max_distance, |ids, _| {
            for &id in ids {
                if seen.contains(&id) {
                    continue;
                }
                seen.push(id);
                transmittance = attenuate(transmittance, &primitives[id as usize], ray, max_distance);
                if transmittance < MIN_TRANSMITTANCE {
                    return ControlFlow::Break(());
                }
            }
            ControlFlow::Continue(())
        });

        if transmittance < MIN_TRANSMITTANCE {
            0.0
        } else {
            transmittance
        }
    }
}
