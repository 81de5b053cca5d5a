//! Secondary sample generation.
//!
//! One abstraction drives four effects: antialiasing (pixel footprint), soft
//! shadows (light disk), depth of field (lens aperture) and glossy reflection
//! (disk around the mirror direction). Callers only vary the region center,
//! its extent and the basis it is laid out in.
//!
//! A [`Sampler`] is immutable; every call allocates its own output and takes
//! the caller's RNG, so one sampler can serve all render threads.

use lumen_math::{DVec2, DVec3, Direction};
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

use crate::error::{RenderError, RenderResult};

/// Largest lattice edge accepted for GRID and JITTERED sampling.
const MAX_GRID_SIZE: usize = 1024;

/// How sample points are laid out over the unit square.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SamplingMethod {
    /// Regular lattice of cell centers
    #[default]
    Grid,
    /// Independent uniform samples
    Random,
    /// Lattice with a random offset inside each cell
    Jittered,
}

/// Effects the sampler can drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    Antialiasing,
    SoftShadows,
    DepthOfField,
    Glossy,
}

/// Sampler settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerConfig {
    pub method: SamplingMethod,
    /// Sample budget per region
    pub ray_count: usize,
    /// Lattice edge for GRID and JITTERED
    pub grid_size: usize,
    /// Drop points outside the circle inscribed in the region
    pub circle_mask: bool,
    pub antialiasing: bool,
    pub soft_shadows: bool,
    pub depth_of_field: bool,
    pub glossy: bool,
    /// Color difference that triggers adaptive subdivision of a pixel
    pub adaptive_threshold: Option<f64>,
    /// Maximum adaptive subdivision depth
    pub max_adaptive_depth: u32,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            method: SamplingMethod::Grid,
            ray_count: 16,
            grid_size: 4,
            circle_mask: false,
            antialiasing: false,
            soft_shadows: false,
            depth_of_field: false,
            glossy: false,
            adaptive_threshold: None,
            max_adaptive_depth: 3,
        }
    }
}

impl SamplerConfig {
    pub fn with_method(mut self, method: SamplingMethod) -> Self {
        self.method = method;
        self
    }

    pub fn with_ray_count(mut self, ray_count: usize) -> Self {
        self.ray_count = ray_count;
        self
    }

    pub fn with_grid_size(mut self, grid_size: usize) -> Self {
        self.grid_size = grid_size;
        self
    }

    pub fn with_circle_mask(mut self, circle_mask: bool) -> Self {
        self.circle_mask = circle_mask;
        self
    }

    /// Turn an effect on or off.
    pub fn with_effect(mut self, effect: Effect, enabled: bool) -> Self {
        match effect {
            Effect::Antialiasing => self.antialiasing = enabled,
            Effect::SoftShadows => self.soft_shadows = enabled,
            Effect::DepthOfField => self.depth_of_field = enabled,
            Effect::Glossy => self.glossy = enabled,
        }
        self
    }

    pub fn with_adaptive(mut self, threshold: f64, max_depth: u32) -> Self {
        self.adaptive_threshold = Some(threshold);
        self.max_adaptive_depth = max_depth;
        self
    }
}

/// Validated, immutable sampler.
#[derive(Debug, Clone, PartialEq)]
pub struct Sampler {
    config: SamplerConfig,
}

impl Default for Sampler {
    /// A sampler with every effect disabled.
    fn default() -> Self {
        Self {
            config: SamplerConfig::default(),
        }
    }
}

impl Sampler {
    /// Validate a configuration into a sampler.
    pub fn new(config: SamplerConfig) -> RenderResult<Self> {
        if config.ray_count == 0 {
            return Err(RenderError::InvalidSampler("ray count must be at least 1"));
        }
        if config.grid_size == 0 || config.grid_size > MAX_GRID_SIZE {
            return Err(RenderError::InvalidSampler("grid size must be in 1..=1024"));
        }
        if let Some(threshold) = config.adaptive_threshold {
            if !(threshold > 0.0 && threshold.is_finite()) {
                return Err(RenderError::InvalidSampler("adaptive threshold must be positive"));
            }
        }
        Ok(Self { config })
    }

    pub fn config(&self) -> &SamplerConfig {
        &self.config
    }

    pub fn is_enabled(&self, effect: Effect) -> bool {
        match effect {
            Effect::Antialiasing => self.config.antialiasing,
            Effect::SoftShadows => self.config.soft_shadows,
            Effect::DepthOfField => self.config.depth_of_field,
            Effect::Glossy => self.config.glossy,
        }
    }

    /// Adaptive antialiasing settings, if configured.
    pub fn adaptive(&self) -> Option<(f64, u32)> {
        self.config
            .adaptive_threshold
            .map(|t| (t, self.config.max_adaptive_depth))
    }

    /// Sample points in the unit square `[-0.5, 0.5]^2`, centered on the origin.
    ///
    /// With the circle mask on, points farther than 0.5 from the center are
    /// dropped, so the result may hold fewer points than the budget.
    pub fn points(&self, rng: &mut dyn RngCore) -> Vec<DVec2> {
        let mut points = match self.config.method {
            SamplingMethod::Grid => self.lattice(|| DVec2::splat(0.5)),
            SamplingMethod::Jittered => self.lattice(|| DVec2::new(rng.gen(), rng.gen())),
            SamplingMethod::Random => (0..self.config.ray_count)
                .map(|_| DVec2::new(rng.gen::<f64>() - 0.5, rng.gen::<f64>() - 0.5))
                .collect(),
        };
        if self.config.circle_mask {
            points.retain(|p| p.length() <= 0.5);
        }
        points
    }

    /// Lattice over the unit square with an in-cell offset per cell.
    ///
    /// When the budget is smaller than the lattice, the cells farthest from
    /// the center are kept first so coverage stays spread out.
    fn lattice<F>(&self, mut offset: F) -> Vec<DVec2>
    where
        F: FnMut() -> DVec2,
    {
        let g = self.config.grid_size;
        let mut cells: Vec<DVec2> = (0..g * g)
            .map(|i| DVec2::new((i % g) as f64, (i / g) as f64))
            .collect();

        if self.config.ray_count < cells.len() {
            let center = DVec2::splat((g as f64 - 1.0) / 2.0);
            cells.sort_by(|a, b| {
                b.distance_squared(center)
                    .total_cmp(&a.distance_squared(center))
            });
            cells.truncate(self.config.ray_count);
        }

        cells
            .into_iter()
            .map(|c| (c + offset()) / g as f64 - DVec2::splat(0.5))
            .collect()
    }

    /// Points spread over the parallelogram `center + s * u + t * v`,
    /// `s, t` in `[-0.5, 0.5]`. `u` and `v` are the full edge vectors.
    pub fn spread(&self, center: DVec3, u: DVec3, v: DVec3, rng: &mut dyn RngCore) -> Vec<DVec3> {
        self.points(rng)
            .into_iter()
            .map(|p| center + u * p.x + v * p.y)
            .collect()
    }

    /// Points on the disk of `radius` around `center`, facing `normal`.
    ///
    /// Without the circle mask the points cover the square circumscribing
    /// the disk.
    pub fn disk(&self, center: DVec3, normal: Direction, radius: f64, rng: &mut dyn RngCore) -> Vec<DVec3> {
        let u = normal.any_orthogonal();
        let v = normal.cross(u.get());
        let diameter = 2.0 * radius;
        self.spread(center, u * diameter, v * diameter, rng)
    }
}
