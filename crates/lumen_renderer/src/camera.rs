//! Pinhole and thin-lens camera.
//!
//! Pixels map onto a physical view plane placed `view_distance` in front of
//! the camera. Pixel coordinates are continuous: `(0, 0)` is the top-left
//! corner of the image and pixel `(row, col)` covers
//! `[row, row + 1) x [col, col + 1)`.

use lumen_math::{DVec3, Direction, Ray};
use rand::RngCore;

use crate::error::{ensure_positive, RenderError, RenderResult};
use crate::sampler::Effect;
use crate::tracer::Tracer;
use crate::{Color, Sampler};

/// A validated camera.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    position: DVec3,
    direction: Direction,
    up: Direction,
    right: Direction,
    view_distance: f64,
    view_width: f64,
    view_height: f64,
    width: u32,
    height: u32,
    aperture: f64,
    focal_distance: f64,
}

impl Camera {
    pub fn builder() -> CameraBuilder {
        CameraBuilder::default()
    }

    pub fn position(&self) -> DVec3 {
        self.position
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn up(&self) -> Direction {
        self.up
    }

    pub fn right(&self) -> Direction {
        self.right
    }

    /// Image resolution as `(width, height)`.
    pub fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// World-space point on the view plane at continuous pixel coordinates.
    pub fn view_point(&self, row: f64, col: f64) -> DVec3 {
        let x = col / self.width as f64 - 0.5;
        let y = 0.5 - row / self.height as f64;
        self.position
            + self.direction * self.view_distance
            + self.right * (x * self.view_width)
            + self.up * (y * self.view_height)
    }

    /// Ray from the camera center through the middle of pixel `(row, col)`.
    pub fn primary_ray(&self, row: u32, col: u32) -> Ray {
        self.ray_through(self.view_point(row as f64 + 0.5, col as f64 + 0.5))
    }

    fn ray_through(&self, target: DVec3) -> Ray {
        // The view plane lies strictly in front of the camera, so the target
        // never coincides with the position
        let direction = Direction::between(self.position, target).unwrap_or(self.direction);
        Ray::new(self.position, direction)
    }

    /// Final color of pixel `(row, col)`.
    ///
    /// With antialiasing enabled the pixel footprint is sampled, either
    /// uniformly through the sampler or by adaptive corner subdivision when an
    /// adaptive threshold is configured.
    pub fn render_pixel(
        &self,
        tracer: &dyn Tracer,
        sampler: &Sampler,
        row: u32,
        col: u32,
        rng: &mut dyn RngCore,
    ) -> Color {
        let (row, col) = (row as f64, col as f64);
        if !sampler.is_enabled(Effect::Antialiasing) {
            return self.trace_through(tracer, sampler, self.view_point(row + 0.5, col + 0.5), rng);
        }

        if let Some((threshold, max_depth)) = sampler.adaptive() {
            return self.adaptive(tracer, sampler, (row, col), 1.0, threshold, max_depth, rng);
        }

        let center = self.view_point(row + 0.5, col + 0.5);
        let footprint_u = self.right * (self.view_width / self.width as f64);
        let footprint_v = self.up * (self.view_height / self.height as f64);
        let targets = sampler.spread(center, footprint_u, footprint_v, rng);
        if targets.is_empty() {
            return self.trace_through(tracer, sampler, center, rng);
        }

        let total: Color = targets
            .iter()
            .map(|&target| self.trace_through(tracer, sampler, target, rng))
            .sum();
        total / targets.len() as f64
    }

    /// Recursive corner sampling of the square with top-left corner
    /// `(row, col)` and edge `size`, in pixel units.
    #[allow(clippy::too_many_arguments)]
    fn adaptive(
        &self,
        tracer: &dyn Tracer,
        sampler: &Sampler,
        (row, col): (f64, f64),
        size: f64,
        threshold: f64,
        depth_left: u32,
        rng: &mut dyn RngCore,
    ) -> Color {
        let corners = [(row, col), (row, col + size), (row + size, col), (row + size, col + size)]
            .map(|(r, c)| self.trace_through(tracer, sampler, self.view_point(r, c), rng));
        let mean = corners.iter().sum::<Color>() / 4.0;

        let spread = corners
            .iter()
            .map(|c| (*c - mean).abs().max_element())
            .fold(0.0, f64::max);
        if depth_left == 0 || spread <= threshold {
            return mean;
        }

        let half = size / 2.0;
        let total: Color = [(0.0, 0.0), (0.0, half), (half, 0.0), (half, half)]
            .iter()
            .map(|&(dr, dc)| {
                self.adaptive(tracer, sampler, (row + dr, col + dc), half, threshold, depth_left - 1, rng)
            })
            .sum();
        total / 4.0
    }

    /// Trace towards a view-plane point, through the lens when depth of field
    /// is on.
    fn trace_through(&self, tracer: &dyn Tracer, sampler: &Sampler, target: DVec3, rng: &mut dyn RngCore) -> Color {
        let primary = self.ray_through(target);
        if self.aperture <= 0.0 || !sampler.is_enabled(Effect::DepthOfField) {
            return tracer.trace(&primary, sampler, rng);
        }

        // Every lens sample converges on the same point of the focal plane
        let along = primary.direction.dot(self.direction.get());
        let focus = primary.at(self.focal_distance / along);
        let lens: Vec<Ray> = sampler
            .disk(self.position, self.direction, self.aperture, rng)
            .into_iter()
            .filter_map(|origin| Ray::towards(origin, focus).ok())
            .collect();
        if lens.is_empty() {
            return tracer.trace(&primary, sampler, rng);
        }

        let total: Color = lens.iter().map(|ray| tracer.trace(ray, sampler, rng)).sum();
        total / lens.len() as f64
    }
}

/// Builder for [`Camera`]. Position, direction and resolution are required.
#[derive(Debug, Clone)]
pub struct CameraBuilder {
    position: Option<DVec3>,
    direction: Option<DVec3>,
    up: DVec3,
    view_distance: f64,
    view_width: f64,
    view_height: f64,
    resolution: Option<(u32, u32)>,
    aperture: f64,
    focal_distance: Option<f64>,
}

impl Default for CameraBuilder {
    fn default() -> Self {
        Self {
            position: None,
            direction: None,
            up: DVec3::Y,
            view_distance: 1.0,
            view_width: 1.0,
            view_height: 1.0,
            resolution: None,
            aperture: 0.0,
            focal_distance: None,
        }
    }
}

impl CameraBuilder {
    pub fn with_position(mut self, position: DVec3) -> Self {
        self.position = Some(position);
        self
    }

    /// Viewing direction; need not be normalized.
    pub fn with_direction(mut self, direction: DVec3) -> Self {
        self.direction = Some(direction);
        self
    }

    /// Up vector, orthogonal to the viewing direction.
    pub fn with_up(mut self, up: DVec3) -> Self {
        self.up = up;
        self
    }

    /// Distance and physical size of the view plane.
    pub fn with_view_plane(mut self, distance: f64, width: f64, height: f64) -> Self {
        self.view_distance = distance;
        self.view_width = width;
        self.view_height = height;
        self
    }

    pub fn with_resolution(mut self, width: u32, height: u32) -> Self {
        self.resolution = Some((width, height));
        self
    }

    /// Lens radius and distance to the plane of perfect focus.
    pub fn with_lens(mut self, aperture: f64, focal_distance: f64) -> Self {
        self.aperture = aperture;
        self.focal_distance = Some(focal_distance);
        self
    }

    /// Validate the settings into a camera.
    pub fn build(self) -> RenderResult<Camera> {
        let position = self.position.ok_or(RenderError::MissingField("camera position"))?;
        let direction = Direction::new(self.direction.ok_or(RenderError::MissingField("camera direction"))?)?;
        let (width, height) = self.resolution.ok_or(RenderError::MissingField("camera resolution"))?;
        if width == 0 || height == 0 {
            return Err(RenderError::InvalidResolution { width, height });
        }

        let up = Direction::new(self.up)?;
        if !direction.is_orthogonal_to(up) {
            return Err(RenderError::NonOrthogonalBasis);
        }
        let right = Direction::new(direction.cross(up.get()))?;

        let view_distance = ensure_positive("view plane distance", self.view_distance)?;
        let view_width = ensure_positive("view plane width", self.view_width)?;
        let view_height = ensure_positive("view plane height", self.view_height)?;

        if !(self.aperture >= 0.0 && self.aperture.is_finite()) {
            return Err(RenderError::NonPositive {
                what: "aperture",
                value: self.aperture,
            });
        }
        let focal_distance = match self.focal_distance {
            Some(d) => ensure_positive("focal distance", d)?,
            None => view_distance,
        };

        Ok(Camera {
            position,
            direction,
            up,
            right,
            view_distance,
            view_width,
            view_height,
            width,
            height,
            aperture: self.aperture,
            focal_distance,
        })
    }
}
