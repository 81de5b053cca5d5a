//! Pixel scheduling and image output.
//!
//! Three interchangeable execution modes produce the same buffer: a plain
//! loop, a rayon parallel map, and a fixed pool of scoped worker threads that
//! claim pixels from a shared atomic counter. Every pixel draws its random
//! numbers from its own generator seeded by the pixel index, so the output
//! never depends on which thread rendered what.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{RenderError, RenderResult};
use crate::sampler::{Sampler, SamplerConfig};
use crate::tracer::Tracer;
use crate::{Camera, Color};

/// How pixels are distributed over threads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderMode {
    /// Single-threaded loop in row-major order
    Sequential,
    /// Rayon parallel map over all pixel indices
    #[default]
    ParallelMap,
    /// Fixed worker pool; `None` uses every core but one
    ThreadPool { threads: Option<usize> },
}

/// Render configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub mode: RenderMode,
    /// Log progress every this many percent (0 = silent)
    pub progress_interval: u32,
    /// Base seed for per-pixel random streams
    pub seed: u64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            mode: RenderMode::default(),
            progress_interval: 10,
            seed: 0,
        }
    }
}

impl RenderConfig {
    pub fn with_mode(mut self, mode: RenderMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_progress_interval(mut self, percent: u32) -> Self {
        self.progress_interval = percent;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

/// Worker count used when a thread pool size is not given.
pub fn default_thread_count() -> usize {
    thread::available_parallelism()
        .map(|n| n.get().saturating_sub(1))
        .unwrap_or(1)
        .max(1)
}

/// Destination for finished pixels.
pub trait PixelSink {
    fn write_pixel(&mut self, row: u32, col: u32, color: Color);

    /// Called once after the last pixel has been written.
    fn finish(&mut self) {}
}

/// Apply gamma correction (gamma = 2.0).
#[inline]
pub fn linear_to_gamma(linear: f64) -> f64 {
    if linear > 0.0 {
        linear.sqrt()
    } else {
        0.0
    }
}

/// Convert a linear color to gamma-corrected 8-bit RGB.
pub fn color_to_rgb8(color: Color) -> [u8; 3] {
    color
        .to_array()
        .map(|c| (255.0 * linear_to_gamma(c).clamp(0.0, 1.0)).round() as u8)
}

/// In-memory image holding linear, unclamped colors.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageBuffer {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<Color>,
}

impl ImageBuffer {
    /// Create a new image buffer filled with black.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![Color::ZERO; width as usize * height as usize],
        }
    }

    fn index(&self, row: u32, col: u32) -> usize {
        row as usize * self.width as usize + col as usize
    }

    /// Get the pixel at `(row, col)`.
    pub fn get(&self, row: u32, col: u32) -> Color {
        self.pixels[self.index(row, col)]
    }

    /// Set the pixel at `(row, col)`.
    pub fn set(&mut self, row: u32, col: u32, color: Color) {
        let index = self.index(row, col);
        self.pixels[index] = color;
    }

    /// Gamma-corrected RGB bytes in row-major order, for encoders.
    pub fn to_rgb8(&self) -> Vec<u8> {
        self.pixels.iter().flat_map(|c| color_to_rgb8(*c)).collect()
    }
}

impl PixelSink for ImageBuffer {
    fn write_pixel(&mut self, row: u32, col: u32, color: Color) {
        self.set(row, col, color);
    }
}

/// Logs completion percentage at a fixed interval, from any thread.
struct Progress {
    total: usize,
    interval: usize,
    done: AtomicUsize,
    reported: AtomicUsize,
}

impl Progress {
    fn new(total: usize, interval: u32) -> Self {
        Self {
            total,
            interval: interval as usize,
            done: AtomicUsize::new(0),
            reported: AtomicUsize::new(0),
        }
    }

    fn tick(&self) {
        if self.interval == 0 || self.total == 0 {
            return;
        }
        let done = self.done.fetch_add(1, Ordering::Relaxed) + 1;
        let percent = done * 100 / self.total;
        let step = percent / self.interval;
        if step > 0 && self.reported.fetch_max(step, Ordering::Relaxed) < step {
            log::info!("Rendered {}%", step * self.interval);
        }
    }
}

/// Render every pixel of `camera` into `sink`.
///
/// Blocks until the last pixel is written, then calls [`PixelSink::finish`].
pub fn render_into(
    camera: &Camera,
    tracer: &dyn Tracer,
    sampler: &Sampler,
    config: &RenderConfig,
    sink: &mut dyn PixelSink,
) {
    let (width, height) = camera.resolution();
    let total = camera.pixel_count();
    let progress = Progress::new(total, config.progress_interval);
    let start = Instant::now();
    log::info!("Rendering {}x{} ({:?})", width, height, config.mode);

    let shade = |index: usize| {
        let (row, col) = ((index / width as usize) as u32, (index % width as usize) as u32);
        let mut rng = pixel_rng(config.seed, index);
        let color = camera.render_pixel(tracer, sampler, row, col, &mut rng);
        progress.tick();
        color
    };

    let mut write = |index: usize, color: Color| {
        sink.write_pixel((index / width as usize) as u32, (index % width as usize) as u32, color);
    };

    match config.mode {
        RenderMode::Sequential => {
            for index in 0..total {
                write(index, shade(index));
            }
        }
        RenderMode::ParallelMap => {
            let colors: Vec<Color> = (0..total).into_par_iter().map(shade).collect();
            for (index, color) in colors.into_iter().enumerate() {
                write(index, color);
            }
        }
        RenderMode::ThreadPool { threads } => {
            let threads = threads.unwrap_or_else(default_thread_count).max(1);
            for (index, color) in render_pool(total, threads, &shade) {
                write(index, color);
            }
        }
    }

    sink.finish();
    log::info!("Render finished in {:.2?}", start.elapsed());
}

/// Render into a fresh [`ImageBuffer`].
pub fn render(camera: &Camera, tracer: &dyn Tracer, sampler: &Sampler, config: &RenderConfig) -> ImageBuffer {
    let (width, height) = camera.resolution();
    let mut image = ImageBuffer::new(width, height);
    render_into(camera, tracer, sampler, config, &mut image);
    image
}

/// Independent random stream for one pixel.
fn pixel_rng(seed: u64, index: usize) -> StdRng {
    StdRng::seed_from_u64(seed ^ (index as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15))
}

/// Fixed pool of scoped workers pulling pixel indices from an atomic counter.
///
/// Each worker keeps its results locally until joined. Pixels lost to a
/// panicking worker are rendered afterwards on the calling thread.
fn render_pool<F>(total: usize, threads: usize, shade: &F) -> Vec<(usize, Color)>
where
    F: Fn(usize) -> Color + Sync,
{
    let next = AtomicUsize::new(0);
    let mut results: Vec<(usize, Color)> = Vec::with_capacity(total);

    thread::scope(|s| {
        let workers: Vec<_> = (0..threads)
            .map(|_| {
                s.spawn(|| {
                    let mut local = Vec::new();
                    loop {
                        let index = next.fetch_add(1, Ordering::Relaxed);
                        if index >= total {
                            break;
                        }
                        local.push((index, shade(index)));
                    }
                    local
                })
            })
            .collect();

        for (id, worker) in workers.into_iter().enumerate() {
            match worker.join() {
                Ok(local) => results.extend(local),
                Err(_) => log::error!("Render worker {} panicked, its pixels will be re-rendered", id),
            }
        }
    });

    if results.len() < total {
        let mut written = vec![false; total];
        for (index, _) in &results {
            written[*index] = true;
        }
        let missing: Vec<usize> = (0..total).filter(|&i| !written[i]).collect();
        log::warn!("Re-rendering {} pixels on the calling thread", missing.len());
        results.extend(missing.into_iter().map(|index| (index, shade(index))));
    }

    results
}

/// A camera, a tracing strategy and a sampler, ready to render.
pub struct Renderer {
    camera: Camera,
    tracer: Arc<dyn Tracer>,
    sampler: Sampler,
    config: RenderConfig,
}

impl Renderer {
    pub fn builder() -> RendererBuilder {
        RendererBuilder::default()
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn tracer(&self) -> &dyn Tracer {
        self.tracer.as_ref()
    }

    pub fn sampler(&self) -> &Sampler {
        &self.sampler
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn render(&self) -> ImageBuffer {
        render(&self.camera, self.tracer.as_ref(), &self.sampler, &self.config)
    }

    pub fn render_into(&self, sink: &mut dyn PixelSink) {
        render_into(&self.camera, self.tracer.as_ref(), &self.sampler, &self.config, sink);
    }
}

/// Builder for [`Renderer`]. Camera and tracer are required.
#[derive(Default)]
pub struct RendererBuilder {
    camera: Option<Camera>,
    tracer: Option<Arc<dyn Tracer>>,
    sampler: SamplerConfig,
    config: RenderConfig,
}

impl RendererBuilder {
    pub fn with_camera(mut self, camera: Camera) -> Self {
        self.camera = Some(camera);
        self
    }

    pub fn with_tracer(mut self, tracer: Arc<dyn Tracer>) -> Self {
        self.tracer = Some(tracer);
        self
    }

    pub fn with_sampler(mut self, sampler: SamplerConfig) -> Self {
        self.sampler = sampler;
        self
    }

    pub fn with_config(mut self, config: RenderConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> RenderResult<Renderer> {
        Ok(Renderer {
            camera: self.camera.ok_or(RenderError::MissingField("camera"))?,
            tracer: self.tracer.ok_or(RenderError::MissingField("tracing strategy"))?,
            sampler: Sampler::new(self.sampler)?,
            config: self.config,
        })
    }
}
