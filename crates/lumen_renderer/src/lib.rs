//! Lumen - a CPU Whitted-style ray tracer.
//!
//! Scenes are built from primitive shapes with materials attached, then
//! rendered through a [`Camera`] by a [`Tracer`] strategy. Secondary effects
//! (antialiasing, soft shadows, depth of field, glossy reflection) all come
//! from one [`Sampler`].
//!
//! ```no_run
//! use std::sync::Arc;
//! use lumen_renderer::*;
//!
//! let mut scene = Scene::new().with_background(Color::new(0.5, 0.7, 1.0));
//! scene.add(Primitive::new(
//!     Sphere::new(DVec3::new(0.0, 0.0, -3.0), 1.0)?,
//!     Material::new(Color::new(0.8, 0.3, 0.3)),
//! ));
//! scene.add_light(Light::point(DVec3::new(2.0, 4.0, 0.0), Color::ONE));
//!
//! let renderer = Renderer::builder()
//!     .with_camera(
//!         Camera::builder()
//!             .with_position(DVec3::ZERO)
//!             .with_direction(DVec3::NEG_Z)
//!             .with_resolution(64, 64)
//!             .build()?,
//!     )
//!     .with_tracer(Arc::new(GridTracer::new(Arc::new(scene), ShadingConfig::default())))
//!     .build()?;
//! let image = renderer.render();
//! # Ok::<(), RenderError>(())
//! ```

mod camera;
mod error;
mod geometry;
mod grid;
mod light;
mod material;
mod renderer;
mod sampler;
mod scene;
mod shading;
mod tracer;

pub use camera::{Camera, CameraBuilder};
pub use error::{RenderError, RenderResult};
pub use geometry::{
    nearer, Composite, Cuboid, Cylinder, Geometry, Intersection, Plane, Polygon, Primitive, Shape, Sphere,
    Triangle, Tube,
};
pub use grid::{VoxelGrid, DEFAULT_DENSITY};
pub use light::Light;
pub use material::{Color, Material};
pub use renderer::{
    color_to_rgb8, default_thread_count, linear_to_gamma, render, render_into, ImageBuffer, PixelSink,
    RenderConfig, RenderMode, Renderer, RendererBuilder,
};
pub use sampler::{Effect, Sampler, SamplerConfig, SamplingMethod};
pub use scene::Scene;
pub use tracer::{BruteForceTracer, GridTracer, ShadingConfig, Tracer, MIN_TRANSMITTANCE};

/// Re-export the math types the public API is built on
pub use lumen_math::{Aabb, DQuat, DVec2, DVec3, Direction, Interval, MathError, Ray};
