//! Simple ray tracer example.
//!
//! Renders one of every primitive with soft shadows and antialiasing, and
//! streams the pixels into a PPM file.

use std::f64::consts::FRAC_PI_6;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::sync::Arc;

use anyhow::Context;
use lumen_renderer::{
    color_to_rgb8, Camera, Color, Cuboid, Cylinder, DQuat, DVec3, Effect, GridTracer, Light, Material,
    PixelSink, Plane, Polygon, Primitive, RenderConfig, RenderMode, Renderer, SamplerConfig, SamplingMethod,
    Scene, ShadingConfig, Sphere, Triangle,
};

/// Writes a binary PPM once every pixel has arrived.
struct PpmSink {
    width: u32,
    height: u32,
    bytes: Vec<u8>,
    writer: BufWriter<File>,
    error: Option<std::io::Error>,
}

impl PpmSink {
    fn create(path: &str, width: u32, height: u32) -> anyhow::Result<Self> {
        let file = File::create(path).with_context(|| format!("creating {path}"))?;
        Ok(Self {
            width,
            height,
            bytes: vec![0; width as usize * height as usize * 3],
            writer: BufWriter::new(file),
            error: None,
        })
    }

    fn write_all(&mut self) -> std::io::Result<()> {
        write!(self.writer, "P6\n{} {}\n255\n", self.width, self.height)?;
        self.writer.write_all(&self.bytes)?;
        self.writer.flush()
    }
}

impl PixelSink for PpmSink {
    fn write_pixel(&mut self, row: u32, col: u32, color: Color) {
        let offset = (row as usize * self.width as usize + col as usize) * 3;
        self.bytes[offset..offset + 3].copy_from_slice(&color_to_rgb8(color));
    }

    fn finish(&mut self) {
        if let Err(e) = self.write_all() {
            self.error = Some(e);
        }
    }
}

fn build_scene() -> anyhow::Result<Scene> {
    let mut scene = Scene::new()
        .with_background(Color::new(0.5, 0.7, 1.0))
        .with_ambient(Color::splat(0.08));

    // Ground
    scene.add(Primitive::new(
        Plane::new(DVec3::new(0.0, -1.0, 0.0), DVec3::Y)?,
        Material::new(Color::splat(0.6)).with_reflection(0.15, 0.0),
    ));

    // Glass, mirror and matte spheres
    scene.add(Primitive::new(
        Sphere::new(DVec3::new(0.0, 0.0, -5.0), 1.0)?,
        Material::new(Color::ONE)
            .with_diffuse(0.1)
            .with_specular(0.8, 64.0)
            .with_transparency(0.85, 1.5),
    ));
    scene.add(Primitive::new(
        Sphere::new(DVec3::new(-2.4, 0.0, -6.5), 1.0)?,
        Material::new(Color::new(0.9, 0.9, 0.95))
            .with_diffuse(0.1)
            .with_reflection(0.8, 0.05),
    ));
    scene.add(Primitive::new(
        Sphere::new(DVec3::new(2.4, -0.4, -4.5), 0.6)?,
        Material::new(Color::new(0.8, 0.2, 0.2)).with_specular(0.4, 32.0),
    ));

    // Capped cylinder and a tilted box
    scene.add(Primitive::new(
        Cylinder::new(DVec3::new(1.8, -1.0, -8.0), DVec3::Y, 0.5, 2.0)?,
        Material::new(Color::new(0.2, 0.6, 0.3)),
    ));
    scene.add(Primitive::new(
        Cuboid::rotated(
            DVec3::new(-1.0, -0.5, -3.2),
            DVec3::splat(0.8),
            DQuat::from_rotation_y(FRAC_PI_6),
        )?,
        Material::new(Color::new(0.3, 0.3, 0.8)).with_specular(0.3, 16.0),
    ));

    // Flat shapes in the back
    scene.add(Primitive::new(
        Triangle::new(
            DVec3::new(-4.0, -1.0, -12.0),
            DVec3::new(-1.0, -1.0, -12.0),
            DVec3::new(-2.5, 2.5, -12.0),
        )?,
        Material::new(Color::new(0.9, 0.7, 0.1)),
    ));
    let hexagon = (0..6)
        .map(|i| {
            let a = i as f64 * std::f64::consts::TAU / 6.0;
            DVec3::new(2.5 + a.cos(), 1.5 + a.sin(), -12.0)
        })
        .collect();
    scene.add(Primitive::new(
        Polygon::new(hexagon)?,
        Material::new(Color::ZERO).with_emission(Color::new(1.0, 0.5, 0.9)),
    ));

    scene.add_light(Light::disk(DVec3::new(-3.0, 6.0, 0.0), Color::splat(0.9), 1.0)?);
    scene.add_light(Light::point(DVec3::new(4.0, 3.0, -2.0), Color::splat(0.3)));
    Ok(scene)
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let (width, height) = (400, 300);
    let scene = Arc::new(build_scene()?);
    let tracer = Arc::new(GridTracer::new(scene, ShadingConfig::default()));

    let camera = Camera::builder()
        .with_position(DVec3::new(0.0, 0.5, 1.0))
        .with_direction(DVec3::NEG_Z)
        .with_view_plane(1.0, 1.2, 0.9)
        .with_resolution(width, height)
        .build()?;

    let sampler = SamplerConfig::default()
        .with_method(SamplingMethod::Jittered)
        .with_grid_size(3)
        .with_ray_count(9)
        .with_circle_mask(true)
        .with_effect(Effect::Antialiasing, true)
        .with_effect(Effect::SoftShadows, true)
        .with_effect(Effect::Glossy, true);

    let renderer = Renderer::builder()
        .with_camera(camera)
        .with_tracer(tracer)
        .with_sampler(sampler)
        .with_config(RenderConfig::default().with_mode(RenderMode::ThreadPool { threads: None }))
        .build()?;

    let path = "output.ppm";
    let mut sink = PpmSink::create(path, width, height)?;
    renderer.render_into(&mut sink);
    if let Some(e) = sink.error.take() {
        return Err(e).with_context(|| format!("writing {path}"));
    }
    log::info!("Saved to {}", path);
    Ok(())
}
