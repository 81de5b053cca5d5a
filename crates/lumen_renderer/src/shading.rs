//! Whitted-style shading.
//!
//! Local terms (ambient, emission, Lambert diffuse, Phong specular) plus
//! recursive mirror reflection and refraction. Shadows are resolved through
//! the tracer's transmittance query, so translucent occluders only dim the
//! light. Recursion stops at the configured depth or once a secondary ray's
//! weight falls under the minimum contribution.

use lumen_math::{DVec3, Direction, Ray};
use rand::RngCore;

use crate::material::{reflect, refract};
use crate::sampler::Effect;
use crate::tracer::Tracer;
use crate::{Color, Intersection, Light, Material, Sampler};

/// Color seen along `ray`.
pub(crate) fn radiance<T: Tracer + ?Sized>(
    tracer: &T,
    ray: &Ray,
    sampler: &Sampler,
    rng: &mut dyn RngCore,
) -> Color {
    Shader { tracer, sampler }.trace(ray, 0, 1.0, rng)
}

struct Shader<'a, T: ?Sized> {
    tracer: &'a T,
    sampler: &'a Sampler,
}

impl<T: Tracer + ?Sized> Shader<'_, T> {
    fn trace(&self, ray: &Ray, depth: u32, weight: f64, rng: &mut dyn RngCore) -> Color {
        match self.tracer.nearest_hit(ray, f64::INFINITY) {
            Some(hit) => self.shade(&hit, ray, depth, weight, rng),
            None => self.tracer.scene().background(),
        }
    }

    fn shade(&self, hit: &Intersection<'_>, ray: &Ray, depth: u32, weight: f64, rng: &mut dyn RngCore) -> Color {
        let scene = self.tracer.scene();
        let material = hit.material();
        let (normal, front_face) = hit.facing_normal(ray);
        let view = -ray.direction.get();

        let mut local = scene.ambient() * material.color + material.emission;
        for light in scene.lights() {
            local += self.direct(light, hit.point, normal, view, material, rng);
        }

        let config = self.tracer.config();
        if depth >= config.max_depth {
            return local;
        }

        let mut color = local * (1.0 - material.transparency);

        let reflected_weight = weight * material.reflectivity;
        if reflected_weight > config.min_contribution {
            let mirror = reflect(ray.direction.get(), normal);
            color += self.reflection(hit.point, mirror, normal, material, depth, reflected_weight, rng)
                * material.reflectivity;
        }

        let refracted_weight = weight * material.transparency;
        if refracted_weight > config.min_contribution {
            let eta = if front_face {
                1.0 / material.refractive_index
            } else {
                material.refractive_index
            };
            // Total internal reflection sends the transmitted share back inside
            let bent = refract(ray.direction.get(), normal, eta)
                .unwrap_or_else(|| reflect(ray.direction.get(), normal));
            if let Ok(dir) = Direction::new(bent) {
                let next = Ray::offset(hit.point, dir, normal);
                color += self.trace(&next, depth + 1, refracted_weight, rng) * material.transparency;
            }
        }

        color
    }

    /// Diffuse and specular contribution of one light, scaled by its visibility.
    fn direct(
        &self,
        light: &Light,
        point: DVec3,
        normal: DVec3,
        view: DVec3,
        material: &Material,
        rng: &mut dyn RngCore,
    ) -> Color {
        let Ok(to_light) = Direction::between(point, light.position) else {
            return Color::ZERO;
        };
        let n_dot_l = to_light.dot(normal);
        if n_dot_l <= 0.0 {
            return Color::ZERO;
        }

        let visibility = self.visibility(light, point, normal, rng);
        if visibility <= 0.0 {
            return Color::ZERO;
        }

        let mut color = material.color * light.color * (material.diffuse * n_dot_l);
        if material.specular > 0.0 {
            let r = reflect(-to_light.get(), normal);
            let highlight = r.dot(view).max(0.0).powf(material.shininess);
            color += light.color * (material.specular * highlight);
        }
        color * visibility
    }

    /// Fraction of `light` reaching `point`.
    ///
    /// Area lights with soft shadows enabled average the transmittance over
    /// sample positions on the light disk, oriented to face the point.
    fn visibility(&self, light: &Light, point: DVec3, normal: DVec3, rng: &mut dyn RngCore) -> f64 {
        if !(light.is_area() && self.sampler.is_enabled(Effect::SoftShadows)) {
            return self.unoccluded(point, light.position, normal);
        }
        let Ok(facing) = Direction::between(light.position, point) else {
            return 1.0;
        };
        let targets = self.sampler.disk(light.position, facing, light.radius, rng);
        if targets.is_empty() {
            return self.unoccluded(point, light.position, normal);
        }
        let total: f64 = targets
            .iter()
            .map(|&target| self.unoccluded(point, target, normal))
            .sum();
        total / targets.len() as f64
    }

    /// Transmittance along the segment from a surface point to `target`.
    fn unoccluded(&self, point: DVec3, target: DVec3, normal: DVec3) -> f64 {
        let Ok(dir) = Direction::between(point, target) else {
            return 1.0;
        };
        let shadow = Ray::offset(point, dir, normal);
        let distance = shadow.origin.distance(target);
        self.tracer.transmittance(&shadow, distance)
    }

    /// Mirror reflection, blurred over a disk around the mirror direction
    /// when glossy sampling is on.
    #[allow(clippy::too_many_arguments)]
    fn reflection(
        &self,
        point: DVec3,
        mirror: DVec3,
        normal: DVec3,
        material: &Material,
        depth: u32,
        weight: f64,
        rng: &mut dyn RngCore,
    ) -> Color {
        let Ok(mirror) = Direction::new(mirror) else {
            return Color::ZERO;
        };

        if material.glossiness > 0.0 && self.sampler.is_enabled(Effect::Glossy) {
            // Sample directions leaving through the surface are dropped
            let directions: Vec<Direction> = self
                .sampler
                .disk(point + mirror.get(), mirror, material.glossiness, rng)
                .into_iter()
                .filter_map(|target| Direction::between(point, target).ok())
                .filter(|d| d.dot(normal) > 0.0)
                .collect();
            if !directions.is_empty() {
                let sample_weight = weight / directions.len() as f64;
                let total: Color = directions
                    .iter()
                    .map(|&d| self.trace(&Ray::offset(point, d, normal), depth + 1, sample_weight, rng))
                    .sum();
                return total / directions.len() as f64;
            }
        }

        self.trace(&Ray::offset(point, mirror, normal), depth + 1, weight, rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampler::SamplerConfig;
    use crate::tracer::{BruteForceTracer, ShadingConfig};
    use crate::{Plane, Primitive, Scene, Sphere};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::sync::Arc;

    fn lit_scene(material: Material) -> Scene {
        let mut scene = Scene::new().with_background(Color::new(0.0, 0.0, 0.2));
        scene.add(Primitive::new(
            Sphere::new(DVec3::new(0.0, 0.0, -3.0), 1.0).unwrap(),
            material,
        ));
        scene.add_light(Light::point(DVec3::new(0.0, 0.0, 5.0), Color::ONE));
        scene
    }

    fn central_ray() -> Ray {
        Ray::new(DVec3::ZERO, Direction::NEG_Z)
    }

    #[test]
    fn test_lambert_facing_light() {
        let material = Material::new(Color::ONE).with_diffuse(0.5);
        let tracer = BruteForceTracer::new(Arc::new(lit_scene(material)), ShadingConfig::default());
        let color = tracer.trace_ray(&central_ray());
        // The light sits straight behind the camera: n . l == 1
        assert!((color - Color::splat(0.5)).length() < 1e-9);
    }

    #[test]
    fn test_ambient_and_emission() {
        let material = Material::new(Color::new(1.0, 0.5, 0.0))
            .with_diffuse(0.0)
            .with_emission(Color::new(0.0, 0.0, 0.25));
        let scene = lit_scene(material).with_ambient(Color::splat(0.2));
        let tracer = BruteForceTracer::new(Arc::new(scene), ShadingConfig::default());
        let color = tracer.trace_ray(&central_ray());
        assert!((color - Color::new(0.2, 0.1, 0.25)).length() < 1e-9);
    }

    #[test]
    fn test_occluder_casts_shadow() {
        let mut scene = lit_scene(Material::new(Color::ONE));
        // Opaque blocker between the sphere and the light, off the camera ray
        scene.add(Primitive::new(
            Plane::new(DVec3::new(3.0, 0.0, 1.0), DVec3::Z).unwrap(),
            Material::default(),
        ));
        let tracer = BruteForceTracer::new(Arc::new(scene), ShadingConfig::default());

        // Start past the blocker so the primary ray reaches the sphere
        let ray = Ray::new(DVec3::new(0.0, 0.0, 0.5), Direction::NEG_Z);
        assert_eq!(tracer.trace_ray(&ray), Color::ZERO);
    }

    #[test]
    fn test_mirror_reflects_background() {
        let mirror = Material::new(Color::ZERO)
            .with_diffuse(0.0)
            .with_reflection(1.0, 0.0);
        let mut scene = Scene::new().with_background(Color::new(0.3, 0.6, 0.9));
        scene.add(Primitive::new(
            Plane::new(DVec3::new(0.0, 0.0, -5.0), DVec3::Z).unwrap(),
            mirror,
        ));
        let tracer = BruteForceTracer::new(Arc::new(scene), ShadingConfig::default());
        let ray = Ray::new(DVec3::new(0.0, 0.2, 0.0), Direction::NEG_Z);
        assert!((tracer.trace_ray(&ray) - Color::new(0.3, 0.6, 0.9)).length() < 1e-9);
    }

    #[test]
    fn test_depth_limit_stops_recursion() {
        let mirror = Material::new(Color::ZERO)
            .with_diffuse(0.0)
            .with_reflection(1.0, 0.0);
        let mut scene = Scene::new().with_background(Color::ONE);
        scene.add(Primitive::new(
            Plane::new(DVec3::new(0.0, 0.0, -5.0), DVec3::Z).unwrap(),
            mirror,
        ));
        let config = ShadingConfig::default().with_max_depth(0);
        let tracer = BruteForceTracer::new(Arc::new(scene), config);
        let ray = Ray::new(DVec3::new(0.0, 0.2, 0.0), Direction::NEG_Z);
        assert_eq!(tracer.trace_ray(&ray), Color::ZERO);
    }

    #[test]
    fn test_clear_glass_shows_background() {
        let glass = Material::new(Color::ONE)
            .with_diffuse(0.0)
            .with_transparency(1.0, 1.0);
        let mut scene = Scene::new().with_background(Color::new(0.1, 0.8, 0.1));
        scene.add(Primitive::new(
            Sphere::new(DVec3::new(0.0, 0.0, -3.0), 1.0).unwrap(),
            glass,
        ));
        let tracer = BruteForceTracer::new(Arc::new(scene), ShadingConfig::default());
        let color = tracer.trace_ray(&central_ray());
        assert!((color - Color::new(0.1, 0.8, 0.1)).length() < 1e-6);
    }

    #[test]
    fn test_soft_shadow_is_partial() {
        // A small blocker hides only part of a large disk light
        let mut scene = Scene::new();
        scene.add(Primitive::new(
            Plane::new(DVec3::ZERO, DVec3::Y).unwrap(),
            Material::new(Color::ONE),
        ));
        scene.add(Primitive::new(
            Sphere::new(DVec3::new(0.0, 2.0, 0.0), 0.5).unwrap(),
            Material::default(),
        ));
        scene.add_light(Light::disk(DVec3::new(0.0, 4.0, 0.0), Color::ONE, 2.0).unwrap());
        let tracer = BruteForceTracer::new(Arc::new(scene), ShadingConfig::default());

        let sampler = Sampler::new(
            SamplerConfig::default()
                .with_grid_size(8)
                .with_ray_count(64)
                .with_effect(Effect::SoftShadows, true),
        )
        .unwrap();
        let ray = Ray::new(DVec3::new(0.5, 1.0, 3.0), Direction::new(DVec3::new(0.0, -1.0, -3.0)).unwrap());
        let mut rng = StdRng::seed_from_u64(5);

        let soft = tracer.trace(&ray, &sampler, &mut rng);
        let hard = tracer.trace_ray(&ray);
        assert_eq!(hard, Color::ZERO);
        assert!(soft.x > 0.0 && soft.x < 0.8);
    }
}
