//! Scene aggregate handed to the tracers.
//!
//! A scene is built once, then shared read-only by every render thread.

use crate::{Color, Composite, Light, Primitive};

/// Primitives, lights and the global lighting terms.
#[derive(Debug, Default)]
pub struct Scene {
    geometry: Composite,
    lights: Vec<Light>,
    ambient: Color,
    background: Color,
}

impl Scene {
    /// Create an empty scene with a black background and no ambient light.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_background(mut self, background: Color) -> Self {
        self.background = background;
        self
    }

    pub fn with_ambient(mut self, ambient: Color) -> Self {
        self.ambient = ambient;
        self
    }

    /// Add a primitive.
    pub fn add(&mut self, primitive: Primitive) {
        self.geometry.add(primitive);
    }

    pub fn add_light(&mut self, light: Light) {
        self.lights.push(light);
    }

    /// Compute every primitive's bounding box up front, so no render thread
    /// ever races to fill the cache.
    pub fn precompute_bounds(&self) {
        for primitive in self.geometry.primitives() {
            primitive.bounding_box();
        }
    }

    pub fn geometry(&self) -> &Composite {
        &self.geometry
    }

    pub fn primitives(&self) -> &[Primitive] {
        self.geometry.primitives()
    }

    pub fn lights(&self) -> &[Light] {
        &self.lights
    }

    pub fn ambient(&self) -> Color {
        self.ambient
    }

    pub fn background(&self) -> Color {
        self.background
    }

    pub fn is_empty(&self) -> bool {
        self.geometry.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Material, Plane, Sphere};
    use lumen_math::DVec3;

    #[test]
    fn test_scene_building() {
        let mut scene = Scene::new()
            .with_background(Color::new(0.1, 0.2, 0.3))
            .with_ambient(Color::splat(0.05));
        assert!(scene.is_empty());

        scene.add(Primitive::new(Sphere::new(DVec3::ZERO, 1.0).unwrap(), Material::default()));
        scene.add(Primitive::new(Plane::new(DVec3::ZERO, DVec3::Y).unwrap(), Material::default()));
        scene.add_light(Light::point(DVec3::new(0.0, 5.0, 0.0), Color::ONE));
        scene.precompute_bounds();

        assert_eq!(scene.primitives().len(), 2);
        assert_eq!(scene.lights().len(), 1);
        assert_eq!(scene.background(), Color::new(0.1, 0.2, 0.3));
        assert_eq!(scene.ambient(), Color::splat(0.05));
        assert_eq!(scene.primitives().iter().filter(|p| p.is_bounded()).count(), 1);
    }
}
