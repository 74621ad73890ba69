//! Directional light: a sun-like light aimed from its node toward a target.

use glam::Vec3;

use crate::color::Color;

/// An infinitely distant light. Its direction comes from the world position
/// of the node carrying it and the `target` point.
#[derive(Clone, Debug, PartialEq)]
pub struct DirectionalLight {
    /// Linear RGB color, not premultiplied by intensity.
    pub color: Color,
    pub intensity: f32,
    /// World-space point the light shines toward.
    pub target: Vec3,
}

impl Default for DirectionalLight {
    fn default() -> Self {
        Self {
            color: Color::WHITE,
            intensity: 1.0,
            target: Vec3::ZERO,
        }
    }
}

impl DirectionalLight {
    pub fn new(color: Color, intensity: f32) -> Self {
        Self {
            color,
            intensity,
            ..Self::default()
        }
    }

    /// Unit vector from surfaces toward the light, for a light node placed
    /// at `world_position`. `None` when the light sits on its target.
    pub fn to_light(&self, world_position: Vec3) -> Option<Vec3> {
        (world_position - self.target).try_normalize()
    }

    /// Color premultiplied by intensity.
    pub fn radiance(&self) -> Vec3 {
        Vec3::from(self.color.to_array()) * self.intensity
    }
}
