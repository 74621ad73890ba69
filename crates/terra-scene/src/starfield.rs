//! Procedural starfield: deterministic star placement in a spherical shell
//! around the origin, drawn as small round sprites.

use glam::Vec3;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::color::Color;

/// A single star.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Star {
    pub position: Vec3,
    pub color: Color,
}

/// A point cloud of stars plus the sprite size they are drawn with.
#[derive(Clone, Debug, PartialEq)]
pub struct Starfield {
    pub stars: Vec<Star>,
    /// Sprite edge length in world units.
    pub size: f32,
}

impl Starfield {
    pub fn len(&self) -> usize {
        self.stars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stars.is_empty()
    }
}

/// Generates a deterministic starfield from a seed.
pub struct StarfieldGenerator {
    seed: u64,
    star_count: u32,
    min_radius: f32,
    shell_thickness: f32,
    hue: f32,
    saturation: f32,
}

impl StarfieldGenerator {
    /// Stars between radius 25 and 50, pale blue (hue 0.6, saturation 0.2).
    pub fn new(seed: u64, star_count: u32) -> Self {
        Self {
            seed,
            star_count,
            min_radius: 25.0,
            shell_thickness: 25.0,
            hue: 0.6,
            saturation: 0.2,
        }
    }

    /// Override the shell the stars are placed in.
    pub fn with_shell(mut self, min_radius: f32, thickness: f32) -> Self {
        self.min_radius = min_radius;
        self.shell_thickness = thickness;
        self
    }

    /// Generate the starfield. Same seed, same stars.
    pub fn generate(&self, size: f32) -> Starfield {
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let mut stars = Vec::with_capacity(self.star_count as usize);

        for _ in 0..self.star_count {
            let radius = rng.random::<f32>() * self.shell_thickness + self.min_radius;
            let theta = rng.random::<f32>() * std::f32::consts::TAU;
            let phi = (2.0 * rng.random::<f32>() - 1.0).acos();

            let position = Vec3::new(
                radius * phi.sin() * theta.cos(),
                radius * phi.sin() * theta.sin(),
                radius * phi.cos(),
            );

            // Lightness is the only per-star color variation.
            let color = Color::from_hsl(self.hue, self.saturation, rng.random::<f32>());

            stars.push(Star { position, color });
        }

        log::debug!(
            "Generated {} stars (seed {:#x})",
            stars.len(),
            self.seed
        );

        Starfield { stars, size }
    }
}
