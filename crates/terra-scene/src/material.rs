//! Surface materials for the globe layers.
//!
//! Each variant describes what a layer looks like; the renderer picks the
//! matching pipeline and blend state. Texture references are file paths that
//! the renderer resolves and decodes.

use std::path::{Path, PathBuf};

use crate::color::Color;

/// How a fragment combines with what is already in the color target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Blending {
    /// Source-over alpha blending (opaque when alpha is 1).
    Normal,
    /// `src * src_alpha + dst`.
    Additive,
}

/// Draw phase. Translucent layers are drawn after every opaque one and do
/// not write depth.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RenderPhase {
    Opaque,
    Translucent,
}

/// Lit material with diffuse map, optional specular mask and bump map.
#[derive(Clone, Debug, PartialEq)]
pub struct PhongMaterial {
    pub map: PathBuf,
    /// Red channel scales the specular highlight.
    pub specular_map: Option<PathBuf>,
    /// Grayscale height field.
    pub bump_map: Option<PathBuf>,
    pub bump_scale: f32,
    pub specular: Color,
    pub shininess: f32,
}

impl PhongMaterial {
    /// A material with the default highlight (0x111111, shininess 30).
    pub fn new(map: impl Into<PathBuf>) -> Self {
        Self {
            map: map.into(),
            specular_map: None,
            bump_map: None,
            bump_scale: 1.0,
            specular: Color::from_hex(0x111111),
            shininess: 30.0,
        }
    }
}

/// Unlit textured material.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BasicMaterial {
    pub map: PathBuf,
    pub blending: BasicBlending,
}

/// Blend mode wrapper so [`BasicMaterial`] can derive `Default`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BasicBlending {
    #[default]
    Normal,
    Additive,
}

impl From<BasicBlending> for Blending {
    fn from(b: BasicBlending) -> Self {
        match b {
            BasicBlending::Normal => Blending::Normal,
            BasicBlending::Additive => Blending::Additive,
        }
    }
}

/// Diffuse-lit material with an alpha mask, used for the cloud shell.
#[derive(Clone, Debug, PartialEq)]
pub struct StandardMaterial {
    pub map: PathBuf,
    /// Green channel multiplies the output alpha.
    pub alpha_map: Option<PathBuf>,
    pub opacity: f32,
    pub transparent: bool,
    pub blending: Blending,
}

/// View-dependent rim glow.
#[derive(Clone, Debug, PartialEq)]
pub struct FresnelMaterial {
    pub rim: Color,
    pub facing: Color,
    pub bias: f32,
    pub scale: f32,
    pub power: f32,
}

impl FresnelMaterial {
    /// Reflection factor for a view ray `incident` (camera to surface) hitting
    /// a surface with unit normal `normal`, clamped to `[0, 1]`.
    pub fn factor(&self, incident: glam::Vec3, normal: glam::Vec3) -> f32 {
        let cos = 1.0 + incident.normalize_or_zero().dot(normal);
        (self.bias + self.scale * cos.max(0.0).powf(self.power)).clamp(0.0, 1.0)
    }
}

/// A layer's material.
#[derive(Clone, Debug, PartialEq)]
pub enum Material {
    Phong(PhongMaterial),
    Basic(BasicMaterial),
    Standard(StandardMaterial),
    Fresnel(FresnelMaterial),
}

impl Material {
    pub fn blending(&self) -> Blending {
        match self {
            Material::Phong(_) => Blending::Normal,
            Material::Basic(m) => m.blending.into(),
            Material::Standard(m) => m.blending,
            Material::Fresnel(_) => Blending::Additive,
        }
    }

    pub fn phase(&self) -> RenderPhase {
        match self {
            Material::Phong(_) | Material::Basic(_) => RenderPhase::Opaque,
            Material::Standard(m) if !m.transparent => RenderPhase::Opaque,
            Material::Standard(_) | Material::Fresnel(_) => RenderPhase::Translucent,
        }
    }

    /// Whether the material goes through tone mapping. The fresnel glow
    /// writes its color as-is.
    pub fn tone_mapped(&self) -> bool {
        !matches!(self, Material::Fresnel(_))
    }

    /// Every texture file the material samples, in binding order.
    pub fn texture_paths(&self) -> Vec<&Path> {
        match self {
            Material::Phong(m) => {
                let mut paths = vec![m.map.as_path()];
                paths.extend(m.specular_map.as_deref());
                paths.extend(m.bump_map.as_deref());
                paths
            }
            Material::Basic(m) => vec![m.map.as_path()],
            Material::Standard(m) => {
                let mut paths = vec![m.map.as_path()];
                paths.extend(m.alpha_map.as_deref());
                paths
            }
            Material::Fresnel(_) => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn glow() -> FresnelMaterial {
        FresnelMaterial {
            rim: Color::from_hex(0x0088ff),
            facing: Color::BLACK,
            bias: 0.1,
            scale: 1.0,
            power: 4.0,
        }
    }

    #[test]
    fn test_phong_defaults() {
        let m = PhongMaterial::new("earth.jpg");
        assert_eq!(m.shininess, 30.0);
        assert!(m.specular.r > 0.0 && m.specular.r < 0.01);
    }

    #[test]
    fn test_phases() {
        let clouds = Material::Standard(StandardMaterial {
            map: "c.jpg".into(),
            alpha_map: None,
            opacity: 0.8,
            transparent: true,
            blending: Blending::Additive,
        });
        assert_eq!(clouds.phase(), RenderPhase::Translucent);
        assert_eq!(Material::Fresnel(glow()).phase(), RenderPhase::Translucent);
        assert_eq!(
            Material::Phong(PhongMaterial::new("e.jpg")).phase(),
            RenderPhase::Opaque
        );
        assert!(RenderPhase::Opaque < RenderPhase::Translucent);
    }

    #[test]
    fn test_texture_paths_in_binding_order() {
        let mut m = PhongMaterial::new("map.jpg");
        m.bump_map = Some("bump.jpg".into());
        m.specular_map = Some("spec.jpg".into());
        let material = Material::Phong(m);
        let paths: Vec<_> = material.texture_paths().iter().map(|p| p.to_path_buf()).collect();
        assert_eq!(
            paths,
            vec![PathBuf::from("map.jpg"), "spec.jpg".into(), "bump.jpg".into()]
        );
        assert!(Material::Fresnel(glow()).texture_paths().is_empty());
    }

    #[test]
    fn test_fresnel_is_weak_facing_and_strong_at_rim() {
        let m = glow();
        let normal = Vec3::Z;
        // Looking straight at the surface.
        let facing = m.factor(Vec3::NEG_Z, normal);
        assert!((facing - 0.1).abs() < 1e-6);
        // Grazing view.
        let grazing = m.factor(Vec3::NEG_X, normal);
        assert!((grazing - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_only_fresnel_skips_tone_mapping() {
        assert!(!Material::Fresnel(glow()).tone_mapped());
        assert!(Material::Basic(BasicMaterial::default()).tone_mapped());
    }
}
