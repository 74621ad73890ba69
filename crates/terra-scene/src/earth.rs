//! Assembly of the Earth, Moon, sun and starfield scene.

use glam::Vec3;
use terra_config::SceneConfig;

use crate::color::Color;
use crate::geometry::icosahedron;
use crate::graph::{Mesh, NodeId, NodeKind, SceneError, SceneGraph, Transform};
use crate::light::DirectionalLight;
use crate::material::{
    BasicBlending, BasicMaterial, Blending, FresnelMaterial, Material, PhongMaterial,
    StandardMaterial,
};
use crate::starfield::StarfieldGenerator;

/// Handles to the nodes the animator and renderer address directly.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SceneHandles {
    pub earth_group: NodeId,
    pub earth: NodeId,
    pub moon: NodeId,
    pub lights: NodeId,
    pub clouds: NodeId,
    pub glow: NodeId,
    pub stars: NodeId,
    pub sun: NodeId,
}

/// The scene graph together with handles to its animated nodes.
#[derive(Clone, Debug)]
pub struct EarthScene {
    pub graph: SceneGraph,
    handles: SceneHandles,
}

impl EarthScene {
    /// Build the scene described by `config`. Texture names are resolved
    /// against `config.textures_dir`.
    pub fn build(config: &SceneConfig) -> Result<Self, SceneError> {
        let mut graph = SceneGraph::new();
        let root = graph.root();
        let texture = |name: &str| config.texture_path(name);
        let tilt = Vec3::new(0.0, 0.0, -config.axial_tilt_degrees.to_radians());

        let earth_group = graph.add(root, "earth_group", NodeKind::Group, Transform::default())?;
        let sphere = graph.add_geometry(icosahedron(1.0, config.sphere_detail));

        let tilted = |scale: f32| Transform {
            rotation: tilt,
            scale: Vec3::splat(scale),
            ..Transform::default()
        };

        let mut earth_material = PhongMaterial::new(texture(&config.earth_map));
        earth_material.specular_map = Some(texture(&config.earth_specular_map));
        earth_material.bump_map = Some(texture(&config.earth_bump_map));
        earth_material.bump_scale = config.earth_bump_scale;
        let earth = graph.add(
            earth_group,
            "earth",
            NodeKind::Mesh(Mesh {
                geometry: sphere,
                material: Material::Phong(earth_material),
            }),
            tilted(1.0),
        )?;

        let moon_cfg = &config.moon;
        let mut moon_material = PhongMaterial::new(texture(&moon_cfg.map));
        moon_material.bump_map = Some(texture(&moon_cfg.bump_map));
        moon_material.bump_scale = moon_cfg.bump_scale;
        let moon = graph.add(
            earth_group,
            "moon",
            NodeKind::Mesh(Mesh {
                geometry: sphere,
                material: Material::Phong(moon_material),
            }),
            Transform {
                position: Vec3::from(moon_cfg.start_position),
                scale: Vec3::splat(moon_cfg.scale),
                ..Transform::default()
            },
        )?;

        let lights = graph.add(
            earth_group,
            "lights",
            NodeKind::Mesh(Mesh {
                geometry: sphere,
                material: Material::Basic(BasicMaterial {
                    map: texture(&config.lights_map),
                    blending: BasicBlending::Additive,
                }),
            }),
            tilted(1.0),
        )?;

        let clouds_cfg = &config.clouds;
        let clouds = graph.add(
            earth_group,
            "clouds",
            NodeKind::Mesh(Mesh {
                geometry: sphere,
                material: Material::Standard(StandardMaterial {
                    map: texture(&clouds_cfg.map),
                    alpha_map: Some(texture(&clouds_cfg.alpha_map)),
                    opacity: clouds_cfg.opacity,
                    transparent: true,
                    blending: Blending::Additive,
                }),
            }),
            tilted(clouds_cfg.scale),
        )?;

        let fresnel = &config.glow.fresnel;
        let glow = graph.add(
            earth_group,
            "glow",
            NodeKind::Mesh(Mesh {
                geometry: sphere,
                material: Material::Fresnel(FresnelMaterial {
                    rim: Color::from_hex(fresnel.rim_hex),
                    facing: Color::from_hex(fresnel.facing_hex),
                    bias: fresnel.bias,
                    scale: fresnel.scale,
                    power: fresnel.power,
                }),
            }),
            tilted(config.glow.scale),
        )?;

        let starfield =
            StarfieldGenerator::new(config.star_seed, config.star_count).generate(config.star_size);
        let stars = graph.add(root, "stars", NodeKind::Points(starfield), Transform::default())?;

        // The sun starts out attached to the moon and is then moved to the
        // root, so it ends up fixed in world space.
        let sun = graph.add(
            moon,
            "sun",
            NodeKind::DirectionalLight(DirectionalLight::new(
                Color::from_hex(config.sun.color_hex),
                config.sun.intensity,
            )),
            Transform {
                position: Vec3::from(config.sun.position),
                ..Transform::default()
            },
        )?;
        graph.attach(root, sun)?;

        log::info!(
            "Scene assembled: {} nodes, {} sphere triangles, {} stars",
            graph.node_count(),
            graph.geometry(sphere)?.triangle_count(),
            config.star_count
        );

        Ok(Self {
            graph,
            handles: SceneHandles {
                earth_group,
                earth,
                moon,
                lights,
                clouds,
                glow,
                stars,
                sun,
            },
        })
    }

    pub fn handles(&self) -> SceneHandles {
        self.handles
    }

    /// The sun light with its unit direction toward the light.
    pub fn sun(&self) -> Result<(&DirectionalLight, Vec3), SceneError> {
        let id = self.handles.sun;
        let NodeKind::DirectionalLight(light) = &self.graph.node(id)?.kind else {
            return Err(SceneError::WrongKind(id));
        };
        let position = self.graph.world_position(id)?;
        let to_light = light.to_light(position).unwrap_or(Vec3::Z);
        Ok((light, to_light))
    }
}
