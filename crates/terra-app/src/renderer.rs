//! Uploads the scene graph to the GPU and draws it.
//!
//! Geometry, textures, bind groups and pipelines are created once from the
//! assembled scene. Each frame only the per-object and per-frame uniforms
//! are rewritten from the current world matrices, then everything is drawn
//! in a single pass: stars, opaque meshes, then translucent meshes.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use terra_config::{RenderConfig, ToneMapping};
use terra_render::{
    BlendMode, BufferAllocator, Camera, DepthBuffer, FrameBindings, FrameEncoder, LightUniform,
    ManagedTexture, MaterialPipelines, MaterialTextures, MeshBuffer, MsaaTarget, ObjectUniform,
    PipelineKey, RenderContext, RenderPassBuilder, ShadingModel, StarInstance, StarPipeline,
    StarUniform, StarfieldBuffers, SurfaceError, TextureData, TextureError, TextureManager,
    VertexPositionNormalUv, clear_color,
};
use terra_scene::{
    Blending, EarthScene, GeometryId, Material, Mesh, NodeId, NodeKind, RenderPhase, SceneError,
    SphereGeometry, Starfield,
};
use thiserror::Error;
use tracing::{info, warn};

use crate::assets::load_rgba_or_fallback;

#[derive(Debug, Error)]
pub enum RendererError {
    #[error(transparent)]
    Scene(#[from] SceneError),

    #[error(transparent)]
    Texture(#[from] TextureError),
}

/// Pipeline selection for a material.
pub fn pipeline_key(material: &Material) -> PipelineKey {
    let shading = match material {
        Material::Phong(_) => ShadingModel::Phong,
        Material::Basic(_) => ShadingModel::Basic,
        Material::Standard(_) => ShadingModel::Standard,
        Material::Fresnel(_) => ShadingModel::Fresnel,
    };
    let phase = material.phase();
    let blend = match (material.blending(), phase) {
        (Blending::Additive, _) => BlendMode::Additive,
        (Blending::Normal, RenderPhase::Opaque) => BlendMode::Opaque,
        (Blending::Normal, RenderPhase::Translucent) => BlendMode::Alpha,
    };
    PipelineKey {
        shading,
        blend,
        depth_write: phase == RenderPhase::Opaque,
    }
}

/// Object uniform for `material` drawn with `world` as its model matrix.
pub fn object_uniform(material: &Material, world: glam::Mat4, tone_mapping: bool) -> ObjectUniform {
    let tone_mapped = tone_mapping && material.tone_mapped();
    match material {
        Material::Phong(m) => {
            let bump_scale = if m.bump_map.is_some() {
                m.bump_scale
            } else {
                0.0
            };
            ObjectUniform::phong(
                world,
                m.specular.to_array(),
                m.shininess,
                bump_scale,
                tone_mapped,
            )
        }
        Material::Basic(_) => ObjectUniform::basic(world, tone_mapped),
        Material::Standard(m) => ObjectUniform::standard(world, m.opacity, tone_mapped),
        Material::Fresnel(m) => ObjectUniform::fresnel(
            world,
            m.rim.to_array(),
            m.facing.to_array(),
            m.bias,
            m.scale,
            m.power,
        ),
    }
}

fn sphere_vertices(geometry: &SphereGeometry) -> Vec<VertexPositionNormalUv> {
    geometry
        .positions
        .iter()
        .zip(&geometry.normals)
        .zip(&geometry.uvs)
        .map(|((position, normal), uv)| VertexPositionNormalUv {
            position: position.to_array(),
            normal: normal.to_array(),
            uv: uv.to_array(),
        })
        .collect()
}

fn star_instances(starfield: &Starfield) -> Vec<StarInstance> {
    starfield
        .stars
        .iter()
        .map(|star| StarInstance {
            position: star.position.to_array(),
            color: star.color.to_array(),
        })
        .collect()
}

struct MeshDraw {
    node: NodeId,
    geometry: GeometryId,
    key: PipelineKey,
    phase: RenderPhase,
    uniform: ObjectUniform,
    uniform_buffer: wgpu::Buffer,
    object_bind_group: wgpu::BindGroup,
    texture_bind_group: wgpu::BindGroup,
}

struct StarDraw {
    node: NodeId,
    size: f32,
    buffers: StarfieldBuffers,
}

/// GPU-side mirror of an [`EarthScene`].
pub struct SceneRenderer {
    frame: FrameBindings,
    materials: MaterialPipelines,
    star_pipeline: StarPipeline,
    textures: TextureManager,
    fallback: Arc<ManagedTexture>,
    geometries: HashMap<GeometryId, MeshBuffer>,
    meshes: Vec<MeshDraw>,
    starfields: Vec<StarDraw>,
    depth: DepthBuffer,
    msaa: Option<MsaaTarget>,
    clear_color: wgpu::Color,
    tone_mapping: bool,
    exposure: f32,
}

impl SceneRenderer {
    /// Upload `scene` for a `width x height` surface.
    pub fn new(
        gpu: &RenderContext,
        scene: &EarthScene,
        config: &RenderConfig,
        width: u32,
        height: u32,
    ) -> Result<Self, RendererError> {
        let device = &gpu.device;
        let sample_count = gpu.supported_sample_count(config.msaa_samples, DepthBuffer::FORMAT);

        let frame = FrameBindings::new(device);
        let materials =
            MaterialPipelines::new(device, &frame.layout, gpu.surface_format, sample_count);
        let star_pipeline =
            StarPipeline::new(device, &frame.layout, gpu.surface_format, sample_count);
        let mut textures = TextureManager::new(device);
        let fallback =
            textures.create_texture(device, &gpu.queue, "fallback-white", &TextureData::white())?;

        let (width, height) = (width.max(1), height.max(1));
        let mut renderer = Self {
            frame,
            materials,
            star_pipeline,
            textures,
            fallback,
            geometries: HashMap::new(),
            meshes: Vec::new(),
            starfields: Vec::new(),
            depth: DepthBuffer::new(device, width, height, sample_count),
            msaa: MsaaTarget::new(device, gpu.surface_format, width, height, sample_count),
            clear_color: clear_color(config.clear_color),
            tone_mapping: config.tone_mapping != ToneMapping::None,
            exposure: config.exposure,
        };

        renderer.upload_scene(gpu, scene)?;
        info!(
            "Renderer ready: {} meshes, {} starfields, {} textures, {} pipelines, {}x MSAA",
            renderer.meshes.len(),
            renderer.starfields.len(),
            renderer.textures.len(),
            renderer.materials.len(),
            sample_count
        );
        Ok(renderer)
    }

    fn upload_scene(
        &mut self,
        gpu: &RenderContext,
        scene: &EarthScene,
    ) -> Result<(), RendererError> {
        let device = &gpu.device;
        let allocator = BufferAllocator::new(device);
        let graph = &scene.graph;

        for (id, geometry) in graph.geometries() {
            let vertices = sphere_vertices(geometry);
            let mesh = allocator.create_mesh("sphere", &vertices, &geometry.indices);
            self.geometries.insert(id, mesh);
        }

        for (node_id, node) in graph.iter() {
            let world = graph.world_matrix(node_id)?;
            match &node.kind {
                NodeKind::Mesh(mesh) => {
                    let draw =
                        self.upload_mesh(gpu, &allocator, node_id, &node.name, mesh, world)?;
                    self.meshes.push(draw);
                }
                NodeKind::Points(starfield) => {
                    let uniform = StarUniform::new(
                        world,
                        glam::Quat::IDENTITY,
                        starfield.size,
                        self.tone_mapping,
                    );
                    let buffers = self.star_pipeline.create_starfield(
                        device,
                        &star_instances(starfield),
                        &uniform,
                    );
                    self.starfields.push(StarDraw {
                        node: node_id,
                        size: starfield.size,
                        buffers,
                    });
                }
                NodeKind::Group | NodeKind::DirectionalLight(_) => {}
            }
        }

        // Stable: keeps scene order within each phase.
        self.meshes.sort_by_key(|draw| draw.phase);
        Ok(())
    }

    fn upload_mesh(
        &mut self,
        gpu: &RenderContext,
        allocator: &BufferAllocator<'_>,
        node: NodeId,
        name: &str,
        mesh: &Mesh,
        world: glam::Mat4,
    ) -> Result<MeshDraw, RendererError> {
        let device = &gpu.device;
        let material = &mesh.material;
        let key = pipeline_key(material);
        self.materials.prepare(device, key);

        let uniform = object_uniform(material, world, self.tone_mapping);
        let uniform_buffer = allocator.create_uniform_buffer(&format!("{name}-object"), &uniform);
        let object_bind_group =
            self.materials
                .create_object_bind_group(device, &format!("{name}-object"), &uniform_buffer);

        let (map, aux0, aux1) = match material {
            Material::Phong(m) => (
                Some(m.map.as_path()),
                m.specular_map.as_deref(),
                m.bump_map.as_deref(),
            ),
            Material::Basic(m) => (Some(m.map.as_path()), None, None),
            Material::Standard(m) => (Some(m.map.as_path()), m.alpha_map.as_deref(), None),
            Material::Fresnel(_) => (None, None, None),
        };
        let map = self.texture(gpu, map)?;
        let aux0 = self.texture(gpu, aux0)?;
        let aux1 = self.texture(gpu, aux1)?;
        let texture_bind_group = self.materials.create_texture_bind_group(
            device,
            &format!("{name}-textures"),
            &MaterialTextures {
                map: &map.view,
                aux0: &aux0.view,
                aux1: &aux1.view,
            },
            self.textures.sampler(),
        );

        Ok(MeshDraw {
            node,
            geometry: mesh.geometry,
            key,
            phase: material.phase(),
            uniform,
            uniform_buffer,
            object_bind_group,
            texture_bind_group,
        })
    }

    /// Texture for `path`, decoding it on first use. `None` selects the
    /// white fallback.
    fn texture(
        &mut self,
        gpu: &RenderContext,
        path: Option<&Path>,
    ) -> Result<Arc<ManagedTexture>, TextureError> {
        let Some(path) = path else {
            return Ok(Arc::clone(&self.fallback));
        };
        let name = path.to_string_lossy();
        if let Some(texture) = self.textures.get(&name) {
            return Ok(texture);
        }
        let data = load_rgba_or_fallback(path);
        self.textures
            .create_texture(&gpu.device, &gpu.queue, &name, &data)
    }

    /// Write this frame's uniforms from the scene's current transforms.
    pub fn update(
        &mut self,
        queue: &wgpu::Queue,
        scene: &EarthScene,
        camera: &Camera,
    ) -> Result<(), SceneError> {
        let graph = &scene.graph;
        for draw in &mut self.meshes {
            draw.uniform.set_model(graph.world_matrix(draw.node)?);
            queue.write_buffer(&draw.uniform_buffer, 0, bytemuck::bytes_of(&draw.uniform));
        }
        for stars in &self.starfields {
            let uniform = StarUniform::new(
                graph.world_matrix(stars.node)?,
                camera.rotation,
                stars.size,
                self.tone_mapping,
            );
            stars.buffers.update(queue, &uniform);
        }

        let (sun, to_light) = scene.sun()?;
        let light = LightUniform::new(to_light, sun.color.to_array(), sun.intensity, self.exposure);
        self.frame.update(queue, camera, &light);
        Ok(())
    }

    /// Acquire the next surface texture, draw the scene into it and present.
    pub fn render(&self, gpu: &RenderContext) -> Result<(), SurfaceError> {
        let surface_texture = gpu.get_current_texture()?;
        let mut encoder = FrameEncoder::new(&gpu.device, surface_texture);

        let mut builder = RenderPassBuilder::new()
            .label("scene-pass")
            .clear_color(self.clear_color)
            .depth(self.depth.view.clone(), DepthBuffer::CLEAR_VALUE);
        if let Some(msaa) = &self.msaa {
            builder = builder.msaa(msaa.view.clone());
        }

        {
            let mut pass = encoder.begin_render_pass(&builder);
            for stars in &self.starfields {
                self.star_pipeline
                    .draw(&mut pass, &self.frame.bind_group, &stars.buffers);
            }

            for draw in &self.meshes {
                let (Some(pipeline), Some(mesh)) = (
                    self.materials.get(&draw.key),
                    self.geometries.get(&draw.geometry),
                ) else {
                    warn!("No GPU resources for mesh {:?}, skipping", draw.node);
                    continue;
                };
                pass.set_pipeline(pipeline);
                pass.set_bind_group(0, &self.frame.bind_group, &[]);
                pass.set_bind_group(1, &draw.object_bind_group, &[]);
                pass.set_bind_group(2, &draw.texture_bind_group, &[]);
                mesh.bind(&mut pass);
                mesh.draw(&mut pass);
            }
        }

        encoder.submit(&gpu.queue);
        Ok(())
    }

    /// Recreate the depth and MSAA targets for a new surface size.
    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        self.depth.resize(device, width, height);
        if let Some(msaa) = &mut self.msaa {
            msaa.resize(device, width, height);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use terra_config::SceneConfig;
    use terra_scene::{BasicMaterial, PhongMaterial, StandardMaterial};

    fn scene() -> EarthScene {
        EarthScene::build(&SceneConfig {
            sphere_detail: 1,
            star_count: 8,
            ..SceneConfig::default()
        })
        .unwrap()
    }

    fn material(scene: &EarthScene, node: NodeId) -> Material {
        match &scene.graph.node(node).unwrap().kind {
            NodeKind::Mesh(mesh) => mesh.material.clone(),
            other => panic!("expected a mesh, got {other:?}"),
        }
    }

    #[test]
    fn test_earth_layers_pipeline_keys() {
        let scene = scene();
        let h = scene.handles();

        let earth = pipeline_key(&material(&scene, h.earth));
        assert_eq!(earth.shading, ShadingModel::Phong);
        assert_eq!(earth.blend, BlendMode::Opaque);
        assert!(earth.depth_write);

        let lights = pipeline_key(&material(&scene, h.lights));
        assert_eq!(lights.blend, BlendMode::Additive);
        assert!(lights.depth_write);

        let clouds = pipeline_key(&material(&scene, h.clouds));
        assert_eq!(clouds.shading, ShadingModel::Standard);
        assert_eq!(clouds.blend, BlendMode::Additive);
        assert!(!clouds.depth_write);

        let glow = pipeline_key(&material(&scene, h.glow));
        assert_eq!(glow.shading, ShadingModel::Fresnel);
        assert!(!glow.depth_write);
    }

    #[test]
    fn test_normal_blending_maps_by_phase() {
        let opaque = Material::Basic(BasicMaterial::default());
        assert_eq!(pipeline_key(&opaque).blend, BlendMode::Opaque);

        let translucent = Material::Standard(StandardMaterial {
            map: "clouds.jpg".into(),
            alpha_map: None,
            opacity: 0.5,
            transparent: true,
            blending: Blending::Normal,
        });
        let key = pipeline_key(&translucent);
        assert_eq!(key.blend, BlendMode::Alpha);
        assert!(!key.depth_write);
    }

    #[test]
    fn test_missing_bump_map_disables_bump() {
        let mut phong = PhongMaterial::new("earth.jpg");
        phong.bump_scale = 0.04;
        let flat = object_uniform(&Material::Phong(phong.clone()), glam::Mat4::IDENTITY, true);
        assert_eq!(flat.params[1][0], 0.0);

        phong.bump_map = Some("bump.jpg".into());
        let bumped = object_uniform(&Material::Phong(phong), glam::Mat4::IDENTITY, true);
        assert_eq!(bumped.params[1][0], 0.04);
    }

    #[test]
    fn test_tone_mapping_switch() {
        let scene = scene();
        let h = scene.handles();
        let earth = material(&scene, h.earth);
        assert_eq!(object_uniform(&earth, glam::Mat4::IDENTITY, true).params[2][0], 1.0);
        assert_eq!(object_uniform(&earth, glam::Mat4::IDENTITY, false).params[2][0], 0.0);
        let glow = material(&scene, h.glow);
        assert_eq!(object_uniform(&glow, glam::Mat4::IDENTITY, true).params[2][0], 0.0);
    }

    #[test]
    fn test_vertices_follow_geometry() {
        let scene = scene();
        let (_, geometry) = scene.graph.geometries().next().unwrap();
        let vertices = sphere_vertices(geometry);
        assert_eq!(vertices.len(), geometry.positions.len());
        assert_eq!(vertices[0].uv, geometry.uvs[0].to_array());
    }

    #[test]
    fn test_star_instances_carry_color() {
        let scene = scene();
        let NodeKind::Points(starfield) = &scene.graph.node(scene.handles().stars).unwrap().kind
        else {
            panic!("stars are not points");
        };
        let instances = star_instances(starfield);
        assert_eq!(instances.len(), 8);
        assert_eq!(instances[3].color, starfield.stars[3].color.to_array());
    }
}
