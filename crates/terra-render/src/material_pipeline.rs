//! Pipelines for the globe's surface materials.
//!
//! Four shading models share one pipeline layout:
//!
//! - group 0: [`FrameBindings`](crate::pipeline::FrameBindings) (camera, light)
//! - group 1: the object's [`ObjectUniform`]
//! - group 2: up to three textures and the repeat sampler
//!
//! A concrete pipeline is identified by a [`PipelineKey`]: shading model,
//! blend mode and whether it writes depth. Pipelines are built up front with
//! [`MaterialPipelines::prepare`] and looked up while drawing.

use bytemuck::{Pod, Zeroable};
use glam::Mat4;
use std::collections::HashMap;
use std::num::NonZeroU64;
use std::sync::Arc;

use crate::buffer::VertexPositionNormalUv;
use crate::depth::DepthBuffer;
use crate::pipeline::FRAME_BINDINGS_WGSL;
use crate::shader::ShaderLibrary;

/// Lighting model evaluated in the fragment shader.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShadingModel {
    /// Blinn-Phong with specular mask and bump map.
    Phong,
    /// Unlit texture.
    Basic,
    /// Lambert diffuse with an alpha mask.
    Standard,
    /// View-dependent rim color, untextured.
    Fresnel,
}

impl ShadingModel {
    pub const ALL: [ShadingModel; 4] = [
        ShadingModel::Phong,
        ShadingModel::Basic,
        ShadingModel::Standard,
        ShadingModel::Fresnel,
    ];

    fn name(self) -> &'static str {
        match self {
            ShadingModel::Phong => "material-phong",
            ShadingModel::Basic => "material-basic",
            ShadingModel::Standard => "material-standard",
            ShadingModel::Fresnel => "material-fresnel",
        }
    }

    fn fragment_source(self) -> &'static str {
        match self {
            ShadingModel::Phong => PHONG_FRAGMENT_WGSL,
            ShadingModel::Basic => BASIC_FRAGMENT_WGSL,
            ShadingModel::Standard => STANDARD_FRAGMENT_WGSL,
            ShadingModel::Fresnel => FRESNEL_FRAGMENT_WGSL,
        }
    }

    /// Complete WGSL module for this model.
    pub fn shader_source(self) -> String {
        [
            FRAME_BINDINGS_WGSL,
            MATERIAL_COMMON_WGSL,
            TONE_MAPPING_WGSL,
            self.fragment_source(),
        ]
        .concat()
    }
}

/// How fragments combine with the color target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BlendMode {
    /// Replace.
    Opaque,
    /// Source-over using source alpha.
    Alpha,
    /// `src * src_alpha + dst`, for color and alpha alike.
    Additive,
}

impl BlendMode {
    pub fn blend_state(self) -> Option<wgpu::BlendState> {
        match self {
            BlendMode::Opaque => None,
            BlendMode::Alpha => Some(wgpu::BlendState::ALPHA_BLENDING),
            BlendMode::Additive => {
                let additive = wgpu::BlendComponent {
                    src_factor: wgpu::BlendFactor::SrcAlpha,
                    dst_factor: wgpu::BlendFactor::One,
                    operation: wgpu::BlendOperation::Add,
                };
                Some(wgpu::BlendState {
                    color: additive,
                    alpha: additive,
                })
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PipelineKey {
    pub shading: ShadingModel,
    pub blend: BlendMode,
    pub depth_write: bool,
}

/// Per-object uniform (bind group 1).
///
/// `params` packs the material constants:
///
/// | model    | params\[0\]              | params\[1\]               | params\[2\]          |
/// |----------|--------------------------|---------------------------|----------------------|
/// | Phong    | specular rgb, shininess  | x: bump scale             | x: tone mapped       |
/// | Basic    |                          |                           | x: tone mapped       |
/// | Standard | x: opacity               |                           | x: tone mapped       |
/// | Fresnel  | rim rgb, bias            | facing rgb, scale         | y: power             |
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct ObjectUniform {
    pub model: [[f32; 4]; 4],
    pub normal_matrix: [[f32; 4]; 4],
    pub params: [[f32; 4]; 3],
}

impl ObjectUniform {
    fn with_params(model: Mat4, params: [[f32; 4]; 3]) -> Self {
        let normal_matrix = if model.determinant().abs() > f32::EPSILON {
            model.inverse().transpose()
        } else {
            Mat4::IDENTITY
        };
        Self {
            model: model.to_cols_array_2d(),
            normal_matrix: normal_matrix.to_cols_array_2d(),
            params,
        }
    }

    pub fn phong(
        model: Mat4,
        specular: [f32; 3],
        shininess: f32,
        bump_scale: f32,
        tone_mapped: bool,
    ) -> Self {
        let [r, g, b] = specular;
        Self::with_params(
            model,
            [
                [r, g, b, shininess],
                [bump_scale, 0.0, 0.0, 0.0],
                [flag(tone_mapped), 0.0, 0.0, 0.0],
            ],
        )
    }

    pub fn basic(model: Mat4, tone_mapped: bool) -> Self {
        Self::with_params(model, [[0.0; 4], [0.0; 4], [flag(tone_mapped), 0.0, 0.0, 0.0]])
    }

    pub fn standard(model: Mat4, opacity: f32, tone_mapped: bool) -> Self {
        Self::with_params(
            model,
            [
                [opacity, 0.0, 0.0, 0.0],
                [0.0; 4],
                [flag(tone_mapped), 0.0, 0.0, 0.0],
            ],
        )
    }

    pub fn fresnel(
        model: Mat4,
        rim: [f32; 3],
        facing: [f32; 3],
        bias: f32,
        scale: f32,
        power: f32,
    ) -> Self {
        Self::with_params(
            model,
            [
                [rim[0], rim[1], rim[2], bias],
                [facing[0], facing[1], facing[2], scale],
                [0.0, power, 0.0, 0.0],
            ],
        )
    }

    /// Replace the model matrix, keeping the material parameters.
    pub fn set_model(&mut self, model: Mat4) {
        *self = Self::with_params(model, self.params);
    }
}

fn flag(on: bool) -> f32 {
    if on { 1.0 } else { 0.0 }
}

/// Views bound in group 2. Unused slots take a white fallback.
///
/// Phong: `aux0` specular mask, `aux1` bump map. Standard: `aux0` alpha map.
pub struct MaterialTextures<'a> {
    pub map: &'a wgpu::TextureView,
    pub aux0: &'a wgpu::TextureView,
    pub aux1: &'a wgpu::TextureView,
}

/// Layouts and cached pipelines for every material.
pub struct MaterialPipelines {
    object_layout: wgpu::BindGroupLayout,
    texture_layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
    shaders: ShaderLibrary,
    pipelines: HashMap<PipelineKey, wgpu::RenderPipeline>,
    surface_format: wgpu::TextureFormat,
    sample_count: u32,
}

impl MaterialPipelines {
    pub fn new(
        device: &wgpu::Device,
        frame_layout: &wgpu::BindGroupLayout,
        surface_format: wgpu::TextureFormat,
        sample_count: u32,
    ) -> Self {
        let object_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("object-bind-group-layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: NonZeroU64::new(std::mem::size_of::<ObjectUniform>() as u64),
                },
                count: None,
            }],
        });

        let texture_entry = |binding| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        };
        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("material-texture-bind-group-layout"),
            entries: &[
                texture_entry(0),
                texture_entry(1),
                texture_entry(2),
                wgpu::BindGroupLayoutEntry {
                    binding: 3,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("material-pipeline-layout"),
            bind_group_layouts: &[frame_layout, &object_layout, &texture_layout],
            immediate_size: 0,
        });

        let mut shaders = ShaderLibrary::new();
        for model in ShadingModel::ALL {
            shaders.load_from_source(device, model.name(), &model.shader_source());
        }

        Self {
            object_layout,
            texture_layout,
            pipeline_layout,
            shaders,
            pipelines: HashMap::new(),
            surface_format,
            sample_count,
        }
    }

    /// Build the pipeline for `key` unless it already exists.
    pub fn prepare(&mut self, device: &wgpu::Device, key: PipelineKey) -> &wgpu::RenderPipeline {
        if !self.pipelines.contains_key(&key) {
            let pipeline = self.create_pipeline(device, key);
            log::debug!("Created material pipeline {key:?}");
            self.pipelines.insert(key, pipeline);
        }
        &self.pipelines[&key]
    }

    pub fn get(&self, key: &PipelineKey) -> Option<&wgpu::RenderPipeline> {
        self.pipelines.get(key)
    }

    pub fn len(&self) -> usize {
        self.pipelines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pipelines.is_empty()
    }

    pub fn object_layout(&self) -> &wgpu::BindGroupLayout {
        &self.object_layout
    }

    pub fn texture_layout(&self) -> &wgpu::BindGroupLayout {
        &self.texture_layout
    }

    pub fn create_object_bind_group(
        &self,
        device: &wgpu::Device,
        label: &str,
        buffer: &wgpu::Buffer,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout: &self.object_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        })
    }

    pub fn create_texture_bind_group(
        &self,
        device: &wgpu::Device,
        label: &str,
        textures: &MaterialTextures<'_>,
        sampler: &wgpu::Sampler,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout: &self.texture_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(textures.map),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(textures.aux0),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(textures.aux1),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
        })
    }

    fn create_pipeline(&self, device: &wgpu::Device, key: PipelineKey) -> wgpu::RenderPipeline {
        let shader: Arc<wgpu::ShaderModule> = match self.shaders.get(key.shading.name()) {
            Some(module) => module,
            None => Arc::new(device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(key.shading.name()),
                source: wgpu::ShaderSource::Wgsl(key.shading.shader_source().into()),
            })),
        };

        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(key.shading.name()),
            layout: Some(&self.pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[VertexPositionNormalUv::layout()],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: Some(wgpu::Face::Back),
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DepthBuffer::FORMAT,
                depth_write_enabled: key.depth_write,
                depth_compare: DepthBuffer::COMPARE_FUNCTION,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState {
                count: self.sample_count,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: self.surface_format,
                    blend: key.blend.blend_state(),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            multiview_mask: None,
            cache: None,
        })
    }
}

/// Object bindings, textures and the shared vertex stage.
const MATERIAL_COMMON_WGSL: &str = r#"
const PI: f32 = 3.141592653589793;

struct ObjectUniform {
    model: mat4x4<f32>,
    normal_matrix: mat4x4<f32>,
    params: array<vec4<f32>, 3>,
};

@group(1) @binding(0)
var<uniform> object: ObjectUniform;

@group(2) @binding(0) var t_map: texture_2d<f32>;
@group(2) @binding(1) var t_aux0: texture_2d<f32>;
@group(2) @binding(2) var t_aux1: texture_2d<f32>;
@group(2) @binding(3) var s_repeat: sampler;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) uv: vec2<f32>,
};

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) world_position: vec3<f32>,
    @location(1) world_normal: vec3<f32>,
    @location(2) uv: vec2<f32>,
};

@vertex
fn vs_main(in: VertexInput) -> VertexOutput {
    let world = object.model * vec4<f32>(in.position, 1.0);
    var out: VertexOutput;
    out.clip_position = camera.view_proj * world;
    out.world_position = world.xyz;
    out.world_normal = normalize((object.normal_matrix * vec4<f32>(in.normal, 0.0)).xyz);
    out.uv = in.uv;
    return out;
}

fn direct_irradiance(n: vec3<f32>) -> vec3<f32> {
    let n_dot_l = max(dot(n, light.direction_intensity.xyz), 0.0);
    return n_dot_l * light.color_exposure.rgb * light.direction_intensity.w;
}

fn output_color(color: vec3<f32>) -> vec3<f32> {
    if object.params[2].x > 0.5 {
        return aces_filmic(color);
    }
    return color;
}
"#;

/// ACES filmic curve, fit by Stephen Hill. Scales by the exposure in the
/// light uniform.
pub(crate) const TONE_MAPPING_WGSL: &str = r#"
fn rrt_and_odt_fit(v: vec3<f32>) -> vec3<f32> {
    let a = v * (v + 0.0245786) - 0.000090537;
    let b = v * (0.983729 * v + 0.4329510) + 0.238081;
    return a / b;
}

fn aces_filmic(color: vec3<f32>) -> vec3<f32> {
    let aces_input = mat3x3<f32>(
        vec3<f32>(0.59719, 0.07600, 0.02840),
        vec3<f32>(0.35458, 0.90834, 0.13383),
        vec3<f32>(0.04823, 0.01566, 0.83777),
    );
    let aces_output = mat3x3<f32>(
        vec3<f32>(1.60475, -0.10208, -0.00327),
        vec3<f32>(-0.53108, 1.10813, -0.07276),
        vec3<f32>(-0.07367, -0.00605, 1.07602),
    );
    var c = color * light.color_exposure.w / 0.6;
    c = aces_input * c;
    c = rrt_and_odt_fit(c);
    c = aces_output * c;
    return saturate(c);
}
"#;

const PHONG_FRAGMENT_WGSL: &str = r#"
fn f_schlick(f0: vec3<f32>, f90: f32, v_dot_h: f32) -> vec3<f32> {
    let fresnel = exp2((-5.55473 * v_dot_h - 6.98316) * v_dot_h);
    return f0 * (1.0 - fresnel) + f90 * fresnel;
}

// Bump mapping without tangents (Mikkelsen, "Bump Mapping Unparametrized Surfaces").
fn perturb_normal(
    surf_pos: vec3<f32>,
    surf_norm: vec3<f32>,
    dh: vec2<f32>,
    face_dir: f32,
) -> vec3<f32> {
    let sigma_x = dpdx(surf_pos);
    let sigma_y = dpdy(surf_pos);
    let r1 = cross(sigma_y, surf_norm);
    let r2 = cross(surf_norm, sigma_x);
    let det = dot(sigma_x, r1) * face_dir;
    let grad = sign(det) * (dh.x * r1 + dh.y * r2);
    return normalize(abs(det) * surf_norm - grad);
}

@fragment
fn fs_main(in: VertexOutput, @builtin(front_facing) front: bool) -> @location(0) vec4<f32> {
    let bump_scale = object.params[1].x;
    let st_dx = dpdx(in.uv);
    let st_dy = dpdy(in.uv);
    let h_ll = bump_scale * textureSample(t_aux1, s_repeat, in.uv).x;
    let h_dx = bump_scale * textureSample(t_aux1, s_repeat, in.uv + st_dx).x - h_ll;
    let h_dy = bump_scale * textureSample(t_aux1, s_repeat, in.uv + st_dy).x - h_ll;
    let albedo = textureSample(t_map, s_repeat, in.uv);
    let specular_strength = textureSample(t_aux0, s_repeat, in.uv).r;

    let face_dir = select(-1.0, 1.0, front);
    let geometric_normal = normalize(in.world_normal) * face_dir;
    let n = perturb_normal(in.world_position, geometric_normal, vec2<f32>(h_dx, h_dy), face_dir);
    let l = light.direction_intensity.xyz;
    let v = normalize(camera.camera_pos.xyz - in.world_position);
    let h = normalize(l + v);

    let irradiance = direct_irradiance(n);
    let diffuse = irradiance * albedo.rgb / PI;

    let shininess = object.params[0].w;
    let fresnel = f_schlick(object.params[0].rgb, 1.0, max(dot(v, h), 0.0));
    let d = (shininess * 0.5 + 1.0) / PI * pow(max(dot(n, h), 0.0), shininess);
    let specular = irradiance * fresnel * 0.25 * d * specular_strength;

    return vec4<f32>(output_color(diffuse + specular), 1.0);
}
"#;

const BASIC_FRAGMENT_WGSL: &str = r#"
@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let color = textureSample(t_map, s_repeat, in.uv);
    return vec4<f32>(output_color(color.rgb), color.a);
}
"#;

const STANDARD_FRAGMENT_WGSL: &str = r#"
@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let albedo = textureSample(t_map, s_repeat, in.uv);
    let mask = textureSample(t_aux0, s_repeat, in.uv).g;
    let n = normalize(in.world_normal);
    let diffuse = direct_irradiance(n) * albedo.rgb / PI;
    let alpha = albedo.a * mask * object.params[0].x;
    return vec4<f32>(output_color(diffuse), alpha);
}
"#;

const FRESNEL_FRAGMENT_WGSL: &str = r#"
@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let rim = object.params[0];
    let facing = object.params[1];
    let power = object.params[2].y;
    let incident = normalize(in.world_position - camera.camera_pos.xyz);
    let n = normalize(in.world_normal);
    let cos_term = max(1.0 + dot(incident, n), 0.0);
    let f = clamp(rim.w + facing.w * pow(cos_term, power), 0.0, 1.0);
    return vec4<f32>(mix(facing.rgb, rim.rgb, f), f);
}
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::FrameBindings;
    use crate::texture::create_test_device_queue;
    use glam::Vec3;

    #[test]
    fn test_object_uniform_size() {
        assert_eq!(std::mem::size_of::<ObjectUniform>(), 176);
    }

    #[test]
    fn test_additive_blend_state() {
        let blend = BlendMode::Additive.blend_state().unwrap();
        assert_eq!(blend.color.src_factor, wgpu::BlendFactor::SrcAlpha);
        assert_eq!(blend.color.dst_factor, wgpu::BlendFactor::One);
        assert_eq!(blend.alpha, blend.color);
        assert!(BlendMode::Opaque.blend_state().is_none());
    }

    #[test]
    fn test_phong_params_layout() {
        let u = ObjectUniform::phong(Mat4::IDENTITY, [0.1, 0.2, 0.3], 30.0, 0.04, true);
        assert_eq!(u.params[0], [0.1, 0.2, 0.3, 30.0]);
        assert_eq!(u.params[1][0], 0.04);
        assert_eq!(u.params[2][0], 1.0);
    }

    #[test]
    fn test_fresnel_is_never_tone_mapped() {
        let u = ObjectUniform::fresnel(Mat4::IDENTITY, [0.0, 0.5, 1.0], [0.0; 3], 0.1, 1.0, 4.0);
        assert_eq!(u.params[2], [0.0, 4.0, 0.0, 0.0]);
        assert_eq!(u.params[0][3], 0.1);
        assert_eq!(u.params[1][3], 1.0);
    }

    #[test]
    fn test_normal_matrix_undoes_nonuniform_scale() {
        let model = Mat4::from_scale(Vec3::new(2.0, 1.0, 1.0));
        let u = ObjectUniform::basic(model, false);
        let normal = Mat4::from_cols_array_2d(&u.normal_matrix);
        assert_eq!(normal.x_axis.x, 0.5);
        assert_eq!(normal.y_axis.y, 1.0);
    }

    #[test]
    fn test_degenerate_model_keeps_identity_normals() {
        let u = ObjectUniform::standard(Mat4::from_scale(Vec3::ZERO), 0.8, true);
        assert_eq!(u.normal_matrix, Mat4::IDENTITY.to_cols_array_2d());
        assert_eq!(u.params[0][0], 0.8);
    }

    #[test]
    fn test_set_model_keeps_params() {
        let mut u = ObjectUniform::standard(Mat4::IDENTITY, 0.8, true);
        let moved = Mat4::from_translation(Vec3::X);
        u.set_model(moved);
        assert_eq!(u.model, moved.to_cols_array_2d());
        assert_eq!(u.params[0][0], 0.8);
    }

    #[test]
    fn test_shader_sources_share_prelude() {
        for model in ShadingModel::ALL {
            let source = model.shader_source();
            assert!(source.contains("fn vs_main"));
            assert!(source.contains("fn fs_main"));
            assert!(source.contains("var<uniform> light"));
        }
        assert!(ShadingModel::Phong.shader_source().contains("perturb_normal"));
    }

    #[test]
    fn test_prepare_caches_by_key() {
        let Some((device, _queue)) = create_test_device_queue() else {
            return;
        };
        let frame = FrameBindings::new(&device);
        let mut pipelines =
            MaterialPipelines::new(&device, &frame.layout, wgpu::TextureFormat::Rgba8Unorm, 1);
        let opaque = PipelineKey {
            shading: ShadingModel::Phong,
            blend: BlendMode::Opaque,
            depth_write: true,
        };
        let glow = PipelineKey {
            shading: ShadingModel::Fresnel,
            blend: BlendMode::Additive,
            depth_write: false,
        };
        pipelines.prepare(&device, opaque);
        pipelines.prepare(&device, opaque);
        pipelines.prepare(&device, glow);
        assert_eq!(pipelines.len(), 2);
        assert!(pipelines.get(&glow).is_some());
        assert!(
            pipelines
                .get(&PipelineKey {
                    depth_write: true,
                    ..glow
                })
                .is_none()
        );
    }
}
