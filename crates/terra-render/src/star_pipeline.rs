//! Starfield rendering: one camera-facing round sprite per star.
//!
//! Stars are drawn as instanced quads. Each [`StarInstance`] is expanded to
//! six vertices along the camera's right and up axes, and fragments outside
//! the inscribed circle are discarded.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Quat, Vec3};
use std::num::NonZeroU64;

use crate::buffer::{BufferAllocator, StarInstance};
use crate::depth::DepthBuffer;
use crate::material_pipeline::TONE_MAPPING_WGSL;
use crate::pipeline::FRAME_BINDINGS_WGSL;

/// Bind group 1 of the star pipeline.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct StarUniform {
    pub model: [[f32; 4]; 4],
    /// xyz: camera right in world space, w: sprite size in world units.
    pub right_size: [f32; 4],
    /// xyz: camera up in world space, w: tone mapped flag.
    pub up_tone: [f32; 4],
}

impl StarUniform {
    pub fn new(model: Mat4, camera_rotation: Quat, size: f32, tone_mapped: bool) -> Self {
        let right = camera_rotation * Vec3::X;
        let up = camera_rotation * Vec3::Y;
        Self {
            model: model.to_cols_array_2d(),
            right_size: [right.x, right.y, right.z, size],
            up_tone: [up.x, up.y, up.z, if tone_mapped { 1.0 } else { 0.0 }],
        }
    }
}

/// Instanced billboard pipeline for starfields.
pub struct StarPipeline {
    pub pipeline: wgpu::RenderPipeline,
    pub uniform_layout: wgpu::BindGroupLayout,
}

impl StarPipeline {
    pub fn new(
        device: &wgpu::Device,
        frame_layout: &wgpu::BindGroupLayout,
        surface_format: wgpu::TextureFormat,
        sample_count: u32,
    ) -> Self {
        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("star-bind-group-layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: NonZeroU64::new(std::mem::size_of::<StarUniform>() as u64),
                },
                count: None,
            }],
        });

        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("star-pipeline-layout"),
            bind_group_layouts: &[frame_layout, &uniform_layout],
            immediate_size: 0,
        });

        let source = [FRAME_BINDINGS_WGSL, TONE_MAPPING_WGSL, STAR_SHADER_WGSL].concat();
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("star-shader"),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("star-pipeline"),
            layout: Some(&layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[StarInstance::layout()],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DepthBuffer::FORMAT,
                depth_write_enabled: true,
                depth_compare: DepthBuffer::COMPARE_FUNCTION,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState {
                count: sample_count,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            multiview_mask: None,
            cache: None,
        });

        Self {
            pipeline,
            uniform_layout,
        }
    }

    /// Upload instances and create the uniform for one starfield.
    pub fn create_starfield(
        &self,
        device: &wgpu::Device,
        stars: &[StarInstance],
        uniform: &StarUniform,
    ) -> StarfieldBuffers {
        let allocator = BufferAllocator::new(device);
        let instances = allocator.create_vertex_buffer("star-instances", stars);
        let uniform_buffer = allocator.create_uniform_buffer("star-uniform", uniform);
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("star-bind-group"),
            layout: &self.uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });
        StarfieldBuffers {
            instances,
            instance_count: stars.len() as u32,
            uniform_buffer,
            bind_group,
        }
    }

    pub fn draw(
        &self,
        render_pass: &mut wgpu::RenderPass<'_>,
        frame_bind_group: &wgpu::BindGroup,
        starfield: &StarfieldBuffers,
    ) {
        if starfield.instance_count == 0 {
            return;
        }
        render_pass.set_pipeline(&self.pipeline);
        render_pass.set_bind_group(0, frame_bind_group, &[]);
        render_pass.set_bind_group(1, &starfield.bind_group, &[]);
        render_pass.set_vertex_buffer(0, starfield.instances.slice(..));
        render_pass.draw(0..6, 0..starfield.instance_count);
    }
}

/// GPU buffers of one uploaded starfield.
pub struct StarfieldBuffers {
    pub instances: wgpu::Buffer,
    pub instance_count: u32,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

impl StarfieldBuffers {
    pub fn update(&self, queue: &wgpu::Queue, uniform: &StarUniform) {
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(uniform));
    }
}

const STAR_SHADER_WGSL: &str = r#"
struct StarUniform {
    model: mat4x4<f32>,
    right_size: vec4<f32>,
    up_tone: vec4<f32>,
};

@group(1) @binding(0)
var<uniform> stars: StarUniform;

struct InstanceInput {
    @location(0) position: vec3<f32>,
    @location(1) color: vec3<f32>,
};

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) corner: vec2<f32>,
    @location(1) color: vec3<f32>,
};

@vertex
fn vs_main(@builtin(vertex_index) idx: u32, star: InstanceInput) -> VertexOutput {
    var corners = array<vec2<f32>, 6>(
        vec2<f32>(-1.0, -1.0),
        vec2<f32>(1.0, -1.0),
        vec2<f32>(1.0, 1.0),
        vec2<f32>(-1.0, -1.0),
        vec2<f32>(1.0, 1.0),
        vec2<f32>(-1.0, 1.0),
    );
    let corner = corners[idx];
    let half_size = 0.5 * stars.right_size.w;
    let center = (stars.model * vec4<f32>(star.position, 1.0)).xyz;
    let world = center
        + stars.right_size.xyz * corner.x * half_size
        + stars.up_tone.xyz * corner.y * half_size;

    var out: VertexOutput;
    out.clip_position = camera.view_proj * vec4<f32>(world, 1.0);
    out.corner = corner;
    out.color = star.color;
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    if dot(in.corner, in.corner) > 1.0 {
        discard;
    }
    var color = in.color;
    if stars.up_tone.w > 0.5 {
        color = aces_filmic(color);
    }
    return vec4<f32>(color, 1.0);
}
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::FrameBindings;
    use crate::texture::create_test_device_queue;

    #[test]
    fn test_star_uniform_size() {
        assert_eq!(std::mem::size_of::<StarUniform>(), 96);
    }

    #[test]
    fn test_billboard_axes_follow_camera() {
        let identity = StarUniform::new(Mat4::IDENTITY, Quat::IDENTITY, 0.2, true);
        assert_eq!(identity.right_size, [1.0, 0.0, 0.0, 0.2]);
        assert_eq!(identity.up_tone, [0.0, 1.0, 0.0, 1.0]);

        let turned = StarUniform::new(
            Mat4::IDENTITY,
            Quat::from_rotation_y(std::f32::consts::FRAC_PI_2),
            0.2,
            false,
        );
        assert!((turned.right_size[2] + 1.0).abs() < 1e-6);
        assert_eq!(turned.up_tone[3], 0.0);
    }

    #[test]
    fn test_create_starfield() {
        let Some((device, queue)) = create_test_device_queue() else {
            return;
        };
        let frame = FrameBindings::new(&device);
        let pipeline =
            StarPipeline::new(&device, &frame.layout, wgpu::TextureFormat::Rgba8Unorm, 1);
        let stars = [
            StarInstance {
                position: [10.0, 0.0, 0.0],
                color: [1.0; 3],
            };
            16
        ];
        let uniform = StarUniform::new(Mat4::IDENTITY, Quat::IDENTITY, 0.2, true);
        let buffers = pipeline.create_starfield(&device, &stars, &uniform);
        buffers.update(&queue, &uniform);
        assert_eq!(buffers.instance_count, 16);
        assert_eq!(buffers.instances.size(), 16 * 24);
    }
}
