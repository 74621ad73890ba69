//! Per-frame uniforms shared by every pipeline (bind group 0).

use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use std::num::NonZeroU64;

use crate::buffer::BufferAllocator;
use crate::camera::Camera;

/// Camera view-projection and world position.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct CameraUniform {
    pub view_proj: [[f32; 4]; 4], // 64 bytes
    pub camera_pos: [f32; 4],     // 16 bytes, w unused
}

/// The scene's directional light plus tone-mapping exposure.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct LightUniform {
    /// xyz: unit vector toward the light, w: intensity.
    pub direction_intensity: [f32; 4],
    /// xyz: linear color, w: exposure.
    pub color_exposure: [f32; 4],
}

impl LightUniform {
    /// `to_light` is normalized here; a zero vector falls back to +Z.
    pub fn new(to_light: Vec3, color: [f32; 3], intensity: f32, exposure: f32) -> Self {
        let dir = to_light.try_normalize().unwrap_or(Vec3::Z);
        Self {
            direction_intensity: [dir.x, dir.y, dir.z, intensity],
            color_exposure: [color[0], color[1], color[2], exposure],
        }
    }
}

/// Bind group 0: camera at binding 0, light at binding 1.
pub struct FrameBindings {
    pub layout: wgpu::BindGroupLayout,
    pub bind_group: wgpu::BindGroup,
    camera_buffer: wgpu::Buffer,
    light_buffer: wgpu::Buffer,
}

impl FrameBindings {
    pub fn new(device: &wgpu::Device) -> Self {
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("frame-bind-group-layout"),
            entries: &[
                uniform_entry(0, std::mem::size_of::<CameraUniform>() as u64),
                uniform_entry(1, std::mem::size_of::<LightUniform>() as u64),
            ],
        });

        let allocator = BufferAllocator::new(device);
        let camera_buffer =
            allocator.create_uniform_buffer("camera-uniform", &CameraUniform::default());
        let light_buffer =
            allocator.create_uniform_buffer("light-uniform", &LightUniform::default());

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("frame-bind-group"),
            layout: &layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: camera_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: light_buffer.as_entire_binding(),
                },
            ],
        });

        Self {
            layout,
            bind_group,
            camera_buffer,
            light_buffer,
        }
    }

    /// Upload this frame's camera and light.
    pub fn update(&self, queue: &wgpu::Queue, camera: &Camera, light: &LightUniform) {
        queue.write_buffer(
            &self.camera_buffer,
            0,
            bytemuck::bytes_of(&camera.to_uniform()),
        );
        queue.write_buffer(&self.light_buffer, 0, bytemuck::bytes_of(light));
    }
}

fn uniform_entry(binding: u32, size: u64) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: NonZeroU64::new(size),
        },
        count: None,
    }
}

/// WGSL declarations matching [`CameraUniform`] and [`LightUniform`].
pub const FRAME_BINDINGS_WGSL: &str = r#"
struct CameraUniform {
    view_proj: mat4x4<f32>,
    camera_pos: vec4<f32>,
};

struct LightUniform {
    direction_intensity: vec4<f32>,
    color_exposure: vec4<f32>,
};

@group(0) @binding(0)
var<uniform> camera: CameraUniform;

@group(0) @binding(1)
var<uniform> light: LightUniform;
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::texture::create_test_device_queue;

    #[test]
    fn test_uniform_sizes() {
        assert_eq!(std::mem::size_of::<CameraUniform>(), 80);
        assert_eq!(std::mem::size_of::<LightUniform>(), 32);
    }

    #[test]
    fn test_light_uniform_normalizes_direction() {
        let light = LightUniform::new(Vec3::new(-2.0, 0.5, 1.5), [1.0; 3], 2.0, 1.0);
        let [x, y, z, w] = light.direction_intensity;
        assert!((Vec3::new(x, y, z).length() - 1.0).abs() < 1e-6);
        assert_eq!(w, 2.0);
        assert_eq!(light.color_exposure[3], 1.0);
    }

    #[test]
    fn test_zero_direction_falls_back_to_z() {
        let light = LightUniform::new(Vec3::ZERO, [1.0; 3], 1.0, 1.0);
        assert_eq!(light.direction_intensity, [0.0, 0.0, 1.0, 1.0]);
    }

    #[test]
    fn test_frame_bindings_update() {
        let Some((device, queue)) = create_test_device_queue() else {
            return;
        };
        let bindings = FrameBindings::new(&device);
        let light = LightUniform::new(Vec3::X, [1.0; 3], 1.0, 1.0);
        bindings.update(&queue, &Camera::default(), &light);
        assert_eq!(bindings.camera_buffer.size(), 80);
        assert_eq!(bindings.light_buffer.size(), 32);
    }
}
