//! Vertex, instance, index and uniform buffer creation.

use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

/// Vertex and index buffers for one indexed mesh.
pub struct MeshBuffer {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub index_count: u32,
}

impl MeshBuffer {
    /// Bind vertex and index buffers to a render pass.
    pub fn bind(&self, render_pass: &mut wgpu::RenderPass<'_>) {
        render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        render_pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
    }

    /// Draw the entire mesh using indexed rendering.
    pub fn draw(&self, render_pass: &mut wgpu::RenderPass<'_>) {
        render_pass.draw_indexed(0..self.index_count, 0, 0..1);
    }
}

/// Creates GPU buffers on one device.
pub struct BufferAllocator<'a> {
    device: &'a wgpu::Device,
}

impl<'a> BufferAllocator<'a> {
    pub fn new(device: &'a wgpu::Device) -> Self {
        Self { device }
    }

    /// Upload a mesh from vertices and `u32` indices.
    pub fn create_mesh<V: Pod>(&self, label: &str, vertices: &[V], indices: &[u32]) -> MeshBuffer {
        MeshBuffer {
            vertex_buffer: self.create_vertex_buffer(&format!("{label}-vertices"), vertices),
            index_buffer: self.create_index_buffer(&format!("{label}-indices"), indices),
            index_count: indices.len() as u32,
        }
    }

    /// Vertex buffer, also used for per-instance data.
    pub fn create_vertex_buffer<V: Pod>(&self, label: &str, data: &[V]) -> wgpu::Buffer {
        self.device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: bytemuck::cast_slice(data),
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            })
    }

    pub fn create_index_buffer(&self, label: &str, data: &[u32]) -> wgpu::Buffer {
        self.device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: bytemuck::cast_slice(data),
                usage: wgpu::BufferUsages::INDEX | wgpu::BufferUsages::COPY_DST,
            })
    }

    /// Uniform buffer initialized with `value`, writable each frame.
    pub fn create_uniform_buffer<U: Pod>(&self, label: &str, value: &U) -> wgpu::Buffer {
        self.device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: bytemuck::bytes_of(value),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            })
    }
}

/// Mesh vertex: position, normal and texture coordinates.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct VertexPositionNormalUv {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

impl VertexPositionNormalUv {
    const ATTRIBUTES: [wgpu::VertexAttribute; 3] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32x2];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Self>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// Per-instance data of one star sprite.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct StarInstance {
    pub position: [f32; 3],
    pub color: [f32; 3],
}

impl StarInstance {
    const ATTRIBUTES: [wgpu::VertexAttribute; 2] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3];

    /// Instance-rate layout: one entry per star, expanded to a quad in the
    /// vertex shader.
    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Self>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::texture::create_test_device_queue;

    #[test]
    fn test_vertex_position_normal_uv_layout() {
        let layout = VertexPositionNormalUv::layout();
        assert_eq!(layout.array_stride, 32);
        assert_eq!(layout.step_mode, wgpu::VertexStepMode::Vertex);
        let offsets: Vec<_> = layout.attributes.iter().map(|a| a.offset).collect();
        assert_eq!(offsets, [0, 12, 24]);
    }

    #[test]
    fn test_star_instance_layout_is_per_instance() {
        let layout = StarInstance::layout();
        assert_eq!(layout.array_stride, 24);
        assert_eq!(layout.step_mode, wgpu::VertexStepMode::Instance);
        assert_eq!(layout.attributes[1].offset, 12);
        assert_eq!(layout.attributes[1].format, wgpu::VertexFormat::Float32x3);
    }

    #[test]
    fn test_mesh_index_count_matches_input() {
        let Some((device, _queue)) = create_test_device_queue() else {
            return;
        };
        let allocator = BufferAllocator::new(&device);
        let vertices = [VertexPositionNormalUv {
            position: [0.0; 3],
            normal: [0.0, 1.0, 0.0],
            uv: [0.0; 2],
        }; 3];
        let mesh = allocator.create_mesh("triangle", &vertices, &[0, 1, 2]);
        assert_eq!(mesh.index_count, 3);
        assert_eq!(mesh.vertex_buffer.size(), 96);
    }

    #[test]
    fn test_uniform_buffer_usage() {
        let Some((device, _queue)) = create_test_device_queue() else {
            return;
        };
        let allocator = BufferAllocator::new(&device);
        let buffer = allocator.create_uniform_buffer("u", &[0.0f32; 4]);
        assert!(buffer.usage().contains(wgpu::BufferUsages::UNIFORM));
        assert_eq!(buffer.size(), 16);
    }
}
