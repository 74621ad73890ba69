//! Frame attachments: reverse-Z depth buffer and the multisampled color
//! target that resolves into the surface.

/// Depth buffer with reverse-Z configuration.
pub struct DepthBuffer {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    width: u32,
    height: u32,
    sample_count: u32,
}

impl DepthBuffer {
    /// 32-bit float depth format for maximum precision with reverse-Z.
    pub const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

    /// Reverse-Z clear value: 0.0 represents the far plane.
    pub const CLEAR_VALUE: f32 = 0.0;

    /// Reverse-Z depth comparison: closer objects have higher depth values.
    pub const COMPARE_FUNCTION: wgpu::CompareFunction = wgpu::CompareFunction::GreaterEqual;

    pub fn new(device: &wgpu::Device, width: u32, height: u32, sample_count: u32) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("depth-buffer"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count,
            dimension: wgpu::TextureDimension::D2,
            format: Self::FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        Self {
            texture,
            view,
            width,
            height,
            sample_count,
        }
    }

    /// Recreate the buffer at the new size. No-op if unchanged.
    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        if self.width == width && self.height == height {
            return;
        }
        *self = Self::new(device, width, height, self.sample_count);
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn sample_count(&self) -> u32 {
        self.sample_count
    }
}

/// Multisampled color target. Absent when rendering with one sample.
pub struct MsaaTarget {
    pub view: wgpu::TextureView,
    format: wgpu::TextureFormat,
    width: u32,
    height: u32,
    sample_count: u32,
}

impl MsaaTarget {
    /// `None` for `sample_count <= 1`.
    pub fn new(
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
        width: u32,
        height: u32,
        sample_count: u32,
    ) -> Option<Self> {
        if sample_count <= 1 {
            return None;
        }
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("msaa-color"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Some(Self {
            view,
            format,
            width,
            height,
            sample_count,
        })
    }

    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        if self.width == width && self.height == height {
            return;
        }
        if let Some(resized) = Self::new(device, self.format, width, height, self.sample_count) {
            *self = resized;
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::texture::create_test_device_queue;

    #[test]
    fn test_reverse_z_constants() {
        assert_eq!(DepthBuffer::FORMAT, wgpu::TextureFormat::Depth32Float);
        assert_eq!(DepthBuffer::CLEAR_VALUE, 0.0);
        assert_eq!(
            DepthBuffer::COMPARE_FUNCTION,
            wgpu::CompareFunction::GreaterEqual
        );
    }

    #[test]
    fn test_resize_updates_dimensions() {
        let Some((device, _queue)) = create_test_device_queue() else {
            return;
        };
        let mut depth = DepthBuffer::new(&device, 800, 600, 1);
        depth.resize(&device, 1920, 1080);
        assert_eq!((depth.width(), depth.height()), (1920, 1080));
        assert!(depth
            .texture
            .usage()
            .contains(wgpu::TextureUsages::RENDER_ATTACHMENT));
    }

    #[test]
    fn test_multisampled_depth_keeps_sample_count() {
        let Some((device, _queue)) = create_test_device_queue() else {
            return;
        };
        let mut depth = DepthBuffer::new(&device, 64, 64, 4);
        depth.resize(&device, 128, 32);
        assert_eq!(depth.sample_count(), 4);
        assert_eq!(depth.texture.sample_count(), 4);
    }

    #[test]
    fn test_single_sample_has_no_msaa_target() {
        let Some((device, _queue)) = create_test_device_queue() else {
            return;
        };
        assert!(MsaaTarget::new(&device, wgpu::TextureFormat::Bgra8Unorm, 64, 64, 1).is_none());
        let mut target =
            MsaaTarget::new(&device, wgpu::TextureFormat::Bgra8Unorm, 64, 64, 4).unwrap();
        target.resize(&device, 100, 50);
        assert_eq!((target.width(), target.height()), (100, 50));
    }
}
