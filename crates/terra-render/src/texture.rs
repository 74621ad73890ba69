//! Scene textures: upload, mip chains and the shared sampler.
//!
//! Images are stored as linear `Rgba8Unorm`, so texel values reach the
//! shaders unchanged. Uploads are keyed by name; asking for a name twice
//! returns the first upload.

use std::collections::HashMap;
use std::sync::Arc;

use crate::mipmap::MipChain;

/// Format every scene texture is stored in.
pub const TEXTURE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// An uploaded texture and its full-chain view.
pub struct ManagedTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    /// Width and height in texels.
    pub dimensions: (u32, u32),
    pub mip_level_count: u32,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TextureError {
    #[error("{width}x{height} texture needs {expected} bytes of RGBA8, got {actual}")]
    DataSizeMismatch {
        actual: usize,
        expected: usize,
        width: u32,
        height: u32,
    },

    #[error("texture has an empty dimension ({width}x{height})")]
    ZeroDimensions { width: u32, height: u32 },
}

/// Decoded RGBA8 texels, row-major, top row first.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextureData {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl TextureData {
    /// A single opaque white texel. Neutral for color, specular and alpha
    /// lookups.
    pub fn white() -> Self {
        Self {
            width: 1,
            height: 1,
            rgba: vec![255; 4],
        }
    }

    /// Checks that the buffer holds exactly `width * height` texels.
    pub fn validate(&self) -> Result<(), TextureError> {
        let (width, height) = (self.width, self.height);
        if width == 0 || height == 0 {
            return Err(TextureError::ZeroDimensions { width, height });
        }
        let expected = width as usize * height as usize * 4;
        match self.rgba.len() {
            actual if actual == expected => Ok(()),
            actual => Err(TextureError::DataSizeMismatch {
                actual,
                expected,
                width,
                height,
            }),
        }
    }

    fn extent(&self) -> wgpu::Extent3d {
        wgpu::Extent3d {
            width: self.width,
            height: self.height,
            depth_or_array_layers: 1,
        }
    }
}

/// Length of the full mip chain down to 1x1.
pub fn mip_level_count(width: u32, height: u32) -> u32 {
    32 - width.max(height).max(1).leading_zeros()
}

/// Uploads and caches the scene's textures.
pub struct TextureManager {
    textures: HashMap<String, Arc<ManagedTexture>>,
    sampler: wgpu::Sampler,
    mips: MipChain,
}

impl TextureManager {
    pub fn new(device: &wgpu::Device) -> Self {
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("scene-sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::MipmapFilterMode::Linear,
            ..Default::default()
        });

        Self {
            textures: HashMap::new(),
            sampler,
            mips: MipChain::new(device, TEXTURE_FORMAT),
        }
    }

    /// Upload `data` with a full mip chain, or hand back the texture already
    /// registered under `name`.
    pub fn create_texture(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        name: &str,
        data: &TextureData,
    ) -> Result<Arc<ManagedTexture>, TextureError> {
        if let Some(cached) = self.textures.get(name) {
            return Ok(cached.clone());
        }
        data.validate()?;

        let levels = mip_level_count(data.width, data.height);
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(name),
            size: data.extent(),
            mip_level_count: levels,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: TEXTURE_FORMAT,
            // Lower levels are rendered into.
            usage: wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_DST
                | wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });

        queue.write_texture(
            texture.as_image_copy(),
            &data.rgba,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(data.width * 4),
                rows_per_image: Some(data.height),
            },
            data.extent(),
        );
        self.mips.generate(device, queue, &texture);

        let view = texture.create_view(&Default::default());
        let uploaded = Arc::new(ManagedTexture {
            texture,
            view,
            dimensions: (data.width, data.height),
            mip_level_count: levels,
        });
        self.textures.insert(name.to_owned(), uploaded.clone());
        log::info!(
            "Uploaded texture '{name}' ({}x{}, {levels} mip levels)",
            data.width,
            data.height
        );
        Ok(uploaded)
    }

    pub fn get(&self, name: &str) -> Option<Arc<ManagedTexture>> {
        self.textures.get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }

    /// Linear filtering, repeating horizontally so UVs past 1.0 on the
    /// sphere seam wrap around.
    pub fn sampler(&self) -> &wgpu::Sampler {
        &self.sampler
    }
}

/// Headless device for GPU tests. `None` when the machine has no adapter.
#[cfg(test)]
pub(crate) fn create_test_device_queue() -> Option<(wgpu::Device, wgpu::Queue)> {
    let instance = wgpu::Instance::default();
    pollster::block_on(async {
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions::default())
            .await
            .ok()?;
        adapter.request_device(&Default::default()).await.ok()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(width: u32, height: u32) -> TextureData {
        TextureData {
            width,
            height,
            rgba: vec![200; (width * height * 4) as usize],
        }
    }

    #[test]
    fn test_mip_level_count() {
        assert_eq!(mip_level_count(1, 1), 1);
        assert_eq!(mip_level_count(2, 2), 2);
        assert_eq!(mip_level_count(1024, 512), 11);
        assert_eq!(mip_level_count(1000, 500), 10);
        assert_eq!(mip_level_count(4096, 2048), 13);
    }

    #[test]
    fn test_validate_rejects_bad_input() {
        let empty = TextureData {
            width: 0,
            height: 4,
            rgba: Vec::new(),
        };
        assert_eq!(
            empty.validate(),
            Err(TextureError::ZeroDimensions {
                width: 0,
                height: 4
            })
        );

        let mut short = solid(4, 4);
        short.rgba.truncate(32);
        assert!(matches!(
            short.validate(),
            Err(TextureError::DataSizeMismatch { expected: 64, actual: 32, .. })
        ));
        assert!(solid(4, 4).validate().is_ok());
    }

    #[test]
    fn test_white_texel() {
        let white = TextureData::white();
        assert_eq!((white.width, white.height), (1, 1));
        assert_eq!(white.rgba, [255, 255, 255, 255]);
        assert!(white.validate().is_ok());
    }

    #[test]
    fn test_upload_builds_full_mip_chain() {
        let Some((device, queue)) = create_test_device_queue() else {
            return;
        };
        let mut manager = TextureManager::new(&device);
        let texture = manager
            .create_texture(&device, &queue, "earth", &solid(64, 32))
            .unwrap();
        assert_eq!(texture.dimensions, (64, 32));
        assert_eq!(texture.mip_level_count, 7);
        assert_eq!(texture.texture.mip_level_count(), 7);
        assert_eq!(texture.texture.format(), TEXTURE_FORMAT);
    }

    #[test]
    fn test_odd_sized_texture_uploads() {
        let Some((device, queue)) = create_test_device_queue() else {
            return;
        };
        let mut manager = TextureManager::new(&device);
        let texture = manager
            .create_texture(&device, &queue, "odd", &solid(5, 3))
            .unwrap();
        assert_eq!(texture.mip_level_count, 3);
    }

    #[test]
    fn test_same_name_returns_cached_texture() {
        let Some((device, queue)) = create_test_device_queue() else {
            return;
        };
        let mut manager = TextureManager::new(&device);
        let a = manager
            .create_texture(&device, &queue, "shared", &solid(2, 2))
            .unwrap();
        let b = manager
            .create_texture(&device, &queue, "shared", &solid(8, 8))
            .unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(manager.len(), 1);
    }

    #[test]
    fn test_rejected_upload_is_not_cached() {
        let Some((device, queue)) = create_test_device_queue() else {
            return;
        };
        let mut manager = TextureManager::new(&device);
        let empty = TextureData {
            width: 0,
            height: 0,
            rgba: Vec::new(),
        };
        let result = manager.create_texture(&device, &queue, "zero", &empty);
        assert!(matches!(result, Err(TextureError::ZeroDimensions { .. })));
        assert!(manager.get("zero").is_none());
        assert!(manager.is_empty());
    }
}
