//! GPU device initialization and surface management.
//!
//! [`RenderContext`] owns the wgpu instance, adapter, device, queue and the
//! window surface. The surface is configured with a linear (non-sRGB) format
//! when the adapter offers one, since shaders write display-ready values.

use std::sync::Arc;
use winit::window::Window;

#[derive(Debug, thiserror::Error)]
pub enum RenderContextError {
    #[error("no GPU adapter can present to this window")]
    NoAdapter,

    #[error("GPU device request failed: {0}")]
    DeviceRequest(#[from] wgpu::RequestDeviceError),

    #[error("window surface creation failed: {0}")]
    SurfaceCreation(#[from] wgpu::CreateSurfaceError),

    #[error("window surface offers no texture formats")]
    NoSurfaceFormat,
}

/// Why no frame could be acquired. `Outdated` never escapes: the surface is
/// reconfigured and acquisition retried once, and a second failure is `Lost`.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SurfaceError {
    #[error("surface lost")]
    Lost,

    #[error("GPU out of memory")]
    OutOfMemory,

    /// The frame is skipped.
    #[error("timed out acquiring the next surface texture")]
    Timeout,
}

/// Device, queue and the configured window surface.
pub struct RenderContext {
    pub instance: wgpu::Instance,
    pub adapter: wgpu::Adapter,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub surface: wgpu::Surface<'static>,
    pub surface_config: wgpu::SurfaceConfiguration,
    pub surface_format: wgpu::TextureFormat,
}

impl RenderContext {
    /// Pick an adapter able to present to `window` and configure its surface.
    pub async fn new(window: Arc<Window>, vsync: bool) -> Result<Self, RenderContextError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let size = window.inner_size();
        let surface = instance.create_surface(window)?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .map_err(|_| RenderContextError::NoAdapter)?;

        let info = adapter.get_info();
        log::info!("Using {} on {:?}", info.name, info.backend);

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("terra-device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: wgpu::MemoryHints::default(),
                experimental_features: wgpu::ExperimentalFeatures::default(),
                trace: wgpu::Trace::Off,
            })
            .await?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = select_surface_format(&surface_caps.formats)
            .ok_or(RenderContextError::NoSurfaceFormat)?;
        let present_mode = select_present_mode(&surface_caps.present_modes, vsync);
        log::info!("Surface format {surface_format:?}, present mode {present_mode:?}");

        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode,
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &surface_config);

        Ok(Self {
            instance,
            adapter,
            device,
            queue,
            surface,
            surface_config,
            surface_format,
        })
    }

    /// Reconfigure the surface for a new window size. Zero extents become 1.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.surface_config.width = width.max(1);
        self.surface_config.height = height.max(1);
        self.surface.configure(&self.device, &self.surface_config);
    }

    /// Largest sample count not above `requested` that both the surface
    /// format and `depth_format` support. Always at least 1.
    pub fn supported_sample_count(&self, requested: u32, depth_format: wgpu::TextureFormat) -> u32 {
        let color = self.adapter.get_texture_format_features(self.surface_format);
        let depth = self.adapter.get_texture_format_features(depth_format);
        let supported = [16, 8, 4, 2]
            .into_iter()
            .filter(|&count| count <= requested)
            .find(|&count| {
                color.flags.sample_count_supported(count)
                    && depth.flags.sample_count_supported(count)
            })
            .unwrap_or(1);
        if supported != requested {
            log::warn!("MSAA x{requested} unsupported, using x{supported}");
        }
        supported
    }

    /// Acquire the next frame's texture.
    pub fn get_current_texture(&self) -> Result<wgpu::SurfaceTexture, SurfaceError> {
        match self.surface.get_current_texture() {
            Ok(texture) => Ok(texture),
            Err(err @ (wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated)) => {
                log::warn!("{err}, reconfiguring surface");
                self.surface.configure(&self.device, &self.surface_config);
                self.surface
                    .get_current_texture()
                    .map_err(|_| SurfaceError::Lost)
            }
            Err(wgpu::SurfaceError::OutOfMemory) => Err(SurfaceError::OutOfMemory),
            Err(wgpu::SurfaceError::Timeout) => Err(SurfaceError::Timeout),
            Err(wgpu::SurfaceError::Other) => Err(SurfaceError::Lost),
        }
    }
}

/// [`RenderContext::new`], blocking on `pollster`.
pub fn init_render_context_blocking(
    window: Arc<Window>,
    vsync: bool,
) -> Result<RenderContext, RenderContextError> {
    pollster::block_on(RenderContext::new(window, vsync))
}

/// Pick the surface format: linear 8-bit formats first, then any non-sRGB
/// format, then whatever the surface lists first.
pub fn select_surface_format(formats: &[wgpu::TextureFormat]) -> Option<wgpu::TextureFormat> {
    [
        wgpu::TextureFormat::Bgra8Unorm,
        wgpu::TextureFormat::Rgba8Unorm,
    ]
    .into_iter()
    .find(|preferred| formats.contains(preferred))
    .or_else(|| formats.iter().copied().find(|f| !f.is_srgb()))
    .or_else(|| formats.first().copied())
}

/// Fifo when vsync is requested (always available), otherwise the first
/// available of Mailbox and Immediate.
pub fn select_present_mode(modes: &[wgpu::PresentMode], vsync: bool) -> wgpu::PresentMode {
    if vsync {
        return wgpu::PresentMode::Fifo;
    }
    [wgpu::PresentMode::Mailbox, wgpu::PresentMode::Immediate]
        .into_iter()
        .find(|mode| modes.contains(mode))
        .unwrap_or(wgpu::PresentMode::Fifo)
}
