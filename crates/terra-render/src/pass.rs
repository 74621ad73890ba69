//! Render pass configuration and per-frame command encoding.
//!
//! [`RenderPassBuilder`] describes the clear color and attachments;
//! [`FrameEncoder`] owns the command encoder and the acquired surface
//! texture for one frame and presents it on [`submit`](FrameEncoder::submit).

/// Clear color behind the starfield.
pub const SPACE_BLACK: wgpu::Color = wgpu::Color::BLACK;

/// Convert a linear RGB triple to a wgpu clear color.
pub fn clear_color(rgb: [f32; 3]) -> wgpu::Color {
    wgpu::Color {
        r: f64::from(rgb[0]),
        g: f64::from(rgb[1]),
        b: f64::from(rgb[2]),
        a: 1.0,
    }
}

/// Configuration for the depth attachment.
#[derive(Debug)]
pub struct DepthAttachmentConfig {
    pub view: wgpu::TextureView,
    pub clear_value: f32,
}

/// Builder for a single-color-attachment render pass.
#[derive(Debug)]
pub struct RenderPassBuilder {
    clear_color: wgpu::Color,
    depth_attachment: Option<DepthAttachmentConfig>,
    msaa_view: Option<wgpu::TextureView>,
    label: Option<&'static str>,
}

impl Default for RenderPassBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderPassBuilder {
    /// Pass clearing to black with no depth attachment.
    pub fn new() -> Self {
        Self {
            clear_color: SPACE_BLACK,
            depth_attachment: None,
            msaa_view: None,
            label: None,
        }
    }

    pub fn clear_color(mut self, color: wgpu::Color) -> Self {
        self.clear_color = color;
        self
    }

    /// Attach a depth buffer cleared to `clear_value`.
    pub fn depth(mut self, view: wgpu::TextureView, clear_value: f32) -> Self {
        self.depth_attachment = Some(DepthAttachmentConfig { view, clear_value });
        self
    }

    /// Render into a multisampled target that resolves into the frame's
    /// surface texture.
    pub fn msaa(mut self, view: wgpu::TextureView) -> Self {
        self.msaa_view = Some(view);
        self
    }

    pub fn label(mut self, label: &'static str) -> Self {
        self.label = Some(label);
        self
    }

    fn create_render_pass<'encoder>(
        &self,
        encoder: &'encoder mut wgpu::CommandEncoder,
        surface_view: &'encoder wgpu::TextureView,
    ) -> wgpu::RenderPass<'encoder> {
        let (view, resolve_target) = match &self.msaa_view {
            Some(msaa) => (msaa, Some(surface_view)),
            None => (surface_view, None),
        };
        let color_attachment = wgpu::RenderPassColorAttachment {
            view,
            resolve_target,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Clear(self.clear_color),
                store: wgpu::StoreOp::Store,
            },
            depth_slice: None,
        };

        let depth_stencil_attachment =
            self.depth_attachment
                .as_ref()
                .map(|depth| wgpu::RenderPassDepthStencilAttachment {
                    view: &depth.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(depth.clear_value),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                });

        encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: self.label,
            color_attachments: &[Some(color_attachment)],
            depth_stencil_attachment,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        })
    }
}

/// Command encoding for one frame, ending in a present.
pub struct FrameEncoder {
    encoder: wgpu::CommandEncoder,
    surface_texture: wgpu::SurfaceTexture,
    surface_view: wgpu::TextureView,
}

impl FrameEncoder {
    pub fn new(device: &wgpu::Device, surface_texture: wgpu::SurfaceTexture) -> Self {
        let encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("frame-encoder"),
        });
        let surface_view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        Self {
            encoder,
            surface_texture,
            surface_view,
        }
    }

    /// Begin a render pass targeting this frame's surface texture.
    pub fn begin_render_pass<'a>(
        &'a mut self,
        builder: &'a RenderPassBuilder,
    ) -> wgpu::RenderPass<'a> {
        builder.create_render_pass(&mut self.encoder, &self.surface_view)
    }

    /// Submit the recorded commands and present the surface texture.
    pub fn submit(self, queue: &wgpu::Queue) {
        queue.submit([self.encoder.finish()]);
        self.surface_texture.present();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_clear_color_is_black() {
        let builder = RenderPassBuilder::new();
        assert_eq!(builder.clear_color, wgpu::Color::BLACK);
        assert!(builder.depth_attachment.is_none());
        assert!(builder.msaa_view.is_none());
    }

    #[test]
    fn test_builder_sets_clear_color_and_label() {
        let builder = RenderPassBuilder::new()
            .clear_color(wgpu::Color::RED)
            .label("scene-pass");
        assert_eq!(builder.clear_color, wgpu::Color::RED);
        assert_eq!(builder.label, Some("scene-pass"));
    }

    #[test]
    fn test_clear_color_from_config() {
        let color = clear_color([0.0, 0.5, 1.0]);
        assert_eq!(color.g, 0.5);
        assert_eq!(color.b, 1.0);
        assert_eq!(color.a, 1.0);
        assert_eq!(clear_color([0.0; 3]), SPACE_BLACK);
    }
}
