//! wgpu rendering for the globe viewer: surface and device setup, camera,
//! frame attachments, textures and the material and starfield pipelines.

pub mod buffer;
pub mod camera;
pub mod depth;
pub mod gpu;
pub mod material_pipeline;
pub mod mipmap;
pub mod pass;
pub mod pipeline;
pub mod shader;
pub mod star_pipeline;
pub mod texture;
pub mod viewport;

pub use buffer::{BufferAllocator, MeshBuffer, StarInstance, VertexPositionNormalUv};
pub use camera::Camera;
pub use depth::{DepthBuffer, MsaaTarget};
pub use gpu::{
    RenderContext, RenderContextError, SurfaceError, init_render_context_blocking,
    select_present_mode, select_surface_format,
};
pub use material_pipeline::{
    BlendMode, MaterialPipelines, MaterialTextures, ObjectUniform, PipelineKey, ShadingModel,
};
pub use pass::{DepthAttachmentConfig, FrameEncoder, RenderPassBuilder, SPACE_BLACK, clear_color};
pub use pipeline::{CameraUniform, FrameBindings, LightUniform};
pub use mipmap::MipChain;
pub use shader::{ShaderError, ShaderLibrary};
pub use star_pipeline::{StarPipeline, StarUniform, StarfieldBuffers};
pub use texture::{
    ManagedTexture, TEXTURE_FORMAT, TextureData, TextureError, TextureManager, mip_level_count,
};
pub use viewport::{PhysicalSize, Viewport, ViewportResize, aspect_ratio};
