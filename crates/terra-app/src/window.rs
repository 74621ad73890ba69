//! Window creation and event handling via winit.
//!
//! [`AppState`] implements winit's [`ApplicationHandler`]: it creates the
//! window and GPU state on resume, forwards resizes to the camera and the
//! render targets, and runs one frame per `RedrawRequested`.

use std::sync::Arc;

use glam::Vec3;
use terra_config::Config;
use terra_render::{
    Camera, RenderContext, SurfaceError, Viewport, ViewportResize, init_render_context_blocking,
};
use terra_scene::{Animator, EarthScene};
use tracing::{error, info, instrument, warn};
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::window::{Fullscreen, Window, WindowAttributes, WindowId};

use crate::frame_loop::{FrameError, FrameLoop};
use crate::renderer::SceneRenderer;

/// Returns [`WindowAttributes`] based on the given configuration.
pub fn window_attributes_from_config(config: &Config) -> WindowAttributes {
    let attrs = WindowAttributes::default()
        .with_title(config.window.title.clone())
        .with_inner_size(winit::dpi::LogicalSize::new(
            config.window.width as f64,
            config.window.height as f64,
        ));
    if config.window.fullscreen {
        attrs.with_fullscreen(Some(Fullscreen::Borderless(None)))
    } else {
        attrs
    }
}

/// Camera described by the render config, looking at the origin from +Z.
pub fn camera_from_config(config: &Config, aspect_ratio: f32) -> Camera {
    let render = &config.render;
    Camera::perspective(
        Vec3::new(0.0, 0.0, render.camera_distance),
        render.fov_y_degrees,
        aspect_ratio,
        render.near,
        render.far,
    )
}

/// Apply a forwarded resize to the camera. The aspect ratio is taken as-is.
pub fn apply_resize_to_camera(camera: &mut Camera, resize: &ViewportResize) {
    camera.set_aspect_ratio(resize.aspect_ratio);
}

/// GPU-dependent state, created once the window exists.
struct Graphics {
    gpu: RenderContext,
    renderer: SceneRenderer,
}

/// Application state: window, scene, animation and rendering.
pub struct AppState {
    pub config: Config,
    pub window: Option<Arc<Window>>,
    pub viewport: Viewport,
    pub camera: Camera,
    pub scene: EarthScene,
    pub animator: Animator,
    pub frame_loop: FrameLoop,
    graphics: Option<Graphics>,
}

impl AppState {
    /// Assemble the scene for `config`. Nothing touches the GPU until the
    /// event loop resumes.
    pub fn with_config(config: Config) -> Result<Self, terra_scene::SceneError> {
        let scene = EarthScene::build(&config.scene)?;
        let animator = Animator::from_config(&config.animation, &config.scene.moon);
        let frame_loop = FrameLoop::new(
            config.animation.clock_units_per_second,
            config.debug.stats_interval_frames,
        );
        let viewport = Viewport::new(config.window.width, config.window.height, 1.0);
        let camera = camera_from_config(&config, viewport.aspect_ratio());
        Ok(Self {
            config,
            window: None,
            viewport,
            camera,
            scene,
            animator,
            frame_loop,
            graphics: None,
        })
    }

    fn handle_viewport_resize(&mut self, resize: Option<ViewportResize>) {
        let Some(resize) = resize else {
            return;
        };
        let (w, h) = (resize.physical.width, resize.physical.height);

        apply_resize_to_camera(&mut self.camera, &resize);
        if let Some(graphics) = &mut self.graphics {
            graphics.gpu.resize(w, h);
            graphics.renderer.resize(&graphics.gpu.device, w, h);
        }

        info!(
            "Window resized to {}x{} (aspect {:.4}, scale {:.2})",
            w, h, resize.aspect_ratio, resize.scale_factor
        );
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let window = self.window.clone();
        let Self {
            frame_loop,
            animator,
            scene,
            camera,
            viewport,
            graphics,
            ..
        } = self;

        let result = frame_loop.run_frame(
            || {
                if let Some(window) = &window {
                    window.request_redraw();
                }
            },
            |input| {
                animator.advance(scene, input)?;
                let Some(graphics) = graphics.as_mut() else {
                    return Ok(());
                };
                if viewport.is_minimized() {
                    return Ok(());
                }
                graphics.renderer.update(&graphics.gpu.queue, scene, camera)?;
                match graphics.renderer.render(&graphics.gpu) {
                    Err(SurfaceError::Lost) => {
                        let size = viewport.surface_size();
                        warn!("Surface lost, reconfiguring at {}x{}", size.width, size.height);
                        graphics.gpu.resize(size.width, size.height);
                        Ok(())
                    }
                    Err(SurfaceError::Timeout) => {
                        warn!("Surface timeout, skipping frame");
                        Ok(())
                    }
                    other => other.map_err(FrameError::from),
                }
            },
        );

        if let Err(err) = result
            && err.is_fatal()
        {
            error!("Stopping: {err}");
            event_loop.exit();
        }
    }
}

impl ApplicationHandler for AppState {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let attrs = window_attributes_from_config(&self.config);
        let window = match event_loop.create_window(attrs) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                error!("Window creation failed: {e}");
                event_loop.exit();
                return;
            }
        };

        let inner_size = window.inner_size();
        self.viewport = Viewport::new(inner_size.width, inner_size.height, window.scale_factor());
        self.camera.set_aspect_ratio(self.viewport.aspect_ratio());
        info!(
            "Viewport initialized: {}x{} (scale: {:.2})",
            inner_size.width,
            inner_size.height,
            window.scale_factor()
        );

        let gpu = match init_render_context_blocking(window.clone(), self.config.window.vsync) {
            Ok(gpu) => gpu,
            Err(e) => {
                error!("GPU initialization failed: {e}");
                event_loop.exit();
                return;
            }
        };

        let size = self.viewport.surface_size();
        match SceneRenderer::new(
            &gpu,
            &self.scene,
            &self.config.render,
            size.width,
            size.height,
        ) {
            Ok(renderer) => self.graphics = Some(Graphics { gpu, renderer }),
            Err(e) => {
                error!("Scene upload failed: {e}");
                event_loop.exit();
                return;
            }
        }

        // The first frame is requested explicitly; every later one is
        // requested by the frame before it.
        window.request_redraw();
        self.window = Some(window);
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                info!("Close requested, shutting down");
                event_loop.exit();
            }
            WindowEvent::Resized(new_size) => {
                let resize = self
                    .viewport
                    .handle_resize(new_size.width, new_size.height);
                self.handle_viewport_resize(resize);
            }
            WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                // The window size may still be stale here; `Resized` follows.
                self.viewport.set_scale_factor(scale_factor);
                info!("Scale factor changed to {scale_factor:.2}");
            }
            WindowEvent::RedrawRequested => self.redraw(event_loop),
            _ => {}
        }
    }
}

/// Creates an event loop and runs the viewer with the given config.
///
/// This function blocks until the window is closed.
#[instrument(skip(config))]
pub fn run_with_config(config: Config) {
    let mut app = match AppState::with_config(config) {
        Ok(app) => app,
        Err(e) => {
            error!("Scene assembly failed: {e}");
            return;
        }
    };
    let event_loop = EventLoop::new().expect("Failed to create event loop");
    event_loop.run_app(&mut app).expect("Event loop failed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use terra_render::aspect_ratio;
    use terra_scene::FrameInput;

    fn config() -> Config {
        let mut config = Config::default();
        config.scene.sphere_detail = 1;
        config.scene.star_count = 16;
        config
    }

    #[test]
    fn test_window_attributes_from_config() {
        let mut config = Config::default();
        config.window.title = "Globe".to_string();
        let attrs = window_attributes_from_config(&config);
        assert_eq!(attrs.title, "Globe");
        assert!(attrs.fullscreen.is_none());

        config.window.fullscreen = true;
        assert!(window_attributes_from_config(&config).fullscreen.is_some());
    }

    #[test]
    fn test_camera_from_config() {
        let camera = camera_from_config(&Config::default(), 1.5);
        assert_eq!(camera.position, Vec3::new(0.0, 0.0, 5.0));
        assert_eq!(camera.aspect_ratio, 1.5);
        assert_eq!(camera.near, 0.1);
        assert_eq!(camera.far, 1000.0);
    }

    #[test]
    fn test_every_resize_sets_exact_aspect() {
        let config = Config::default();
        let mut viewport = Viewport::new(1280, 720, 1.0);
        let mut camera = camera_from_config(&config, viewport.aspect_ratio());

        for (w, h) in [(800, 600), (800, 600), (1920, 1080), (333, 777)] {
            let resize = viewport.handle_resize(w, h).unwrap();
            apply_resize_to_camera(&mut camera, &resize);
            assert_eq!(camera.aspect_ratio, aspect_ratio(w, h));
            let mut expected = camera.clone();
            expected.update_projection_matrix();
            assert_eq!(camera.projection_matrix(), expected.projection_matrix());
        }
        assert_eq!(viewport.resize_count(), 4);
    }

    #[test]
    fn test_minimize_leaves_camera_alone() {
        let mut app = AppState::with_config(config()).unwrap();
        let before = app.camera.aspect_ratio;
        let resize = app.viewport.handle_resize(0, 0);
        app.handle_viewport_resize(resize);
        assert_eq!(app.camera.aspect_ratio, before);
        assert!(app.viewport.is_minimized());
    }

    #[test]
    fn test_resize_without_gpu_updates_camera() {
        let mut app = AppState::with_config(config()).unwrap();
        let resize = app.viewport.handle_resize(1000, 500);
        app.handle_viewport_resize(resize);
        assert_eq!(app.camera.aspect_ratio, 2.0);
    }

    #[test]
    fn test_scale_change_leaves_camera_until_resize() {
        let mut app = AppState::with_config(config()).unwrap();
        let before = app.camera.aspect_ratio;
        app.viewport.set_scale_factor(2.0);
        assert_eq!(app.camera.aspect_ratio, before);

        let resize = app.viewport.handle_resize(2560, 1440);
        app.handle_viewport_resize(resize);
        assert_eq!(app.camera.aspect_ratio, aspect_ratio(2560, 1440));
        assert_eq!(app.viewport.scale_factor(), 2.0);
    }

    #[test]
    fn test_resize_does_not_disturb_animation() {
        let mut app = AppState::with_config(config()).unwrap();
        app.animator
            .advance(&mut app.scene, FrameInput::at(0.0))
            .unwrap();
        let angles = app.animator.angles();
        let resize = app.viewport.handle_resize(640, 480);
        app.handle_viewport_resize(resize);
        assert_eq!(app.animator.angles(), angles);
        assert_eq!(app.animator.frames(), 1);
    }
}
