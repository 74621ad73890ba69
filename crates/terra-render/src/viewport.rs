//! Viewport tracking and resize forwarding.
//!
//! The viewport always reports physical pixels. Every non-zero resize event
//! yields a fresh [`ViewportResize`] carrying `width / height` as the aspect
//! ratio, even when the size did not change, so consumers never hold on to a
//! stale ratio. A zero-size event (minimized window) is recorded but not
//! forwarded: there is nothing to render into.

/// Physical pixel dimensions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PhysicalSize {
    pub width: u32,
    pub height: u32,
}

/// Forwarded resize: new surface size plus the aspect ratio derived from it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewportResize {
    pub physical: PhysicalSize,
    /// Exactly `width as f32 / height as f32`.
    pub aspect_ratio: f32,
    pub scale_factor: f64,
}

/// Aspect ratio of a `width x height` viewport.
pub fn aspect_ratio(width: u32, height: u32) -> f32 {
    width as f32 / height as f32
}

/// Current window dimensions as the renderer sees them.
#[derive(Clone, Debug)]
pub struct Viewport {
    width: u32,
    height: u32,
    scale_factor: f64,
    minimized: bool,
    resize_count: u64,
}

impl Viewport {
    /// Start from the window's initial physical size. A zero dimension marks
    /// the viewport as minimized until the first real resize arrives.
    pub fn new(width: u32, height: u32, scale_factor: f64) -> Self {
        Self {
            width,
            height,
            scale_factor,
            minimized: width == 0 || height == 0,
            resize_count: 0,
        }
    }

    /// Record a resize. Returns the event to forward to the camera and the
    /// surface, or `None` while the window has no area.
    pub fn handle_resize(&mut self, width: u32, height: u32) -> Option<ViewportResize> {
        self.width = width;
        self.height = height;
        self.minimized = width == 0 || height == 0;
        if self.minimized {
            log::debug!("Viewport minimized ({width}x{height}), resize not forwarded");
            return None;
        }
        self.resize_count += 1;
        Some(ViewportResize {
            physical: PhysicalSize { width, height },
            aspect_ratio: aspect_ratio(width, height),
            scale_factor: self.scale_factor,
        })
    }

    /// Record a DPI change. The new physical size arrives with the resize
    /// event that follows, which reports this scale.
    pub fn set_scale_factor(&mut self, scale_factor: f64) {
        self.scale_factor = scale_factor;
    }

    /// Size to configure the surface with, never zero.
    pub fn surface_size(&self) -> PhysicalSize {
        PhysicalSize {
            width: self.width.max(1),
            height: self.height.max(1),
        }
    }

    /// Raw physical size as last reported, possibly zero.
    pub fn physical_size(&self) -> PhysicalSize {
        PhysicalSize {
            width: self.width,
            height: self.height,
        }
    }

    /// Aspect ratio of the current surface size.
    pub fn aspect_ratio(&self) -> f32 {
        let size = self.surface_size();
        aspect_ratio(size.width, size.height)
    }

    pub fn scale_factor(&self) -> f64 {
        self.scale_factor
    }

    pub fn is_minimized(&self) -> bool {
        self.minimized
    }

    /// Number of resize events forwarded so far.
    pub fn resize_count(&self) -> u64 {
        self.resize_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn size(width: u32, height: u32) -> PhysicalSize {
        PhysicalSize { width, height }
    }

    #[test]
    fn test_aspect_is_width_over_height() {
        let mut viewport = Viewport::new(1280, 720, 1.0);
        let resize = viewport.handle_resize(1920, 1080).unwrap();
        assert_eq!(resize.aspect_ratio, 1920.0 / 1080.0);
        assert_eq!(resize.physical, size(1920, 1080));
    }

    #[test]
    fn test_odd_sizes_are_exact() {
        let mut viewport = Viewport::new(1, 1, 1.0);
        for (w, h) in [(1001, 7), (3, 2000), (4096, 4095), (1, 1)] {
            let resize = viewport.handle_resize(w, h).unwrap();
            assert_eq!(resize.aspect_ratio, w as f32 / h as f32);
        }
    }

    #[test]
    fn test_same_size_is_still_forwarded() {
        let mut viewport = Viewport::new(800, 600, 1.0);
        assert!(viewport.handle_resize(800, 600).is_some());
        assert!(viewport.handle_resize(800, 600).is_some());
        assert_eq!(viewport.resize_count(), 2);
    }

    #[test]
    fn test_minimize_is_recorded_not_forwarded() {
        let mut viewport = Viewport::new(800, 600, 1.0);
        assert!(viewport.handle_resize(0, 0).is_none());
        assert!(viewport.is_minimized());
        assert_eq!(viewport.physical_size(), size(0, 0));
        assert_eq!(viewport.surface_size(), size(1, 1));
        assert!(viewport.handle_resize(1024, 0).is_none());

        let restored = viewport.handle_resize(1024, 768).unwrap();
        assert!(!viewport.is_minimized());
        assert_eq!(restored.aspect_ratio, 1024.0 / 768.0);
        assert_eq!(viewport.resize_count(), 1);
    }

    #[test]
    fn test_zero_initial_size_starts_minimized() {
        let viewport = Viewport::new(0, 0, 1.0);
        assert!(viewport.is_minimized());
        assert!(viewport.aspect_ratio().is_finite());
    }

    #[test]
    fn test_scale_factor_change_waits_for_resize() {
        let mut viewport = Viewport::new(1920, 1080, 1.0);
        viewport.set_scale_factor(2.0);
        assert_eq!(viewport.scale_factor(), 2.0);
        assert_eq!(viewport.physical_size(), size(1920, 1080));
        assert_eq!(viewport.resize_count(), 0);

        let resize = viewport.handle_resize(3840, 2160).unwrap();
        assert_eq!(resize.scale_factor, 2.0);
        assert_eq!(resize.physical, size(3840, 2160));
        assert_eq!(resize.aspect_ratio, 3840.0 / 2160.0);
    }
}
