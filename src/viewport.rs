//! Window size bookkeeping.

use crate::{camera::PerspectiveCamera, config::ViewportConfig};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    /// Logical size.
    pub width: u32,
    pub height: u32,
    /// Device pixels per logical pixel, capped at `max_pixel_ratio`.
    pub pixel_ratio: f32,
    pub max_pixel_ratio: f32,
}

impl Viewport {
    pub fn new(config: &ViewportConfig) -> Self {
        Self {
            width: config.width.max(1),
            height: config.height.max(1),
            pixel_ratio: 1.0,
            max_pixel_ratio: config.max_pixel_ratio,
        }
    }

    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height as f32
    }

    /// Size of the drawing buffer in physical pixels.
    pub fn physical_size(&self) -> (u32, u32) {
        (
            (self.width as f32 * self.pixel_ratio).round().max(1.0) as u32,
            (self.height as f32 * self.pixel_ratio).round().max(1.0) as u32,
        )
    }

    /**
     * Adapts the camera and the drawing buffer to a new logical window size.
     *
     * Returns the drawing-buffer size to configure the surface with, or `None` when the
     * request is zero-sized (e.g. a minimised window) and nothing changed.
     */
    pub fn resize(
        &mut self,
        camera: &mut PerspectiveCamera,
        width: u32,
        height: u32,
        device_pixel_ratio: f32,
    ) -> Option<(u32, u32)> {
        if width == 0 || height == 0 {
            log::debug!("Ignoring resize to {width}x{height}");
            return None;
        }
        self.width = width;
        self.height = height;
        self.pixel_ratio = device_pixel_ratio.min(self.max_pixel_ratio).max(f32::MIN_POSITIVE);
        camera.aspect = self.aspect();
        camera.update_projection_matrix();
        Some(self.physical_size())
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(&ViewportConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CameraConfig;
    use approx::assert_relative_eq;

    #[test]
    fn retina_displays_are_capped() {
        let mut viewport = Viewport::default();
        let mut camera = PerspectiveCamera::from_config(&CameraConfig::default(), 1.0);
        let size = viewport.resize(&mut camera, 800, 600, 3.0);
        assert_eq!(size, Some((1600, 1200)));
        assert_eq!(viewport.pixel_ratio, 2.0);
        assert_relative_eq!(camera.aspect, 800.0 / 600.0);
    }

    #[test]
    fn fractional_ratios_round_the_buffer() {
        let mut viewport = Viewport::default();
        let mut camera = PerspectiveCamera::from_config(&CameraConfig::default(), 1.0);
        assert_eq!(viewport.resize(&mut camera, 101, 51, 1.5), Some((152, 77)));
    }
}
