use log::{debug, warn};

/// Cached viewport size in pixels. Re-queried on resize, read between frames only.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    width: f32,
    height: f32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Option<Self> {
        if width == 0 || height == 0 {
            return None;
        }
        Some(Self { width: width as f32, height: height as f32 })
    }

    #[inline(always)] pub fn width(&self) -> f32 { self.width }
    #[inline(always)] pub fn height(&self) -> f32 { self.height }
    #[inline(always)] pub fn center_x(&self) -> f32 { 0.5 * self.width }
    #[inline(always)] pub fn center_y(&self) -> f32 { 0.5 * self.height }

    /// Applies a resize event. Zero-sized reports (minimised windows) are ignored.
    pub fn resize(&mut self, width: u32, height: u32) -> bool {
        match Self::new(width, height) {
            Some(v) => {
                debug!("Viewport {}x{} -> {}x{}", self.width, self.height, width, height);
                *self = v;
                true
            }
            None => {
                warn!("Ignoring resize to empty viewport {}x{}.", width, height);
                false
            }
        }
    }

    /// True if `(x, y)` lies within the viewport grown by `margin` on every side.
    #[inline(always)]
    pub fn contains_with_margin(&self, x: f32, y: f32, margin: f32) -> bool {
        x >= -margin && x <= self.width + margin && y >= -margin && y <= self.height + margin
    }
}
