//! Mapping between the displayed (scaled) image and normalized coordinates.

use super::geometry::{CropRegion, NormalizedPoint};

/// How an image of natural size is fitted into a display container.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayViewport {
    pub scale: f64,
    pub display_width: f64,
    pub display_height: f64,
}

impl DisplayViewport {
    /// Largest uniform scale that fits the image inside the container.
    ///
    /// Returns `None` if any dimension is zero or negative.
    pub fn fit(
        container_width: f64,
        container_height: f64,
        natural_width: u32,
        natural_height: u32,
    ) -> Option<Self> {
        if container_width <= 0.0 || container_height <= 0.0 || natural_width == 0 || natural_height == 0 {
            return None;
        }
        let nw = natural_width as f64;
        let nh = natural_height as f64;
        let scale = (container_width / nw).min(container_height / nh);
        Some(Self {
            scale,
            display_width: nw * scale,
            display_height: nh * scale,
        })
    }

    /// Converts a position relative to the displayed image's top-left corner.
    pub fn to_normalized(&self, local_x: f64, local_y: f64) -> NormalizedPoint {
        NormalizedPoint::new(local_x / self.display_width, local_y / self.display_height).clamped()
    }

    /// Displayed pixel rectangle `(left, top, width, height)` of a region.
    pub fn to_display(&self, region: &CropRegion) -> (f64, f64, f64, f64) {
        (
            region.x * self.display_width,
            region.y * self.display_height,
            region.width * self.display_width,
            region.height * self.display_height,
        )
    }
}
