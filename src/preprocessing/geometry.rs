//! # Crop Geometry
//!
//! Normalized crop rectangles and the pure transitions used by the
//! interactive crop engine. Every coordinate here is a fraction (0..1) of
//! the image's natural width or height, so the math is independent of the
//! on-screen display scale.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Smallest width/height a resize handle may produce (1% of the image).
pub const MIN_REGION_SIZE: f64 = 0.01;

/// Slack allowed when checking bounds after floating point arithmetic.
pub const BOUNDS_EPSILON: f64 = 1e-9;

/// Relative tolerance under which a region already satisfies a ratio.
const RATIO_TOLERANCE: f64 = 1e-9;

/// A rectangle in normalized image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CropRegion {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl CropRegion {
    /// The whole image.
    pub const FULL: CropRegion = CropRegion {
        x: 0.0,
        y: 0.0,
        width: 1.0,
        height: 1.0,
    };

    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Bounding box of two points, with min/max swapped so the size is never negative.
    pub fn from_corners(a: NormalizedPoint, b: NormalizedPoint) -> Self {
        let (x1, x2) = if b.x < a.x { (b.x, a.x) } else { (a.x, b.x) };
        let (y1, y2) = if b.y < a.y { (b.y, a.y) } else { (a.y, b.y) };
        Self::new(x1, y1, x2 - x1, y2 - y1)
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Checks `0 <= x,y <= 1`, `x + width <= 1`, `y + height <= 1` and non-negative size.
    pub fn is_within_bounds(&self) -> bool {
        let in_unit = |v: f64| (-BOUNDS_EPSILON..=1.0 + BOUNDS_EPSILON).contains(&v);
        in_unit(self.x)
            && in_unit(self.y)
            && self.width >= 0.0
            && self.height >= 0.0
            && self.right() <= 1.0 + BOUNDS_EPSILON
            && self.bottom() <= 1.0 + BOUNDS_EPSILON
    }

    /// Width-to-height ratio in natural pixels, `None` for a zero-height region.
    pub fn pixel_aspect_ratio(&self, natural_width: u32, natural_height: u32) -> Option<f64> {
        let h = self.height * natural_height as f64;
        if h <= 0.0 {
            return None;
        }
        Some(self.width * natural_width as f64 / h)
    }
}

impl Default for CropRegion {
    fn default() -> Self {
        Self::FULL
    }
}

impl fmt::Display for CropRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({:.4}, {:.4}, {:.4}x{:.4})",
            self.x, self.y, self.width, self.height
        )
    }
}

/// A pointer position in normalized image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct NormalizedPoint {
    pub x: f64,
    pub y: f64,
}

impl NormalizedPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Clamps both axes into [0, 1]. NaN collapses to 0.
    pub fn clamped(self) -> Self {
        let clamp = |v: f64| if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) };
        Self::new(clamp(self.x), clamp(self.y))
    }
}

/// The part of the crop overlay a gesture started on.
///
/// `Move` draws a fresh rectangle from the press point to the pointer;
/// the other eight resize the existing region by moving the named edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Handle {
    Move,
    N,
    S,
    E,
    W,
    NE,
    NW,
    SE,
    SW,
}

impl Handle {
    pub const RESIZE_HANDLES: [Handle; 8] = [
        Handle::N,
        Handle::S,
        Handle::E,
        Handle::W,
        Handle::NE,
        Handle::NW,
        Handle::SE,
        Handle::SW,
    ];

    pub fn moves_north(self) -> bool {
        matches!(self, Handle::N | Handle::NE | Handle::NW)
    }

    pub fn moves_south(self) -> bool {
        matches!(self, Handle::S | Handle::SE | Handle::SW)
    }

    pub fn moves_east(self) -> bool {
        matches!(self, Handle::E | Handle::NE | Handle::SE)
    }

    pub fn moves_west(self) -> bool {
        matches!(self, Handle::W | Handle::NW | Handle::SW)
    }

    /// Edges that stay put while this handle is dragged.
    pub fn anchored_edges(self) -> AnchoredEdges {
        AnchoredEdges {
            right: self.moves_west(),
            bottom: self.moves_north(),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Handle::Move => "move",
            Handle::N => "n",
            Handle::S => "s",
            Handle::E => "e",
            Handle::W => "w",
            Handle::NE => "ne",
            Handle::NW => "nw",
            Handle::SE => "se",
            Handle::SW => "sw",
        }
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Handle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "move" => Ok(Handle::Move),
            "n" => Ok(Handle::N),
            "s" => Ok(Handle::S),
            "e" => Ok(Handle::E),
            "w" => Ok(Handle::W),
            "ne" => Ok(Handle::NE),
            "nw" => Ok(Handle::NW),
            "se" => Ok(Handle::SE),
            "sw" => Ok(Handle::SW),
            other => Err(format!("Unknown crop handle: '{}'", other)),
        }
    }
}

/// Which of the far edges must keep their position during reprojection.
///
/// The top and left edges are kept by default; setting a flag keeps the
/// opposite edge instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AnchoredEdges {
    pub right: bool,
    pub bottom: bool,
}

/// Moves the edges named by `handle` by `(dx, dy)`, leaving the others fixed.
///
/// Moving edges stop `min_size` short of the opposite edge and at the image
/// border. A region already narrower than `min_size` against the border
/// keeps its size rather than growing past the anchored edge.
/// `Handle::Move` is not a resize and returns the region unchanged; new
/// rectangles come from [`CropRegion::from_corners`].
pub fn apply_delta(region: CropRegion, handle: Handle, dx: f64, dy: f64, min_size: f64) -> CropRegion {
    if handle == Handle::Move {
        return region;
    }

    let mut left = region.x;
    let mut right = region.right();
    let mut top = region.y;
    let mut bottom = region.bottom();

    if handle.moves_west() {
        left = (left + dx).min(right - min_size).max(0.0);
    }
    if handle.moves_east() {
        right = (right + dx).max(left + min_size).min(1.0);
    }
    if handle.moves_north() {
        top = (top + dy).min(bottom - min_size).max(0.0);
    }
    if handle.moves_south() {
        bottom = (bottom + dy).max(top + min_size).min(1.0);
    }

    CropRegion::new(left, top, (right - left).max(0.0), (bottom - top).max(0.0))
}

/// Forces a region inside the unit square: origin clamped to [0, 1], size
/// trimmed so the far edges do not pass 1, and never negative.
/// Non-finite components (NaN, infinities) collapse to 0 first.
pub fn clamp_to_bounds(region: CropRegion) -> CropRegion {
    let finite = |v: f64| if v.is_finite() { v } else { 0.0 };
    let x = finite(region.x).clamp(0.0, 1.0);
    let y = finite(region.y).clamp(0.0, 1.0);
    let width = finite(region.width).min(1.0 - x).max(0.0);
    let height = finite(region.height).min(1.0 - y).max(0.0);
    CropRegion::new(x, y, width, height)
}

/// Shrinks width or height so that `width*W / (height*H) == ratio`.
///
/// Height is reduced when the region is too tall for the ratio, width
/// otherwise; the region never grows. The top-left corner stays where it is
/// unless `anchored` pins the right or bottom edge. Non-positive or
/// non-finite ratios and zero natural sizes leave the region unchanged, as
/// does a region that already matches the ratio.
pub fn reproject_aspect_ratio(
    region: CropRegion,
    ratio: f64,
    natural_width: u32,
    natural_height: u32,
    anchored: AnchoredEdges,
) -> CropRegion {
    if !ratio.is_finite() || ratio <= 0.0 || natural_width == 0 || natural_height == 0 {
        return region;
    }

    if let Some(current) = region.pixel_aspect_ratio(natural_width, natural_height) {
        if (current - ratio).abs() <= ratio * RATIO_TOLERANCE {
            return region;
        }
    }

    let nw = natural_width as f64;
    let nh = natural_height as f64;
    let mut width = region.width;
    let mut height = region.height;

    let target_height = (width * nw) / (ratio * nh);
    if target_height <= height {
        height = target_height;
    } else {
        width = (height * ratio * nh) / nw;
    }

    let mut x = if anchored.right {
        region.right() - width
    } else {
        region.x
    };
    let mut y = if anchored.bottom {
        region.bottom() - height
    } else {
        region.y
    };

    if x + width > 1.0 {
        x = (1.0 - width).max(0.0);
    }
    if y + height > 1.0 {
        y = (1.0 - height).max(0.0);
    }

    CropRegion::new(x, y, width, height)
}
