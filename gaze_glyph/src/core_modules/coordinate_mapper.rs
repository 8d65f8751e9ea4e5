// THEORY:
// The `CoordinateMapper` is the bridge between the fixed logical data space (800x600,
// origin bottom-left) and whatever rectangle the image currently occupies on screen
// (origin top-left). It is a pure, stateless utility: the display size is passed on
// every call, so a resized element can never be served by stale scale factors.
//
// Scaling is independent per axis. Aspect distortion is accepted, not corrected.

use crate::config::DataSpace;
use crate::core_modules::records::{Point, Rect};
use crate::error::{GlyphError, GlyphResult};
use serde::{Deserialize, Serialize};

/// The size of the rendered image element, in display pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DisplaySize {
    width: f64,
    height: f64,
}

impl DisplaySize {
    pub fn new(width: f64, height: f64) -> GlyphResult<Self> {
        if width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0 {
            Ok(Self { width, height })
        } else {
            Err(GlyphError::InvalidDisplay { width, height })
        }
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    /// Whole-pixel raster dimensions covering the display rectangle.
    pub fn pixel_dimensions(&self) -> (u32, u32) {
        (self.width.ceil() as u32, self.height.ceil() as u32)
    }
}

/// Converts points between data space and display space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateMapper {
    space: DataSpace,
}

impl Default for CoordinateMapper {
    fn default() -> Self {
        Self::new(DataSpace::default())
    }
}

impl CoordinateMapper {
    pub fn new(space: DataSpace) -> Self {
        Self { space }
    }

    pub fn data_space(&self) -> DataSpace {
        self.space
    }

    /// Horizontal and vertical display pixels per data unit.
    pub fn scale(&self, display: DisplaySize) -> (f64, f64) {
        (
            display.width / self.space.width,
            display.height / self.space.height,
        )
    }

    /// Data space to display space, inverting the vertical axis.
    pub fn to_display(&self, point: Point, display: DisplaySize) -> Point {
        let (scale_x, scale_y) = self.scale(display);
        Point {
            x: point.x * scale_x,
            y: (self.space.height - point.y) * scale_y,
        }
    }

    /// Display space back to data space.
    pub fn to_data(&self, point: Point, display: DisplaySize) -> Point {
        let (scale_x, scale_y) = self.scale(display);
        Point {
            x: point.x / scale_x,
            y: self.space.height - point.y / scale_y,
        }
    }

    /// Converts a brush drawn on screen from `(x0, y0)` (top-left) to `(x1, y1)`
    /// (bottom-right) into a whole-unit data-space rectangle.
    pub fn brush_to_data(&self, x0: f64, y0: f64, x1: f64, y1: f64, display: DisplaySize) -> Rect {
        let data_per_px_x = self.space.width / display.width;
        let data_per_px_y = self.space.height / display.height;
        Rect {
            x: round_half_up(x0 * data_per_px_x),
            y: round_half_up(self.space.height - y1 * data_per_px_y),
            width: round_half_up((x1 - x0) * data_per_px_x),
            height: round_half_up((y1 - y0) * data_per_px_y),
        }
    }
}

/// Rounds to the nearest integer, ties toward positive infinity.
pub(crate) fn round_half_up(value: f64) -> f64 {
    (value + 0.5).floor()
}
