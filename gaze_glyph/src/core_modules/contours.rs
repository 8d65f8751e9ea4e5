// THEORY:
// Density contours are the line-art sibling of the heatmap. The same accumulate and blur
// steps run at display resolution (one cell per display pixel) with the contour
// bandwidth as sigma, and iso-lines are traced through the smoothed grid with marching
// squares.
//
// Key architectural principles:
// 1.  **Relative levels**: thresholds are evenly spaced fractions of the grid's own peak,
//     `peak * k / (levels + 1)` for `k = 1..=levels`, so every non-empty selection gets
//     the same number of rings regardless of how many points it holds.
// 2.  **Segments, not paths**: each grid square emits zero, one or two line segments in
//     display coordinates. Stitching them into polylines is the renderer's business.
// 3.  **Saddles**: the two ambiguous marching-squares cases are resolved by the average
//     of the four corners, which keeps the output deterministic.

use crate::config::{ContourConfig, EngineConfig};
use crate::core_modules::coordinate_mapper::{CoordinateMapper, DisplaySize};
use crate::core_modules::density_grid::DensityGrid;
use crate::core_modules::heatmap::DataType;
use crate::core_modules::records::Point;
use crate::error::GlyphResult;
use image::Rgba;
use serde::Serialize;

/// A straight piece of an iso-line, in display pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Segment {
    pub from: Point,
    pub to: Point,
}

/// All segments at one density threshold.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContourLevel {
    pub threshold: f64,
    pub segments: Vec<Segment>,
}

/// The contour overlay for one record set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContourSet {
    pub data_type: DataType,
    /// RGBA stroke color.
    pub stroke: [u8; 4],
    pub levels: Vec<ContourLevel>,
}

impl ContourSet {
    pub fn is_empty(&self) -> bool {
        self.levels.iter().all(|level| level.segments.is_empty())
    }

    pub fn segment_count(&self) -> usize {
        self.levels.iter().map(|level| level.segments.len()).sum()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ContourRenderer {
    mapper: CoordinateMapper,
    config: ContourConfig,
}

impl ContourRenderer {
    pub fn new(config: &EngineConfig) -> GlyphResult<Self> {
        config.data_space.validate()?;
        config.contours.validate()?;
        Ok(Self {
            mapper: CoordinateMapper::new(config.data_space),
            config: config.contours,
        })
    }

    pub fn render(&self, points: &[Point], display: DisplaySize, data_type: DataType) -> ContourSet {
        let Rgba(stroke) = data_type.accent_color();
        let mut set = ContourSet {
            data_type,
            stroke,
            levels: Vec::new(),
        };
        if points.is_empty() {
            return set;
        }

        let (grid, _) = DensityGrid::accumulate(points.iter().copied(), &self.mapper, display, 1.0);
        let smoothed = grid.blurred(self.config.bandwidth);
        let peak = smoothed.max();
        if peak == 0.0 {
            return set;
        }

        let steps = (self.config.levels + 1) as f64;
        set.levels = (1..=self.config.levels)
            .map(|k| {
                let threshold = peak * k as f64 / steps;
                ContourLevel {
                    threshold,
                    segments: iso_segments(&smoothed, threshold),
                }
            })
            .collect();
        log::debug!(
            "{} contour levels, {} segments",
            set.levels.len(),
            set.segment_count()
        );
        set
    }
}

/// Traces the iso-line at `threshold` through `grid` with marching squares. Cell `(x, y)`
/// sits at coordinate `(x, y)`; corners at or above the threshold count as inside.
pub fn iso_segments(grid: &DensityGrid, threshold: f64) -> Vec<Segment> {
    let mut segments = Vec::new();
    if grid.width() < 2 || grid.height() < 2 {
        return segments;
    }
    let value = |x: usize, y: usize| grid.cells()[y * grid.width() + x];

    for y in 0..grid.height() - 1 {
        for x in 0..grid.width() - 1 {
            let tl = value(x, y);
            let tr = value(x + 1, y);
            let br = value(x + 1, y + 1);
            let bl = value(x, y + 1);
            let case = (usize::from(tl >= threshold) << 3)
                | (usize::from(tr >= threshold) << 2)
                | (usize::from(br >= threshold) << 1)
                | usize::from(bl >= threshold);
            if case == 0 || case == 15 {
                continue;
            }

            let (fx, fy) = (x as f64, y as f64);
            let crossing = |a: f64, b: f64| {
                let t = (threshold - a) / (b - a);
                if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.5 }
            };
            let top = Point::new(fx + crossing(tl, tr), fy);
            let right = Point::new(fx + 1.0, fy + crossing(tr, br));
            let bottom = Point::new(fx + crossing(bl, br), fy + 1.0);
            let left = Point::new(fx, fy + crossing(tl, bl));
            let centre_inside = (tl + tr + br + bl) / 4.0 >= threshold;

            let mut push = |from: Point, to: Point| segments.push(Segment { from, to });
            match case {
                1 | 14 => push(left, bottom),
                2 | 13 => push(bottom, right),
                3 | 12 => push(left, right),
                4 | 11 => push(top, right),
                6 | 9 => push(top, bottom),
                7 | 8 => push(top, left),
                5 if centre_inside => {
                    push(left, top);
                    push(bottom, right);
                }
                5 => {
                    push(top, right);
                    push(left, bottom);
                }
                10 if centre_inside => {
                    push(top, right);
                    push(left, bottom);
                }
                _ => {
                    push(left, top);
                    push(bottom, right);
                }
            }
        }
    }
    segments
}
