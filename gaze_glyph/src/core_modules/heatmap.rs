// THEORY:
// The `HeatmapRenderer` is the raster end of the density pipeline. It owns no state
// beyond its validated tuning: every `render` call builds a fresh `DensityGrid`, blurs
// it, normalizes it against its own peak and colorizes it, then hands back an RGBA
// raster sized to the display.
//
// Key architectural principles:
// 1.  **Resample the field, not the colors**: the normalized density is resampled to the
//     display size with a smooth (triangle) filter and only then colorized, once per
//     display pixel. Every visible pixel is therefore an exact colormap output and the
//     threshold edge never blends a color with the black of transparent cells.
// 2.  **Empty is not an error**: no points (or no in-bounds points) yields a fully
//     transparent raster of the display size.
// 3.  **Data type is cosmetic**: gaze vs fixations only picks the accent color that
//     neighbouring overlays use. It never changes a number.

use crate::config::{EngineConfig, HeatmapConfig};
use crate::core_modules::colormap::{JetColormap, TRANSPARENT};
use crate::core_modules::coordinate_mapper::{CoordinateMapper, DisplaySize};
use crate::core_modules::density_grid::{AccumulationStats, DensityGrid, DensityMetrics};
use crate::core_modules::records::Point;
use crate::error::GlyphResult;
use image::{ImageBuffer, Luma, Rgba, RgbaImage, imageops};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Which record set an overlay was computed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    #[default]
    Gaze,
    Fixations,
}

impl DataType {
    /// Stroke color used for outlines drawn next to the heatmap.
    pub fn accent_color(&self) -> Rgba<u8> {
        match self {
            DataType::Gaze => Rgba([255, 0, 0, 255]),
            DataType::Fixations => Rgba([255, 165, 0, 255]),
        }
    }
}

/// A rendered heatmap layer.
#[derive(Debug, Clone)]
pub struct Heatmap {
    pub raster: RgbaImage,
    pub data_type: DataType,
    /// Peak of the blurred grid before normalization; zero means "no data".
    pub peak: f64,
    pub stats: AccumulationStats,
    /// Coverage and entropy of the blurred grid.
    pub metrics: DensityMetrics,
}

impl Heatmap {
    pub fn is_empty(&self) -> bool {
        self.peak == 0.0
    }

    pub fn save_png(&self, path: impl AsRef<Path>) -> GlyphResult<()> {
        save_png(&self.raster, path)
    }
}

/// Builds heatmap rasters from data-space points.
#[derive(Debug, Clone, Copy)]
pub struct HeatmapRenderer {
    mapper: CoordinateMapper,
    config: HeatmapConfig,
    colormap: JetColormap,
}

impl HeatmapRenderer {
    /// Validates the heatmap section before accepting it.
    pub fn new(config: &EngineConfig) -> GlyphResult<Self> {
        config.data_space.validate()?;
        config.heatmap.validate()?;
        Ok(Self {
            mapper: CoordinateMapper::new(config.data_space),
            config: config.heatmap,
            colormap: JetColormap::from_config(&config.heatmap),
        })
    }

    pub fn config(&self) -> &HeatmapConfig {
        &self.config
    }

    pub fn render(&self, points: &[Point], display: DisplaySize, data_type: DataType) -> Heatmap {
        let (out_w, out_h) = display.pixel_dimensions();
        if points.is_empty() {
            return blank(out_w, out_h, data_type, AccumulationStats::default());
        }

        let (grid, stats) = DensityGrid::accumulate(
            points.iter().copied(),
            &self.mapper,
            display,
            self.config.resolution,
        );
        let blurred = grid.blurred(self.config.sigma);
        let peak = blurred.max();
        if peak == 0.0 {
            return blank(out_w, out_h, data_type, stats);
        }

        let normalized = blurred.normalized();
        let grid_w = blurred.width() as u32;
        let grid_h = blurred.height() as u32;
        let density: ImageBuffer<Luma<f32>, Vec<f32>> =
            ImageBuffer::from_fn(grid_w, grid_h, |x, y| {
                Luma([normalized[y as usize * blurred.width() + x as usize] as f32])
            });
        let density = if (grid_w, grid_h) == (out_w, out_h) {
            density
        } else {
            imageops::resize(&density, out_w, out_h, imageops::FilterType::Triangle)
        };
        let raster: RgbaImage = ImageBuffer::from_fn(out_w, out_h, |x, y| {
            self.colormap.color_of(f64::from(density.get_pixel(x, y).0[0]))
        });

        let metrics = blurred.metrics();
        log::debug!(
            "heatmap {}x{} -> {}x{}, peak {:.4}, {:?}",
            grid_w,
            grid_h,
            out_w,
            out_h,
            peak,
            metrics
        );

        Heatmap {
            raster,
            data_type,
            peak,
            stats,
            metrics,
        }
    }
}

fn blank(width: u32, height: u32, data_type: DataType, stats: AccumulationStats) -> Heatmap {
    Heatmap {
        raster: ImageBuffer::from_pixel(width, height, TRANSPARENT),
        data_type,
        peak: 0.0,
        stats,
        metrics: DensityMetrics::default(),
    }
}

/// Writes an RGBA raster as a PNG file.
pub fn save_png(raster: &RgbaImage, path: impl AsRef<Path>) -> GlyphResult<()> {
    raster.save_with_format(path, image::ImageFormat::Png)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn renderer() -> HeatmapRenderer {
        HeatmapRenderer::new(&EngineConfig::default()).unwrap()
    }

    #[test]
    fn empty_points_give_a_transparent_display_sized_raster() {
        let heatmap = renderer().render(&[], DisplaySize::new(40.5, 30.0).unwrap(), DataType::Gaze);
        assert!(heatmap.is_empty());
        assert_eq!(heatmap.metrics, DensityMetrics::default());
        assert_eq!(heatmap.raster.dimensions(), (41, 30));
        assert!(heatmap.raster.pixels().all(|p| *p == TRANSPARENT));
    }

    #[test]
    fn all_points_off_grid_is_still_blank() {
        let heatmap = renderer().render(
            &[Point::new(-500.0, 300.0)],
            DisplaySize::new(80.0, 60.0).unwrap(),
            DataType::Fixations,
        );
        assert!(heatmap.is_empty());
        assert_eq!(heatmap.stats.dropped, 1);
        assert!(heatmap.raster.pixels().all(|p| *p == TRANSPARENT));
    }

    #[test]
    fn a_single_point_peaks_at_its_location() {
        let mut config = EngineConfig::default();
        config.heatmap.resolution = 1.0;
        config.heatmap.sigma = 3.0;
        let renderer = HeatmapRenderer::new(&config).unwrap();
        // Display equals data space, so the raster is not resampled.
        let heatmap = renderer.render(
            &[Point::new(400.0, 300.0)],
            DisplaySize::new(800.0, 600.0).unwrap(),
            DataType::Gaze,
        );
        assert!(!heatmap.is_empty());
        assert_eq!(heatmap.raster.dimensions(), (800, 600));
        let centre = heatmap.raster.get_pixel(400, 300);
        assert_eq!(centre.0[..3], [128, 0, 0]);
        assert_eq!(*heatmap.raster.get_pixel(0, 0), TRANSPARENT);
    }

    #[test]
    fn resampled_edges_only_hold_colormap_colors() {
        let floor = JetColormap::default().color_of(0.08);
        let points = vec![Point::new(400.0, 300.0); 10];
        // Downscaled (R = 2) and upscaled (R = 0.5) grids.
        for resolution in [2.0, 0.5] {
            let mut config = EngineConfig::default();
            config.heatmap.resolution = resolution;
            config.heatmap.sigma = 5.0;
            let renderer = HeatmapRenderer::new(&config).unwrap();
            let heatmap = renderer.render(&points, DisplaySize::new(100.0, 75.0).unwrap(), DataType::Gaze);
            assert_eq!(heatmap.raster.dimensions(), (100, 75));

            let visible: Vec<&Rgba<u8>> = heatmap.raster.pixels().filter(|p| p.0[3] > 0).collect();
            assert!(!visible.is_empty());
            for pixel in visible {
                let [r, g, b, a] = pixel.0;
                assert!(b >= 128 || r >= 128 || g > 0, "fringe pixel {pixel:?} at R = {resolution}");
                assert!(a >= floor.0[3], "pixel {pixel:?} fainter than the threshold color");
            }
        }
    }

    #[test]
    fn metrics_describe_the_blurred_grid() {
        let heatmap = renderer().render(
            &[Point::new(400.0, 300.0)],
            DisplaySize::new(80.0, 60.0).unwrap(),
            DataType::Gaze,
        );
        assert!(heatmap.metrics.saliency_coverage > 0.0);
        assert!(heatmap.metrics.saliency_coverage < 100.0);
        assert!(heatmap.metrics.stationary_entropy > 0.0);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut config = EngineConfig::default();
        config.heatmap.sigma = 0.0;
        assert!(HeatmapRenderer::new(&config).is_err());
    }

    #[test]
    fn accent_colors_follow_the_data_type() {
        assert_eq!(DataType::Gaze.accent_color(), Rgba([255, 0, 0, 255]));
        assert_eq!(DataType::Fixations.accent_color(), Rgba([255, 165, 0, 255]));
    }

    #[test]
    fn png_is_written() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("heat.png");
        let heatmap = renderer().render(
            &[Point::new(100.0, 100.0)],
            DisplaySize::new(64.0, 48.0).unwrap(),
            DataType::Gaze,
        );
        heatmap.save_png(&path).unwrap();
        let decoded = image::open(&path).unwrap().to_rgba8();
        assert_eq!(decoded.dimensions(), (64, 48));
    }
}
