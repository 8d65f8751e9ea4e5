// THEORY:
// The `DensityGrid` is the intermediate buffer underneath the heatmap and contour
// overlays. It lives for one render call: points are accumulated, the grid is smoothed,
// read out, and dropped.
//
// Key architectural principles:
// 1.  **Spatial pooling**: each point lands in exactly one cell of a row-major grid whose
//     size is the display size times a resolution multiplier. Points outside the grid
//     are dropped without error.
// 2.  **Separable smoothing**: a 2D Gaussian is applied as one horizontal pass followed by
//     one vertical pass with the same normalized 1D kernel. Kernel taps that fall off
//     the grid are omitted, not reflected or wrapped, so mass near the edges leaks out
//     and the total can only shrink.
// 3.  **Sparse rows**: accumulation touches few rows, so the horizontal pass skips rows
//     that are entirely zero. The result is identical to blurring them.
// 4.  **Attention metrics**: a smoothed grid also answers how much of the image drew
//     attention (saliency coverage, the share of cells above an Otsu threshold) and how
//     spread out that attention was (stationary entropy in bits).

use crate::core_modules::coordinate_mapper::{CoordinateMapper, DisplaySize, round_half_up};
use crate::core_modules::records::Point;
use serde::Serialize;

/// A row-major grid of non-negative densities.
#[derive(Debug, Clone, PartialEq)]
pub struct DensityGrid {
    width: usize,
    height: usize,
    cells: Vec<f64>,
}

/// What happened to the input of an accumulation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AccumulationStats {
    pub accepted: usize,
    pub dropped: usize,
}

/// Summary statistics of a smoothed grid.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct DensityMetrics {
    /// Percentage of cells above the Otsu threshold, in `[0, 100]`.
    pub saliency_coverage: f64,
    /// Shannon entropy of the grid read as a distribution, in bits.
    pub stationary_entropy: f64,
}

impl DensityGrid {
    /// An all-zero grid.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            cells: vec![0.0; width * height],
        }
    }

    /// Wraps existing row-major cells, or `None` if the length does not match.
    pub fn from_cells(width: usize, height: usize, cells: Vec<f64>) -> Option<Self> {
        (cells.len() == width * height).then_some(Self {
            width,
            height,
            cells,
        })
    }

    /// Allocates a `ceil(W·R) × ceil(H·R)` grid and counts every data-space point into
    /// its nearest cell.
    pub fn accumulate(
        points: impl IntoIterator<Item = Point>,
        mapper: &CoordinateMapper,
        display: DisplaySize,
        resolution: f64,
    ) -> (Self, AccumulationStats) {
        let width = (display.width() * resolution).ceil() as usize;
        let height = (display.height() * resolution).ceil() as usize;
        let mut grid = Self::new(width, height);
        let mut stats = AccumulationStats::default();

        for point in points {
            let on_screen = mapper.to_display(point, display);
            let cx = round_half_up(on_screen.x * resolution);
            let cy = round_half_up(on_screen.y * resolution);
            if cx >= 0.0 && cy >= 0.0 && (cx as usize) < width && (cy as usize) < height {
                grid.cells[cy as usize * width + cx as usize] += 1.0;
                stats.accepted += 1;
            } else {
                stats.dropped += 1;
            }
        }

        log::debug!(
            "accumulated {} points into {}x{} grid ({} out of bounds)",
            stats.accepted,
            width,
            height,
            stats.dropped
        );
        (grid, stats)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn cells(&self) -> &[f64] {
        &self.cells
    }

    pub fn get(&self, x: usize, y: usize) -> Option<f64> {
        if x < self.width && y < self.height {
            Some(self.cells[y * self.width + x])
        } else {
            None
        }
    }

    pub fn total(&self) -> f64 {
        self.cells.iter().sum()
    }

    /// The largest cell value, `0.0` for an empty grid.
    pub fn max(&self) -> f64 {
        self.cells.iter().copied().fold(0.0, f64::max)
    }

    /// Returns a smoothed copy; `self` is left untouched.
    pub fn blurred(&self, sigma: f64) -> DensityGrid {
        let kernel = gaussian_kernel(sigma);
        let radius = (kernel.len() / 2) as isize;

        // --- Horizontal pass ---
        let mut horizontal = vec![0.0; self.cells.len()];
        for y in 0..self.height {
            let row = &self.cells[y * self.width..(y + 1) * self.width];
            if row.iter().all(|&v| v == 0.0) {
                continue;
            }
            let out = &mut horizontal[y * self.width..(y + 1) * self.width];
            for (x, slot) in out.iter_mut().enumerate() {
                let mut value = 0.0;
                for (k, weight) in kernel.iter().enumerate() {
                    let src = x as isize + k as isize - radius;
                    if src >= 0 && (src as usize) < self.width {
                        value += row[src as usize] * weight;
                    }
                }
                *slot = value;
            }
        }

        // --- Vertical pass ---
        let mut cells = vec![0.0; self.cells.len()];
        for y in 0..self.height {
            for x in 0..self.width {
                let mut value = 0.0;
                for (k, weight) in kernel.iter().enumerate() {
                    let src = y as isize + k as isize - radius;
                    if src >= 0 && (src as usize) < self.height {
                        value += horizontal[src as usize * self.width + x] * weight;
                    }
                }
                cells[y * self.width + x] = value;
            }
        }

        DensityGrid {
            width: self.width,
            height: self.height,
            cells,
        }
    }

    /// Every cell divided by the peak, or all zeros if the grid is empty.
    pub fn normalized(&self) -> Vec<f64> {
        let max = self.max();
        if max > 0.0 {
            self.cells.iter().map(|v| v / max).collect()
        } else {
            vec![0.0; self.cells.len()]
        }
    }

    /// Percentage of cells whose peak-normalized value, quantized to `0..=255`, lies above
    /// the Otsu threshold of all quantized cells. Zero for an empty grid.
    pub fn saliency_coverage(&self) -> f64 {
        if self.cells.is_empty() {
            return 0.0;
        }
        let levels: Vec<u8> = self
            .normalized()
            .iter()
            .map(|v| (v * 255.0) as u8)
            .collect();
        let threshold = otsu_threshold(&levels);
        let active = levels.iter().filter(|&&level| level > threshold).count();
        active as f64 / levels.len() as f64 * 100.0
    }

    /// `-Σ p·log2 p` over the cells scaled to sum to 1. Zero for an empty grid.
    pub fn stationary_entropy(&self) -> f64 {
        let total = self.total();
        if total <= 0.0 {
            return 0.0;
        }
        self.cells
            .iter()
            .filter(|&&v| v > 0.0)
            .map(|&v| {
                let p = v / total;
                -p * p.log2()
            })
            .sum()
    }

    pub fn metrics(&self) -> DensityMetrics {
        DensityMetrics {
            saliency_coverage: self.saliency_coverage(),
            stationary_entropy: self.stationary_entropy(),
        }
    }
}

/// The level that maximizes the between-class variance of `levels`. Levels strictly above
/// it form the foreground. A single-valued input yields `0`.
fn otsu_threshold(levels: &[u8]) -> u8 {
    let mut histogram = [0usize; 256];
    for &level in levels {
        histogram[level as usize] += 1;
    }
    let total = levels.len() as f64;
    let mean = histogram
        .iter()
        .enumerate()
        .map(|(i, &n)| i as f64 * n as f64)
        .sum::<f64>()
        / total;

    let min_weight = f64::from(f32::EPSILON);
    let (mut below_weight, mut below_sum) = (0.0, 0.0);
    let (mut best, mut best_variance) = (0u8, 0.0);
    for (i, &n) in histogram.iter().enumerate() {
        let p = n as f64 / total;
        below_weight += p;
        below_sum += i as f64 * p;
        let above_weight = 1.0 - below_weight;
        if below_weight < min_weight || above_weight < min_weight {
            continue;
        }
        let below_mean = below_sum / below_weight;
        let above_mean = (mean - below_sum) / above_weight;
        let variance = below_weight * above_weight * (below_mean - above_mean).powi(2);
        if variance > best_variance {
            best_variance = variance;
            best = i as u8;
        }
    }
    best
}

/// A normalized 1D Gaussian of radius `ceil(3σ)`, i.e. `2·ceil(3σ) + 1` taps.
pub fn gaussian_kernel(sigma: f64) -> Vec<f64> {
    let radius = (3.0 * sigma).ceil() as isize;
    let two_sigma_sq = 2.0 * sigma * sigma;
    let mut kernel: Vec<f64> = (-radius..=radius)
        .map(|x| (-((x * x) as f64) / two_sigma_sq).exp())
        .collect();
    let sum: f64 = kernel.iter().sum();
    for weight in kernel.iter_mut() {
        *weight /= sum;
    }
    kernel
}

#[cfg(test)]
mod tests {
    use super::*;

    fn display(w: f64, h: f64) -> DisplaySize {
        DisplaySize::new(w, h).unwrap()
    }

    #[test]
    fn kernel_is_normalized_and_symmetric() {
        let kernel = gaussian_kernel(35.0);
        assert_eq!(kernel.len(), 2 * 105 + 1);
        assert!((kernel.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        for i in 0..kernel.len() / 2 {
            assert!((kernel[i] - kernel[kernel.len() - 1 - i]).abs() < 1e-15);
        }
        assert!(kernel[105] > kernel[104]);
    }

    #[test]
    fn grid_size_follows_display_and_resolution() {
        let (grid, _) = DensityGrid::accumulate(
            Vec::<Point>::new(),
            &CoordinateMapper::default(),
            display(100.5, 50.0),
            2.0,
        );
        assert_eq!((grid.width(), grid.height()), (201, 100));
        assert_eq!(grid.total(), 0.0);
    }

    #[test]
    fn points_land_in_flipped_cells() {
        let mapper = CoordinateMapper::default();
        // Display equals data space, so a cell is half a data unit at R = 2.
        let (grid, stats) = DensityGrid::accumulate(
            vec![Point::new(10.0, 590.0), Point::new(10.0, 590.0)],
            &mapper,
            display(800.0, 600.0),
            2.0,
        );
        assert_eq!(stats, AccumulationStats { accepted: 2, dropped: 0 });
        assert_eq!(grid.get(20, 20), Some(2.0));
        assert_eq!(grid.total(), 2.0);
    }

    #[test]
    fn out_of_bounds_points_are_dropped() {
        let mapper = CoordinateMapper::default();
        let (grid, stats) = DensityGrid::accumulate(
            vec![
                Point::new(-15.0, 300.0),
                Point::new(900.0, 300.0),
                Point::new(400.0, -10.0),
                Point::new(400.0, 300.0),
            ],
            &mapper,
            display(80.0, 60.0),
            1.0,
        );
        assert_eq!(stats.accepted, 1);
        assert_eq!(stats.dropped, 3);
        assert_eq!(grid.total(), 1.0);
    }

    #[test]
    fn blur_spreads_but_never_creates_mass() {
        let mut grid = DensityGrid::new(41, 41);
        grid.cells[20 * 41 + 20] = 1.0;
        let blurred = grid.blurred(2.0);
        // Kernel fits inside the grid, so mass is preserved.
        assert!((blurred.total() - 1.0).abs() < 1e-9);
        assert!(blurred.get(20, 20).unwrap() < 1.0);
        assert!(blurred.get(21, 20).unwrap() > 0.0);
        assert_eq!(blurred.max(), blurred.get(20, 20).unwrap());
        // The input is untouched.
        assert_eq!(grid.get(20, 20), Some(1.0));
    }

    #[test]
    fn blur_loses_mass_at_the_edges() {
        let mut grid = DensityGrid::new(10, 10);
        grid.cells[0] = 1.0;
        let blurred = grid.blurred(3.0);
        let total = blurred.total();
        assert!(total < 1.0);
        assert!(total > 0.0);
    }

    #[test]
    fn empty_grids_have_no_coverage_or_entropy() {
        let grid = DensityGrid::new(8, 6);
        assert_eq!(grid.metrics(), DensityMetrics::default());
        assert_eq!(DensityGrid::new(0, 0).metrics(), DensityMetrics::default());
    }

    #[test]
    fn uniform_grids_have_maximal_entropy() {
        let grid = DensityGrid::from_cells(16, 8, vec![0.25; 128]).unwrap();
        assert!((grid.stationary_entropy() - 7.0).abs() < 1e-9);
        assert_eq!(grid.saliency_coverage(), 100.0);
    }

    #[test]
    fn a_single_blurred_peak_covers_little() {
        let mut grid = DensityGrid::new(40, 40);
        grid.cells[20 * 40 + 20] = 1.0;
        let blurred = grid.blurred(1.0);
        let coverage = blurred.saliency_coverage();
        assert!(coverage > 0.0);
        assert!(coverage < 5.0);
        // Far below log2(1600), the entropy of a uniform grid.
        assert!(blurred.stationary_entropy() < 6.0);
        assert_eq!(grid.stationary_entropy(), 0.0);
    }

    #[test]
    fn otsu_splits_two_levels_between_them() {
        let mut cells = vec![0.0; 100];
        cells[..50].fill(1.0);
        let grid = DensityGrid::from_cells(10, 10, cells).unwrap();
        assert_eq!(otsu_threshold(&[0, 0, 255, 255]), 0);
        assert_eq!(grid.saliency_coverage(), 50.0);
        assert!((grid.stationary_entropy() - 50f64.log2()).abs() < 1e-9);
    }

    #[test]
    fn normalizing_an_empty_grid_yields_zeros() {
        let grid = DensityGrid::new(3, 2);
        assert_eq!(grid.normalized(), vec![0.0; 6]);
        assert_eq!(grid.max(), 0.0);
    }
}
