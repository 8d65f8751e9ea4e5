// THEORY (jet colormap):
// Maps a normalized density in [0, 1] to an RGBA pixel. It is a single-value function
// with no knowledge of neighbours: the same input always yields the same pixel.
//
// - Below the visibility threshold the pixel is fully transparent, which removes the
//   speckle left by the blur tails.
// - Above it the value is remapped to [0, 1] and walks a five-segment piecewise-linear
//   ramp blue -> cyan -> green -> yellow -> red with breakpoints at 0.125, 0.375, 0.625
//   and 0.875. Each segment is one linear expression per channel.
// - Opacity rises linearly from `alpha_min` to `alpha_max` over the remapped range, so
//   faint regions let the image show through.
//
// Channels are computed as ratios in [0, 1] and rounded to bytes at the very end.

use crate::config::HeatmapConfig;
use image::Rgba;

/// The "no data" pixel.
pub const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// Colormap with its threshold and opacity range bound.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JetColormap {
    threshold: f64,
    alpha_min: f64,
    alpha_max: f64,
}

impl Default for JetColormap {
    fn default() -> Self {
        Self::from_config(&HeatmapConfig::default())
    }
}

impl JetColormap {
    pub fn from_config(config: &HeatmapConfig) -> Self {
        Self {
            threshold: config.threshold,
            alpha_min: config.alpha_min,
            alpha_max: config.alpha_max,
        }
    }

    /// Color ratios and opacity in [0, 1] for a normalized value, or `None` below the
    /// threshold.
    pub fn ratios(&self, value: f64) -> Option<[f64; 4]> {
        let value = if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) };
        if value < self.threshold {
            return None;
        }
        let v = (value - self.threshold) / (1.0 - self.threshold);

        let (r, g, b) = if v < 0.125 {
            (0.0, 0.0, 0.5 + v / 0.125 * 0.5)
        } else if v < 0.375 {
            (0.0, (v - 0.125) / 0.25, 1.0)
        } else if v < 0.625 {
            ((v - 0.375) / 0.25, 1.0, 1.0 - (v - 0.375) / 0.25)
        } else if v < 0.875 {
            (1.0, 1.0 - (v - 0.625) / 0.25, 0.0)
        } else {
            (1.0 - (v - 0.875) / 0.125 * 0.5, 0.0, 0.0)
        };
        let alpha = self.alpha_min + v * (self.alpha_max - self.alpha_min);
        Some([r, g, b, alpha])
    }

    /// The RGBA pixel for a normalized value.
    pub fn color_of(&self, value: f64) -> Rgba<u8> {
        match self.ratios(value) {
            Some([r, g, b, a]) => Rgba([to_byte(r), to_byte(g), to_byte(b), to_byte(a)]),
            None => TRANSPARENT,
        }
    }
}

fn to_byte(ratio: f64) -> u8 {
    (ratio * 255.0).round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn below_threshold_is_transparent() {
        let map = JetColormap::default();
        assert_eq!(map.color_of(0.0), TRANSPARENT);
        assert_eq!(map.color_of(0.0799), TRANSPARENT);
        assert_eq!(map.color_of(-3.0), TRANSPARENT);
        assert_eq!(map.color_of(f64::NAN), TRANSPARENT);
    }

    #[test]
    fn threshold_starts_at_dark_blue_and_min_alpha() {
        let map = JetColormap::default();
        let [r, g, b, a] = map.ratios(0.08).unwrap();
        assert!(approx(r, 0.0) && approx(g, 0.0) && approx(b, 0.5));
        assert!(approx(a, 0.3));
        let px = map.color_of(0.08);
        assert_eq!(&px.0[..3], &[0, 0, 128]);
        assert!((px.0[3] as i32 - 77).abs() <= 1);
    }

    #[test]
    fn peak_is_dark_red_with_max_alpha() {
        let map = JetColormap::default();
        let [r, g, b, a] = map.ratios(1.0).unwrap();
        assert!(approx(r, 0.5) && approx(g, 0.0) && approx(b, 0.0));
        assert!(approx(a, 0.7));
        let px = map.color_of(1.0);
        assert_eq!(&px.0[..3], &[128, 0, 0]);
        assert!((px.0[3] as i32 - 179).abs() <= 1);
        // Values above one are clamped.
        assert_eq!(map.color_of(7.0), map.color_of(1.0));
    }

    #[test]
    fn breakpoints_hit_the_pure_hues() {
        let map = JetColormap {
            threshold: 0.0,
            alpha_min: 0.3,
            alpha_max: 0.7,
        };
        let at = |v: f64| {
            let [r, g, b, _] = map.ratios(v).unwrap();
            (r, g, b)
        };
        assert_eq!(at(0.125), (0.0, 0.0, 1.0)); // blue
        assert_eq!(at(0.375), (0.0, 1.0, 1.0)); // cyan
        assert_eq!(at(0.625), (1.0, 1.0, 0.0)); // yellow
        assert_eq!(at(0.875), (1.0, 0.0, 0.0)); // red
        let (r, g, b) = at(0.5);
        assert!(approx(r, 0.5) && approx(g, 1.0) && approx(b, 0.5)); // green-ish midpoint
    }

    #[test]
    fn alpha_ramps_linearly() {
        let map = JetColormap::default();
        let mid = 0.08 + 0.5 * 0.92;
        let [_, _, _, a] = map.ratios(mid).unwrap();
        assert!(approx(a, 0.5));
    }
}
