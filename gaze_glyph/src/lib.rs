// THEORY:
// This file is the main entry point for the `gaze_glyph` library crate. It turns the
// gaze samples and fixations recorded while participants viewed an image into the
// numbers and pixels a renderer draws: point overlays, density contours, smoothed
// heatmaps, and the radial glyph that summarizes one selected region.
//
// The crate is layered leaf-first:
// - `core_modules` holds the pure engines (coordinate mapping, density grid, colormap,
//   filters, and the glyph aggregators). None of them allocate state that outlives a call.
// - `adapter` is the boundary with the data source and the only place that knows its
//   field-name variants.
// - `pipeline` threads an immutable `ViewState` through the engines.
// - `session` is the async shell that owns the current image and sequences selections.
//
// Rendering technology is absent here. Consumers such as `glyph_tester` decide
// how the outputs are drawn.

pub mod adapter;
pub mod config;
pub mod core_modules;
pub mod error;
pub mod pipeline;
pub mod session;

pub use adapter::{GlyphPayload, ImageData, RawRecord};
pub use config::EngineConfig;
pub use core_modules::coordinate_mapper::{CoordinateMapper, DisplaySize};
pub use core_modules::density_grid::DensityMetrics;
pub use core_modules::heatmap::{DataType, Heatmap, HeatmapRenderer};
pub use core_modules::radial_glyph::{RadialGlyphData, RadialGlyphModel, compute_glyph_model};
pub use core_modules::records::{FixationEvent, GazeSample, Point, Rect};
pub use error::{ConfigError, GlyphError, GlyphResult};
pub use pipeline::{OverlayKind, ViewAction, ViewOutput, ViewState, render_view};
pub use session::{GlyphSession, Outcome};
