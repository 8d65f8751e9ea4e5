pub mod colormap;
pub mod contours;
pub mod coordinate_mapper;
pub mod density_grid;
pub mod direction_classifier;
pub mod heatmap;
pub mod participant_dwell;
pub mod point_filter;
pub mod radial_glyph;
pub mod records;
pub mod score_histogram;
pub mod time_buckets;
