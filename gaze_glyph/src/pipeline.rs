// THEORY:
// The `pipeline` module is the top-level, synchronous API of the engine. It replaces a
// scatter of "current selection" globals with one immutable `ViewState` value and one
// pure function that turns a state plus the image's records into everything a renderer
// draws.
//
// Key architectural principles:
// 1.  **Single transition**: `ViewState::apply` is the only way to get a new state. It
//     never mutates in place, so a caller can keep the previous state around, compare
//     them, or drop a stale one.
// 2.  **Rejected selections are no-ops**: an area smaller than the minimum leaves the
//     state exactly as it was, so no analysis is ever triggered for it.
// 3.  **Derived, not stored**: overlays and the glyph are recomputed from the state on
//     every `render_view` call. Nothing is cached between calls.

use crate::adapter::{GlyphPayload, ImageData, RawRecord};
use crate::config::EngineConfig;
use crate::core_modules::contours::{ContourRenderer, ContourSet};
use crate::core_modules::coordinate_mapper::{CoordinateMapper, DisplaySize};
use crate::core_modules::heatmap::{DataType, Heatmap, HeatmapRenderer};
use crate::core_modules::point_filter::point_filter;
use crate::core_modules::radial_glyph::{RadialGlyphData, compute_glyph_model};
use crate::core_modules::records::{
    EyeRecord, ParticipantId, Point, Rect, ScoreTable, canonical_participant,
};
use crate::error::GlyphResult;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// The layers that can be drawn over the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlayKind {
    Points,
    Contours,
    Heatmap,
}

/// Every user-driven change to the view.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewAction {
    /// `None` or `"all"` shows every participant.
    SelectParticipant(Option<ParticipantId>),
    SetDataType(DataType),
    ToggleOverlay(OverlayKind),
    /// A data-space rectangle.
    SelectArea(Rect),
    /// A brush drawn on screen, top-left to bottom-right in display pixels.
    Brush { from: Point, to: Point },
    ClearArea,
    Resize(DisplaySize),
    /// Seconds; `None` removes the window.
    SetTimeWindow(Option<(f64, f64)>),
}

/// What the user is currently looking at.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewState {
    participant: Option<ParticipantId>,
    data_type: DataType,
    overlays: BTreeSet<OverlayKind>,
    area: Option<Rect>,
    display: DisplaySize,
    time_window: Option<(f64, f64)>,
    mapper: CoordinateMapper,
    min_selection: (f64, f64),
}

impl ViewState {
    /// A fresh view: all participants, gaze data, no overlays, no area.
    pub fn new(display: DisplaySize, config: &EngineConfig) -> Self {
        Self {
            participant: None,
            data_type: DataType::Gaze,
            overlays: BTreeSet::new(),
            area: None,
            display,
            time_window: None,
            mapper: CoordinateMapper::new(config.data_space),
            min_selection: (
                config.glyph.min_selection_width,
                config.glyph.min_selection_height,
            ),
        }
    }

    /// Returns the state that follows `action`.
    #[must_use]
    pub fn apply(&self, action: ViewAction) -> ViewState {
        let mut next = self.clone();
        match action {
            ViewAction::SelectParticipant(participant) => {
                next.participant = participant
                    .map(|id| canonical_participant(&id))
                    .filter(|id| id != point_filter::ALL_PARTICIPANTS);
            }
            ViewAction::SetDataType(data_type) => next.data_type = data_type,
            ViewAction::ToggleOverlay(kind) => {
                if !next.overlays.remove(&kind) {
                    next.overlays.insert(kind);
                }
            }
            ViewAction::SelectArea(rect) => return self.with_area(rect),
            ViewAction::Brush { from, to } => {
                let rect = self.mapper.brush_to_data(from.x, from.y, to.x, to.y, self.display);
                return self.with_area(rect);
            }
            ViewAction::ClearArea => next.area = None,
            ViewAction::Resize(display) => next.display = display,
            ViewAction::SetTimeWindow(window) => next.time_window = window,
        }
        next
    }

    fn with_area(&self, rect: Rect) -> ViewState {
        let (min_width, min_height) = self.min_selection;
        if !rect.is_selectable(min_width, min_height) {
            log::debug!("ignoring {rect:?}: below the minimum selection size");
            return self.clone();
        }
        ViewState {
            area: Some(rect),
            ..self.clone()
        }
    }

    pub fn participant(&self) -> Option<&str> {
        self.participant.as_deref()
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn overlays(&self) -> &BTreeSet<OverlayKind> {
        &self.overlays
    }

    pub fn shows(&self, kind: OverlayKind) -> bool {
        self.overlays.contains(&kind)
    }

    pub fn area(&self) -> Option<Rect> {
        self.area
    }

    pub fn display(&self) -> DisplaySize {
        self.display
    }

    pub fn time_window(&self) -> Option<(f64, f64)> {
        self.time_window
    }
}

/// Everything derived from one view state.
#[derive(Debug, Clone, Default)]
pub struct ViewOutput {
    /// Filtered points in display pixels, if the point overlay is on.
    pub points: Option<Vec<Point>>,
    pub contours: Option<ContourSet>,
    pub heatmap: Option<Heatmap>,
    /// The glyph for the selected area, if any.
    pub glyph: Option<RadialGlyphData>,
}

/// Derives the overlay layers and the area glyph for `state`.
pub fn render_view(state: &ViewState, data: &ImageData, config: &EngineConfig) -> GlyphResult<ViewOutput> {
    config.validate()?;
    match state.data_type {
        DataType::Gaze => render_layers(state, &data.gaze, &data.scores, config),
        DataType::Fixations => render_layers(state, &data.fixations, &data.scores, config),
    }
}

fn render_layers<R>(
    state: &ViewState,
    records: &[R],
    scores: &ScoreTable,
    config: &EngineConfig,
) -> GlyphResult<ViewOutput>
where
    R: EyeRecord + Clone,
    for<'a> RawRecord: From<&'a R>,
{
    let mut visible = point_filter::by_participant(records, state.participant());
    if let Some((start, end)) = state.time_window {
        visible = point_filter::by_time_window(&visible, start, end);
    }
    let points: Vec<Point> = visible.iter().map(EyeRecord::point).collect();
    log::debug!(
        "{} of {} {:?} records visible",
        points.len(),
        records.len(),
        state.data_type
    );

    let mut output = ViewOutput::default();
    if state.shows(OverlayKind::Points) {
        let mapper = CoordinateMapper::new(config.data_space);
        output.points = Some(
            points
                .iter()
                .map(|p| mapper.to_display(*p, state.display))
                .collect(),
        );
    }
    if state.shows(OverlayKind::Contours) {
        output.contours = Some(ContourRenderer::new(config)?.render(&points, state.display, state.data_type));
    }
    if state.shows(OverlayKind::Heatmap) {
        output.heatmap = Some(HeatmapRenderer::new(config)?.render(&points, state.display, state.data_type));
    }

    if let Some(area) = state.area {
        let selected = point_filter::by_rect(
            records,
            area,
            config.glyph.min_selection_width,
            config.glyph.min_selection_height,
        );
        output.glyph = selected.map(|selected| {
            let payload = GlyphPayload {
                points_for_analysis: Some(selected.iter().map(RawRecord::from).collect()),
                fixations: None,
                participant_scores: scores.clone(),
            };
            compute_glyph_model(&payload, &config.glyph)
        });
    }
    Ok(output)
}
