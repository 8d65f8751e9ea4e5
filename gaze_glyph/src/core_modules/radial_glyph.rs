// THEORY:
// The `RadialGlyphModel` is the composition layer of the glyph view. It takes the raw
// payload of one area selection and runs every aggregator over the same sanitized
// record set, producing one `RadialGlyphData` value.
//
// Key architectural principles:
// 1.  **Pure core, thin shell**: `compute_glyph_model` is a pure function of payload and
//     config. No clock, no RNG, no hidden state, so equal inputs give deep-equal outputs.
//     `RadialGlyphModel` only remembers the last result for a renderer to read.
// 2.  **One record set**: the payload's explicit analysis list wins (even when empty),
//     then its fixation list, then nothing. Every ring is computed from that one set.
// 3.  **Observable sanitizing**: records without a position or a participant are
//     removed before aggregation, and the before/after counts travel with the result.

use crate::adapter::{GlyphPayload, RawRecord};
use crate::config::GlyphConfig;
use crate::core_modules::direction_classifier::{DirectionClassifier, DirectionCounts};
use crate::core_modules::participant_dwell::{self, ParticipantDwell};
use crate::core_modules::records::AnalysisRecord;
use crate::core_modules::score_histogram::{ScoreHistogram, ScoreHistogramBuilder};
use crate::core_modules::time_buckets::{TimeBucketAggregator, TimeBuckets};
use crate::error::ConfigError;
use serde::Serialize;

/// Which payload field the analysis records came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisSource {
    PointsForAnalysis,
    Fixations,
    Empty,
}

/// Record counts around the sanitize step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SanitizeReport {
    pub before: usize,
    pub after: usize,
}

impl SanitizeReport {
    pub fn removed(&self) -> usize {
        self.before - self.after
    }
}

/// Everything the glyph renderer needs for one selection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RadialGlyphData {
    pub histogram: ScoreHistogram,
    pub directions: DirectionCounts,
    pub time_buckets: TimeBuckets,
    /// The same records on each participant's own clock.
    pub timeline: TimeBuckets,
    pub participants: Vec<ParticipantDwell>,
    pub source: AnalysisSource,
    pub sanitize: SanitizeReport,
}

/// Picks the analysis record list out of a payload.
pub fn select_records(payload: &GlyphPayload) -> (AnalysisSource, &[RawRecord]) {
    match (&payload.points_for_analysis, &payload.fixations) {
        (Some(points), _) => (AnalysisSource::PointsForAnalysis, points.as_slice()),
        (None, Some(fixations)) => (AnalysisSource::Fixations, fixations.as_slice()),
        (None, None) => (AnalysisSource::Empty, &[]),
    }
}

/// Drops records without a position or participant.
pub fn sanitize(records: &[RawRecord]) -> (Vec<AnalysisRecord>, SanitizeReport) {
    let kept: Vec<AnalysisRecord> = records.iter().filter_map(RawRecord::to_analysis).collect();
    let report = SanitizeReport {
        before: records.len(),
        after: kept.len(),
    };
    if report.removed() > 0 {
        log::debug!(
            "sanitize kept {} of {} analysis records",
            report.after,
            report.before
        );
    }
    (kept, report)
}

/// Builds the full glyph data for one payload.
pub fn compute_glyph_model(payload: &GlyphPayload, config: &GlyphConfig) -> RadialGlyphData {
    let (source, raw) = select_records(payload);
    let (records, report) = sanitize(raw);

    let selection: Vec<&str> = records.iter().map(|r| r.participant.as_str()).collect();
    let histogram = ScoreHistogramBuilder::new(config.empty_mean)
        .build(&payload.participant_scores, selection);
    let directions = DirectionClassifier::new(config.noise_floor).classify(&records);
    let time_buckets = TimeBucketAggregator::from_config(config).aggregate(&records);
    let timeline = TimeBucketAggregator::participant_relative().aggregate(&records);
    let participants =
        participant_dwell::summarize(&records, &payload.participant_scores, config.missing_duration);

    RadialGlyphData {
        histogram,
        directions,
        time_buckets,
        timeline,
        participants,
        source,
        sanitize: report,
    }
}

/// Lifecycle of the glyph view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlyphState {
    Uninitialized,
    Populated,
}

/// Holds the most recent glyph data; every update replaces it wholesale.
#[derive(Debug, Clone)]
pub struct RadialGlyphModel {
    config: GlyphConfig,
    current: Option<Box<RadialGlyphData>>,
}

impl RadialGlyphModel {
    pub fn new(config: GlyphConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            current: None,
        })
    }

    pub fn update(&mut self, payload: &GlyphPayload) -> &RadialGlyphData {
        let data = compute_glyph_model(payload, &self.config);
        self.current.insert(Box::new(data))
    }

    pub fn clear(&mut self) {
        self.current = None;
    }

    pub fn state(&self) -> GlyphState {
        match self.current {
            Some(_) => GlyphState::Populated,
            None => GlyphState::Uninitialized,
        }
    }

    pub fn data(&self) -> Option<&RadialGlyphData> {
        self.current.as_deref()
    }
}
