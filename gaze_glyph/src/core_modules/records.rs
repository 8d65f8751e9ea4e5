// THEORY:
// The `records` module holds the "dumb" data containers every engine consumes. They are
// produced once by the input adapter, owned by the session for the lifetime of one
// image, and never mutated afterwards: every aggregator borrows them and returns a new
// derived structure.
//
// Key architectural principles:
// 1.  **One canonical shape**: field-name variants are resolved at the boundary, so the
//     engines never branch on where a coordinate came from.
// 2.  **Data space**: all coordinates are in the fixed logical space (origin bottom-left,
//     y growing upward). Conversion to screen space is the `CoordinateMapper`'s job.
// 3.  **A shared lens**: the `EyeRecord` trait exposes position, participant and timing
//     uniformly, so filters and aggregators work on gaze samples, fixations, or the mixed
//     records of a glyph payload without duplication.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Participant identifiers are normalized to strings at the boundary.
pub type ParticipantId = String;

/// A position in data space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A raw, high-frequency eye-tracking sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GazeSample {
    #[serde(flatten)]
    pub point: Point,
    pub participant: ParticipantId,
    /// Seconds; may be negative before the calibration offset.
    pub time: f64,
}

/// A sustained dwell attributed to one participant.
///
/// `end >= start` and `duration ≈ end - start` are expected but not enforced; mismatches
/// are tolerated as noise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixationEvent {
    /// The fixation centroid.
    #[serde(flatten)]
    pub point: Point,
    pub participant: ParticipantId,
    pub duration: f64,
    pub start: f64,
    pub end: f64,
}

/// When a record happened, as far as the source told us.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Timing {
    /// A single timestamp (gaze samples).
    Instant { time: f64 },
    /// A start/end interval (fixations). Missing fields are `None`.
    Interval {
        start: f64,
        end: Option<f64>,
        duration: Option<f64>,
    },
    /// The source carried no usable timestamp.
    Unknown,
}

/// A sanitized record of a glyph payload: either kind of event, with whatever timing it had.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    #[serde(flatten)]
    pub point: Point,
    pub participant: ParticipantId,
    pub timing: Timing,
}

impl From<&GazeSample> for AnalysisRecord {
    fn from(sample: &GazeSample) -> Self {
        Self {
            point: sample.point,
            participant: sample.participant.clone(),
            timing: Timing::Instant { time: sample.time },
        }
    }
}

impl From<&FixationEvent> for AnalysisRecord {
    fn from(fixation: &FixationEvent) -> Self {
        Self {
            point: fixation.point,
            participant: fixation.participant.clone(),
            timing: Timing::Interval {
                start: fixation.start,
                end: Some(fixation.end),
                duration: Some(fixation.duration),
            },
        }
    }
}

/// Uniform read access to any eye-tracking record.
pub trait EyeRecord {
    fn point(&self) -> Point;
    fn participant(&self) -> &str;
    /// The moment used for ordering and time bucketing: fixation start or gaze time.
    fn onset(&self) -> Option<f64>;
    /// The interval the record covers, as raw source values.
    fn span(&self) -> Option<(f64, f64)>;
    /// Fixation duration, if the record has one.
    fn duration(&self) -> Option<f64>;
    /// Recorded end of the event; instants have none.
    fn end(&self) -> Option<f64> {
        None
    }
}

impl EyeRecord for GazeSample {
    fn point(&self) -> Point {
        self.point
    }
    fn participant(&self) -> &str {
        &self.participant
    }
    fn onset(&self) -> Option<f64> {
        Some(self.time)
    }
    fn span(&self) -> Option<(f64, f64)> {
        Some((self.time, self.time))
    }
    fn duration(&self) -> Option<f64> {
        None
    }
}

impl EyeRecord for FixationEvent {
    fn point(&self) -> Point {
        self.point
    }
    fn participant(&self) -> &str {
        &self.participant
    }
    fn onset(&self) -> Option<f64> {
        Some(self.start)
    }
    fn span(&self) -> Option<(f64, f64)> {
        Some((self.start, self.end))
    }
    fn duration(&self) -> Option<f64> {
        Some(self.duration)
    }
    fn end(&self) -> Option<f64> {
        Some(self.end)
    }
}

impl EyeRecord for AnalysisRecord {
    fn point(&self) -> Point {
        self.point
    }
    fn participant(&self) -> &str {
        &self.participant
    }
    fn onset(&self) -> Option<f64> {
        match self.timing {
            Timing::Instant { time } => Some(time),
            Timing::Interval { start, .. } => Some(start),
            Timing::Unknown => None,
        }
    }
    fn span(&self) -> Option<(f64, f64)> {
        match self.timing {
            Timing::Instant { time } => Some((time, time)),
            Timing::Interval { start, end, .. } => Some((start, end.unwrap_or(start))),
            Timing::Unknown => None,
        }
    }
    fn duration(&self) -> Option<f64> {
        match self.timing {
            Timing::Interval { duration, .. } => duration,
            _ => None,
        }
    }
    fn end(&self) -> Option<f64> {
        match self.timing {
            Timing::Interval { end, .. } => end,
            _ => None,
        }
    }
}

/// A participant's perceptual score and the demographics shown next to it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ScoreInfo {
    /// On a 0 to 10 scale; `None` excludes the participant from score statistics.
    pub score: Option<f64>,
    pub age: Option<String>,
    pub gender: Option<String>,
    pub state: Option<String>,
}

impl ScoreInfo {
    pub fn with_score(score: f64) -> Self {
        Self {
            score: Some(score),
            ..Default::default()
        }
    }

    /// The score if it is usable for statistics.
    pub fn valid_score(&self) -> Option<f64> {
        self.score.filter(|s| s.is_finite())
    }
}

/// Scores of every participant of one image, keyed by participant id.
pub type ScoreTable = BTreeMap<ParticipantId, ScoreInfo>;

/// An axis-aligned rectangle in data space, `(x, y)` being its minimum corner.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Inclusive on every edge.
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.x
            && point.x <= self.x + self.width
            && point.y >= self.y
            && point.y <= self.y + self.height
    }

    /// Whether the rectangle is large enough to be analyzed.
    pub fn is_selectable(&self, min_width: f64, min_height: f64) -> bool {
        self.width >= min_width && self.height >= min_height
    }
}

/// Total order on participant ids: numeric ids first by value, then everything else
/// lexicographically.
pub fn compare_participants(a: &str, b: &str) -> Ordering {
    match (numeric_id(a), numeric_id(b)) {
        (Some(x), Some(y)) => x.total_cmp(&y).then_with(|| a.cmp(b)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}

/// The form participant ids are compared in: trimmed, with integral numbers written
/// without a fractional part (`" 1.0 "` becomes `"1"`).
pub fn canonical_participant(id: &str) -> ParticipantId {
    let id = id.trim();
    match numeric_id(id) {
        Some(v) if v.fract() == 0.0 && v.abs() < 1e15 => (v as i64).to_string(),
        _ => id.to_string(),
    }
}

fn numeric_id(id: &str) -> Option<f64> {
    id.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_contains_is_inclusive() {
        let rect = Rect::new(10.0, 20.0, 40.0, 40.0);
        assert!(rect.contains(Point::new(10.0, 20.0)));
        assert!(rect.contains(Point::new(50.0, 60.0)));
        assert!(!rect.contains(Point::new(50.1, 60.0)));
        assert!(!rect.contains(Point::new(9.9, 30.0)));
    }

    #[test]
    fn selections_below_minimum_are_not_selectable() {
        assert!(Rect::new(0.0, 0.0, 40.0, 40.0).is_selectable(40.0, 40.0));
        assert!(!Rect::new(0.0, 0.0, 39.0, 200.0).is_selectable(40.0, 40.0));
        assert!(!Rect::new(0.0, 0.0, 200.0, 39.9).is_selectable(40.0, 40.0));
    }

    #[test]
    fn participants_sort_numerically_before_names() {
        let mut ids = vec!["10", "b", "2", "a", "1"];
        ids.sort_by(|a, b| compare_participants(a, b));
        assert_eq!(ids, vec!["1", "2", "10", "a", "b"]);
    }

    #[test]
    fn canonical_ids_drop_padding_and_integral_fractions() {
        assert_eq!(canonical_participant(" 1 "), "1");
        assert_eq!(canonical_participant("1.0"), "1");
        assert_eq!(canonical_participant("1.5"), "1.5");
        assert_eq!(canonical_participant(" p7 "), "p7");
    }

    #[test]
    fn analysis_record_timing_drives_onset_and_span() {
        let gaze = GazeSample {
            point: Point::new(1.0, 2.0),
            participant: "3".into(),
            time: 4.5,
        };
        let record = AnalysisRecord::from(&gaze);
        assert_eq!(record.onset(), Some(4.5));
        assert_eq!(record.span(), Some((4.5, 4.5)));

        let open = AnalysisRecord {
            point: Point::default(),
            participant: "3".into(),
            timing: Timing::Interval {
                start: 2.0,
                end: None,
                duration: None,
            },
        };
        assert_eq!(open.span(), Some((2.0, 2.0)));
        assert_eq!(open.duration(), None);
    }
}
