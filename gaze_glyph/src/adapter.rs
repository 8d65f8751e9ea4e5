// THEORY:
// The adapter is the only place that knows how the data source spells things. Exports
// name the same value several ways (`x_centroid`, `pixelX` or `x` for a coordinate;
// `participante` or `participant` for an id; numbers that sometimes arrive as strings),
// and every one of those variants is resolved here, once. Everything downstream sees
// the canonical records in `core_modules::records` and never branches on field names.
//
// Key architectural principles:
// 1.  **First usable value wins**: key variants are tried in a fixed order and the first
//     numeric (or numeric-string) value is taken. Nulls and garbage fall through.
// 2.  **Lenient records, strict documents**: a document that is not valid JSON is a
//     `GlyphError`. A record inside it with a missing coordinate or participant is data
//     quality, so it is dropped and counted.
// 3.  **Raw until sanitized**: glyph payloads keep their records as `RawRecord`s so the
//     glyph model can observe how many records its own sanitize step removed.

use crate::core_modules::records::{
    AnalysisRecord, FixationEvent, GazeSample, ParticipantId, Point, ScoreInfo, ScoreTable,
    Timing,
};
use crate::error::GlyphResult;
use serde::Serialize;
use serde_json::{Map, Value};

const X_KEYS: &[&str] = &["x_centroid", "pixelX", "x"];
const Y_KEYS: &[&str] = &["y_centroid", "pixelY", "y"];
const PARTICIPANT_KEYS: &[&str] = &["participante", "participant"];
const TIME_KEYS: &[&str] = &["Time", "time"];
const START_KEYS: &[&str] = &["start", "start_time"];
const END_KEYS: &[&str] = &["end", "end_time"];
const DURATION_KEYS: &[&str] = &["duration"];

/// One source record with every known key variant resolved, nothing validated yet.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct RawRecord {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub participant: Option<ParticipantId>,
    pub time: Option<f64>,
    pub start: Option<f64>,
    pub end: Option<f64>,
    pub duration: Option<f64>,
}

impl RawRecord {
    /// Resolves a JSON object. Anything that is not an object yields an empty record.
    pub fn from_value(value: &Value) -> Self {
        let Some(object) = value.as_object() else {
            return Self::default();
        };
        Self {
            x: first_number(object, X_KEYS),
            y: first_number(object, Y_KEYS),
            participant: first_participant(object),
            time: first_number(object, TIME_KEYS),
            start: first_number(object, START_KEYS),
            end: first_number(object, END_KEYS),
            duration: first_number(object, DURATION_KEYS),
        }
    }

    /// The position, if both coordinates are present and finite.
    pub fn point(&self) -> Option<Point> {
        match (self.x, self.y) {
            (Some(x), Some(y)) if x.is_finite() && y.is_finite() => Some(Point::new(x, y)),
            _ => None,
        }
    }

    /// The canonical record, or `None` if position or participant is missing.
    pub fn to_analysis(&self) -> Option<AnalysisRecord> {
        let point = self.point()?;
        let participant = self.participant.clone()?;
        let timing = match (self.start, self.time) {
            (Some(start), _) => Timing::Interval {
                start,
                end: self.end,
                duration: self.duration,
            },
            (None, Some(time)) => Timing::Instant { time },
            (None, None) => Timing::Unknown,
        };
        Some(AnalysisRecord {
            point,
            participant,
            timing,
        })
    }

    pub fn to_gaze(&self) -> Option<GazeSample> {
        Some(GazeSample {
            point: self.point()?,
            participant: self.participant.clone()?,
            time: self.time.or(self.start)?,
        })
    }

    /// A fixation needs a start; end and duration are derived from each other when one
    /// of them is missing.
    pub fn to_fixation(&self) -> Option<FixationEvent> {
        let point = self.point()?;
        let participant = self.participant.clone()?;
        let start = self.start.or(self.time)?;
        let (end, duration) = match (self.end, self.duration) {
            (Some(end), Some(duration)) => (end, duration),
            (Some(end), None) => (end, end - start),
            (None, Some(duration)) => (start + duration, duration),
            (None, None) => (start, 0.0),
        };
        Some(FixationEvent {
            point,
            participant,
            duration,
            start,
            end,
        })
    }
}

impl From<&GazeSample> for RawRecord {
    fn from(sample: &GazeSample) -> Self {
        Self {
            x: Some(sample.point.x),
            y: Some(sample.point.y),
            participant: Some(sample.participant.clone()),
            time: Some(sample.time),
            ..Default::default()
        }
    }
}

impl From<&FixationEvent> for RawRecord {
    fn from(fixation: &FixationEvent) -> Self {
        Self {
            x: Some(fixation.point.x),
            y: Some(fixation.point.y),
            participant: Some(fixation.participant.clone()),
            start: Some(fixation.start),
            end: Some(fixation.end),
            duration: Some(fixation.duration),
            ..Default::default()
        }
    }
}

/// How many records an image-level load had to discard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct LoadReport {
    pub gaze_dropped: usize,
    pub fixations_dropped: usize,
}

/// Everything the engine knows about one image.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ImageData {
    pub gaze: Vec<GazeSample>,
    pub fixations: Vec<FixationEvent>,
    pub scores: ScoreTable,
    pub report: LoadReport,
}

impl ImageData {
    /// Parses an image export: `gaze` (or `gaze_points`), `fixations` and
    /// `participant_scores`, each optional.
    pub fn from_json(text: &str) -> GlyphResult<Self> {
        let document: Value = serde_json::from_str(text)?;
        Ok(Self::from_value(&document))
    }

    pub fn from_value(document: &Value) -> Self {
        let (gaze, gaze_dropped) = gaze_from_value(field(document, &["gaze", "gaze_points"]));
        let (fixations, fixations_dropped) =
            fixations_from_value(field(document, &["fixations"]));
        let scores = scores_from_value(field(document, &["participant_scores", "score_participant"]));
        let report = LoadReport {
            gaze_dropped,
            fixations_dropped,
        };
        log::debug!(
            "image data: {} gaze samples, {} fixations, {} scored participants, {:?}",
            gaze.len(),
            fixations.len(),
            scores.len(),
            report
        );
        Self {
            gaze,
            fixations,
            scores,
            report,
        }
    }

    /// Every participant with a point or a score, in participant order.
    pub fn participants(&self) -> Vec<ParticipantId> {
        let mut ids: Vec<ParticipantId> = self
            .gaze
            .iter()
            .map(|g| g.participant.clone())
            .chain(self.fixations.iter().map(|f| f.participant.clone()))
            .chain(self.scores.keys().cloned())
            .collect();
        ids.sort_by(|a, b| crate::core_modules::records::compare_participants(a, b));
        ids.dedup();
        ids
    }
}

/// What the selection fetch hands to the radial glyph.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GlyphPayload {
    /// Records chosen for analysis by the source, if it chose.
    pub points_for_analysis: Option<Vec<RawRecord>>,
    pub fixations: Option<Vec<RawRecord>>,
    pub participant_scores: ScoreTable,
}

impl GlyphPayload {
    pub fn from_json(text: &str) -> GlyphResult<Self> {
        let document: Value = serde_json::from_str(text)?;
        Ok(Self::from_value(&document))
    }

    pub fn from_value(document: &Value) -> Self {
        Self {
            points_for_analysis: field(document, &["data_for_analysis", "points_for_analysis"])
                .map(raw_records),
            fixations: field(document, &["fixations"]).map(raw_records),
            participant_scores: scores_from_value(field(document, &["participant_scores"])),
        }
    }
}

/// Parses a JSON array of records into canonical gaze samples, counting the rejects.
pub fn gaze_from_value(value: Option<&Value>) -> (Vec<GazeSample>, usize) {
    convert(value, RawRecord::to_gaze)
}

pub fn fixations_from_value(value: Option<&Value>) -> (Vec<FixationEvent>, usize) {
    convert(value, RawRecord::to_fixation)
}

/// Accepts either an object keyed by participant id or an array of entries that carry
/// their own `participant` field.
pub fn scores_from_value(value: Option<&Value>) -> ScoreTable {
    let mut table = ScoreTable::new();
    match value {
        Some(Value::Object(entries)) => {
            for (id, entry) in entries {
                table.insert(normalize_id(id), score_info(entry));
            }
        }
        Some(Value::Array(entries)) => {
            for entry in entries {
                if let Some(id) = entry.as_object().and_then(first_participant) {
                    table.insert(id, score_info(entry));
                }
            }
        }
        _ => {}
    }
    table
}

fn convert<T>(value: Option<&Value>, to: fn(&RawRecord) -> Option<T>) -> (Vec<T>, usize) {
    let Some(items) = value.and_then(Value::as_array) else {
        return (Vec::new(), 0);
    };
    let records: Vec<T> = items
        .iter()
        .filter_map(|item| to(&RawRecord::from_value(item)))
        .collect();
    let dropped = items.len() - records.len();
    (records, dropped)
}

fn raw_records(value: &Value) -> Vec<RawRecord> {
    value
        .as_array()
        .map(|items| items.iter().map(RawRecord::from_value).collect())
        .unwrap_or_default()
}

fn field<'a>(document: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| document.get(key))
        .find(|value| !value.is_null())
}

fn score_info(entry: &Value) -> ScoreInfo {
    let Some(object) = entry.as_object() else {
        return ScoreInfo::default();
    };
    ScoreInfo {
        score: first_number(object, &["score"]),
        age: first_text(object, &["age"]),
        gender: first_text(object, &["gender", "gener"]),
        state: first_text(object, &["state"]),
    }
}

fn first_number(object: &Map<String, Value>, keys: &[&str]) -> Option<f64> {
    keys.iter().find_map(|key| match object.get(*key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    })
}

fn first_text(object: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match object.get(*key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    })
}

fn first_participant(object: &Map<String, Value>) -> Option<ParticipantId> {
    PARTICIPANT_KEYS.iter().find_map(|key| match object.get(*key)? {
        Value::String(s) if !s.trim().is_empty() => Some(normalize_id(s)),
        Value::Number(n) => Some(number_id(n)),
        _ => None,
    })
}

fn normalize_id(id: &str) -> ParticipantId {
    id.trim().to_string()
}

/// Integral ids print without a fractional part, whatever JSON number form they used.
fn number_id(n: &serde_json::Number) -> ParticipantId {
    if let Some(i) = n.as_i64() {
        return i.to_string();
    }
    if let Some(u) = n.as_u64() {
        return u.to_string();
    }
    match n.as_f64() {
        Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => (f as i64).to_string(),
        _ => n.to_string(),
    }
}
