// THEORY:
// The `PointFilter` narrows a record set down to what the user is looking at: one
// participant, one time window, one brushed rectangle. Each filter is a stateless
// function that borrows its input and returns a fresh vector, so the session's record
// arrays are never touched.
//
// Time windows carry a known ambiguity: the source mixes seconds and milliseconds.
// Raw values below 100 are read as seconds, everything else as milliseconds. The
// heuristic lives in `normalize_seconds` and nowhere else.

use crate::core_modules::records::{EyeRecord, Rect, canonical_participant};

pub mod point_filter {
    use super::*;

    /// The participant sentinel that means "no participant filter".
    pub const ALL_PARTICIPANTS: &str = "all";

    /// Values at or above this are treated as milliseconds.
    const MILLISECOND_CUTOFF: f64 = 100.0;

    /// Keeps the records of one participant. `None` or `"all"` keeps everything.
    ///
    /// Both sides are compared in canonical form, so `" 1 "` and `"1.0"` select
    /// participant `"1"`.
    pub fn by_participant<R: EyeRecord + Clone>(records: &[R], participant: Option<&str>) -> Vec<R> {
        let Some(id) = participant.map(canonical_participant) else {
            return records.to_vec();
        };
        if id == ALL_PARTICIPANTS {
            return records.to_vec();
        }
        records
            .iter()
            .filter(|r| canonical_participant(r.participant()) == id)
            .cloned()
            .collect()
    }

    /// Keeps records whose time span overlaps `[start_sec, end_sec]`.
    ///
    /// A gaze sample's span is a single instant, so this reduces to containment for gaze
    /// and to "any overlap" for fixations. Records without timing are dropped.
    pub fn by_time_window<R: EyeRecord + Clone>(records: &[R], start_sec: f64, end_sec: f64) -> Vec<R> {
        records
            .iter()
            .filter(|r| match r.span() {
                Some((start, end)) => overlaps(
                    normalize_seconds(start),
                    normalize_seconds(end),
                    start_sec,
                    end_sec,
                ),
                None => false,
            })
            .cloned()
            .collect()
    }

    /// Keeps records inside `rect`, or returns `None` if the selection is smaller than
    /// the minimum and must not be analyzed at all.
    pub fn by_rect<R: EyeRecord + Clone>(
        records: &[R],
        rect: Rect,
        min_width: f64,
        min_height: f64,
    ) -> Option<Vec<R>> {
        if !rect.is_selectable(min_width, min_height) {
            log::debug!(
                "selection {}x{} is below the {}x{} minimum, skipping",
                rect.width,
                rect.height,
                min_width,
                min_height
            );
            return None;
        }
        Some(
            records
                .iter()
                .filter(|r| rect.contains(r.point()))
                .cloned()
                .collect(),
        )
    }

    /// Reads a raw timestamp as seconds.
    pub fn normalize_seconds(raw: f64) -> f64 {
        if raw < MILLISECOND_CUTOFF {
            raw
        } else {
            raw / 1000.0
        }
    }

    fn overlaps(start: f64, end: f64, window_start: f64, window_end: f64) -> bool {
        (start >= window_start && start <= window_end)
            || (end >= window_start && end <= window_end)
            || (start <= window_start && end >= window_end)
    }
}
