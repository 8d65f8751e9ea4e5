// THEORY:
// The dwell summary answers "who looked at this region, and for how long". Fixation
// durations are summed per participant and joined with the score table so a renderer
// can show each participant's score next to their dwell time.
//
// Durations that are missing or not finite count as a short default dwell instead of
// poisoning the sum.

use crate::core_modules::records::{EyeRecord, ParticipantId, ScoreInfo, ScoreTable, compare_participants};
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParticipantDwell {
    pub participant: ParticipantId,
    /// Summed fixation duration in seconds.
    pub total_duration: f64,
    pub fixations: usize,
    pub score: Option<f64>,
    pub has_score: bool,
    pub age: Option<String>,
    pub gender: Option<String>,
    pub state: Option<String>,
}

/// Summarizes dwell per participant, in participant order.
pub fn summarize<R: EyeRecord>(records: &[R], scores: &ScoreTable, missing_duration: f64) -> Vec<ParticipantDwell> {
    let mut totals: HashMap<&str, (f64, usize)> = HashMap::new();
    for record in records {
        let duration = record
            .duration()
            .filter(|d| d.is_finite())
            .unwrap_or(missing_duration);
        let entry = totals.entry(record.participant()).or_insert((0.0, 0));
        entry.0 += duration;
        entry.1 += 1;
    }

    let mut summary: Vec<ParticipantDwell> = totals
        .into_iter()
        .map(|(participant, (total_duration, fixations))| {
            let info = scores.get(participant).cloned().unwrap_or_default();
            let ScoreInfo {
                score,
                age,
                gender,
                state,
            } = info;
            let score = score.filter(|s| s.is_finite());
            ParticipantDwell {
                participant: participant.to_string(),
                total_duration,
                fixations,
                has_score: score.is_some(),
                score,
                age,
                gender,
                state,
            }
        })
        .collect();
    summary.sort_by(|a, b| compare_participants(&a.participant, &b.participant));
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::records::{FixationEvent, Point};

    fn fixation(participant: &str, duration: f64) -> FixationEvent {
        FixationEvent {
            point: Point::new(0.0, 0.0),
            participant: participant.into(),
            duration,
            start: 0.0,
            end: duration,
        }
    }

    #[test]
    fn durations_sum_per_participant_in_id_order() {
        let records = vec![fixation("10", 0.5), fixation("2", 0.25), fixation("10", 1.0)];
        let mut scores = ScoreTable::new();
        scores.insert("10".into(), ScoreInfo::with_score(7.0));
        let summary = summarize(&records, &scores, 0.1);

        assert_eq!(summary.len(), 2);
        assert_eq!(summary[0].participant, "2");
        assert!(!summary[0].has_score);
        assert_eq!(summary[1].participant, "10");
        assert_eq!(summary[1].total_duration, 1.5);
        assert_eq!(summary[1].fixations, 2);
        assert_eq!(summary[1].score, Some(7.0));
        assert!(summary[1].has_score);
    }

    #[test]
    fn non_finite_durations_use_the_default() {
        let records = vec![fixation("1", f64::NAN), fixation("1", f64::INFINITY)];
        let summary = summarize(&records, &ScoreTable::new(), 0.1);
        assert!((summary[0].total_duration - 0.2).abs() < 1e-12);
    }

    #[test]
    fn empty_input_is_empty_summary() {
        assert!(summarize::<FixationEvent>(&[], &ScoreTable::new(), 0.1).is_empty());
    }
}
