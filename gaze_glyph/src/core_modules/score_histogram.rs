// THEORY:
// The `ScoreHistogramBuilder` compares how the participants inside a selection scored the
// image against everyone who viewed it. Both populations are binned into ten unit-wide
// bins and averaged, giving the inner ring of the radial glyph.
//
// Participants without a usable score (null or non-finite) are left out of both
// populations, but may still have contributed points to the selection. An empty
// population reports the configured neutral mean instead of NaN, so the comparison
// curve can always be drawn.

use crate::core_modules::records::ScoreTable;
use serde::Serialize;
use std::collections::BTreeSet;

pub const BIN_COUNT: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreHistogram {
    pub all_bins: [usize; BIN_COUNT],
    pub selection_bins: [usize; BIN_COUNT],
    pub all_avg: f64,
    pub selection_avg: f64,
    pub all_count: usize,
    pub selection_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreHistogramBuilder {
    empty_mean: f64,
}

impl Default for ScoreHistogramBuilder {
    fn default() -> Self {
        Self { empty_mean: 5.0 }
    }
}

impl ScoreHistogramBuilder {
    pub fn new(empty_mean: f64) -> Self {
        Self { empty_mean }
    }

    /// Bins every scored participant and the scored subset of `selection`.
    pub fn build<'a>(
        &self,
        scores: &ScoreTable,
        selection: impl IntoIterator<Item = &'a str>,
    ) -> ScoreHistogram {
        let unusable = scores
            .values()
            .filter(|info| info.score.is_some() && info.valid_score().is_none())
            .count();
        if unusable > 0 {
            log::warn!("{unusable} participant scores are not finite and were skipped");
        }

        let all: Vec<f64> = scores.values().filter_map(|info| info.valid_score()).collect();

        let selected: BTreeSet<&str> = selection.into_iter().collect();
        let in_selection: Vec<f64> = selected
            .iter()
            .filter_map(|id| scores.get(*id))
            .filter_map(|info| info.valid_score())
            .collect();

        ScoreHistogram {
            all_bins: bin_scores(&all),
            selection_bins: bin_scores(&in_selection),
            all_avg: self.mean(&all),
            selection_avg: self.mean(&in_selection),
            all_count: all.len(),
            selection_count: in_selection.len(),
        }
    }

    fn mean(&self, values: &[f64]) -> f64 {
        if values.is_empty() {
            self.empty_mean
        } else {
            values.iter().sum::<f64>() / values.len() as f64
        }
    }
}

/// The bin of a score: `floor(score)` clamped to `0..=9`, so a perfect 10 shares the top bin.
pub fn bin_of(score: f64) -> usize {
    score.floor().clamp(0.0, (BIN_COUNT - 1) as f64) as usize
}

fn bin_scores(values: &[f64]) -> [usize; BIN_COUNT] {
    let mut bins = [0; BIN_COUNT];
    for value in values {
        bins[bin_of(*value)] += 1;
    }
    bins
}
