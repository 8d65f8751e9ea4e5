// THEORY:
// The `DirectionClassifier` measures where the eye travelled between consecutive
// fixations of a selection, not where the fixations sit. Each saccade vector is reduced
// to one of four compass directions and counted.
//
// Key architectural principles:
// 1.  **Chronology first**: records are re-sorted by onset before pairing, so any
//     permutation of the same input yields the same counts. Ties on onset fall back to
//     participant, then position, which makes the order total.
// 2.  **Screen convention**: data space grows upward while "Down" means down on screen,
//     so the vertical component is taken as `previous.y - current.y`. A fixation that
//     moves to a smaller data-space y moves down.
// 3.  **Noise floor**: vectors shorter than the floor on both axes are micro-saccades and
//     are skipped. Ties between the axes go to the vertical axis.

use crate::core_modules::records::{EyeRecord, compare_participants};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// One of the four saccade directions, in screen terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Right,
    Down,
    Left,
}

impl Direction {
    pub const ALL: [Direction; 4] = [Direction::Up, Direction::Right, Direction::Down, Direction::Left];
}

/// Saccade counts per direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DirectionCounts {
    pub up: usize,
    pub right: usize,
    pub down: usize,
    pub left: usize,
}

impl DirectionCounts {
    pub fn get(&self, direction: Direction) -> usize {
        match direction {
            Direction::Up => self.up,
            Direction::Right => self.right,
            Direction::Down => self.down,
            Direction::Left => self.left,
        }
    }

    pub fn total(&self) -> usize {
        self.up + self.right + self.down + self.left
    }

    fn bump(&mut self, direction: Direction) {
        match direction {
            Direction::Up => self.up += 1,
            Direction::Right => self.right += 1,
            Direction::Down => self.down += 1,
            Direction::Left => self.left += 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionClassifier {
    noise_floor: f64,
}

impl Default for DirectionClassifier {
    fn default() -> Self {
        Self { noise_floor: 1.0 }
    }
}

impl DirectionClassifier {
    pub fn new(noise_floor: f64) -> Self {
        Self { noise_floor }
    }

    /// Classifies one screen-space displacement, or `None` for a micro-saccade.
    pub fn classify_step(&self, dx: f64, dy_screen: f64) -> Option<Direction> {
        if dx.abs() < self.noise_floor && dy_screen.abs() < self.noise_floor {
            return None;
        }
        Some(if dx.abs() > dy_screen.abs() {
            if dx > 0.0 { Direction::Right } else { Direction::Left }
        } else if dy_screen > 0.0 {
            Direction::Down
        } else {
            Direction::Up
        })
    }

    /// Counts the saccades between chronologically consecutive records.
    pub fn classify<R: EyeRecord>(&self, records: &[R]) -> DirectionCounts {
        let mut counts = DirectionCounts::default();
        if records.len() < 2 {
            return counts;
        }

        let mut ordered: Vec<&R> = records.iter().collect();
        ordered.sort_by(|a, b| chronological(*a, *b));

        let mut skipped = 0usize;
        for pair in ordered.windows(2) {
            let (prev, curr) = (pair[0].point(), pair[1].point());
            match self.classify_step(curr.x - prev.x, prev.y - curr.y) {
                Some(direction) => counts.bump(direction),
                None => skipped += 1,
            }
        }
        log::trace!(
            "{} saccades classified, {} below the noise floor",
            counts.total(),
            skipped
        );
        counts
    }
}

fn chronological<R: EyeRecord>(a: &R, b: &R) -> Ordering {
    let onset = |r: &R| r.onset().unwrap_or(0.0);
    onset(a)
        .total_cmp(&onset(b))
        .then_with(|| compare_participants(a.participant(), b.participant()))
        .then_with(|| a.point().x.total_cmp(&b.point().x))
        .then_with(|| a.point().y.total_cmp(&b.point().y))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::records::{FixationEvent, Point};

    fn fixation(x: f64, y: f64, start: f64) -> FixationEvent {
        FixationEvent {
            point: Point::new(x, y),
            participant: "1".into(),
            duration: 0.5,
            start,
            end: start + 0.5,
        }
    }

    #[test]
    fn worked_trace_yields_one_right_and_one_down() {
        let records = vec![
            fixation(100.0, 500.0, 0.0),
            fixation(150.0, 520.0, 1.0),
            fixation(100.0, 300.0, 2.0),
        ];
        let counts = DirectionClassifier::default().classify(&records);
        assert_eq!(
            counts,
            DirectionCounts {
                right: 1,
                down: 1,
                ..Default::default()
            }
        );
    }

    #[test]
    fn input_order_does_not_matter() {
        let records = vec![
            fixation(100.0, 300.0, 2.0),
            fixation(100.0, 500.0, 0.0),
            fixation(150.0, 520.0, 1.0),
        ];
        let counts = DirectionClassifier::default().classify(&records);
        assert_eq!(counts.right, 1);
        assert_eq!(counts.down, 1);
    }

    #[test]
    fn micro_saccades_are_skipped() {
        let records = vec![
            fixation(100.0, 100.0, 0.0),
            fixation(100.5, 100.9, 1.0),
            fixation(90.0, 100.9, 2.0),
        ];
        let counts = DirectionClassifier::default().classify(&records);
        assert_eq!(counts.total(), 1);
        assert_eq!(counts.left, 1);
    }

    #[test]
    fn fewer_than_two_records_is_all_zero() {
        let classifier = DirectionClassifier::default();
        assert_eq!(classifier.classify::<FixationEvent>(&[]), DirectionCounts::default());
        assert_eq!(
            classifier.classify(&[fixation(1.0, 1.0, 0.0)]),
            DirectionCounts::default()
        );
    }

    #[test]
    fn axis_ties_go_vertical() {
        let classifier = DirectionClassifier::default();
        assert_eq!(classifier.classify_step(5.0, 5.0), Some(Direction::Down));
        assert_eq!(classifier.classify_step(-5.0, -5.0), Some(Direction::Up));
        assert_eq!(classifier.classify_step(0.2, -0.99), None);
        assert_eq!(classifier.classify_step(0.0, 1.0), Some(Direction::Down));
    }

    #[test]
    fn counts_serialize_with_compass_names() {
        let counts = DirectionCounts {
            up: 1,
            right: 2,
            down: 3,
            left: 4,
        };
        let json = serde_json::to_value(counts).unwrap();
        assert_eq!(json["Up"], 1);
        assert_eq!(json["Left"], 4);
        assert_eq!(Direction::ALL.map(|d| counts.get(d)), [1, 2, 3, 4]);
    }
}
