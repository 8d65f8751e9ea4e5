// THEORY:
// The `TimeBucketAggregator` slices a selection into fixed-width time windows and
// remembers, per window, who was looking and what they looked at. Its output feeds the
// outer ring of the radial glyph.
//
// Key architectural principles:
// 1.  **Two clocks**: the absolute mode measures onset from the start of the recording,
//     drops negative (pre-offset) values and folds everything late into the last bucket.
//     The participant-relative mode measures onset from each participant's own earliest
//     timestamp and drops anything that falls outside the bucket range.
// 2.  **Counting is separate from geometry**: counts and detail rows are for tooltips.
//     The stack layout only cares which participants are present in a bucket, so every
//     present participant gets one equal-height band.
// 3.  **Display-ready details**: detail rows are pre-formatted strings so a renderer never
//     has to decide how to print a NaN.

use crate::config::GlyphConfig;
use crate::core_modules::records::{EyeRecord, ParticipantId, compare_participants};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// How onset times are measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BucketClock {
    /// Seconds since the start of the recording; late events clamp into the last bucket.
    Absolute,
    /// Seconds since the participant's own first timestamp; out-of-range events are dropped.
    ParticipantRelative,
}

/// One tooltip row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetailRecord {
    pub participant: ParticipantId,
    pub start: String,
    pub end: String,
    pub duration: String,
    pub x: String,
    pub y: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeBucket {
    pub index: usize,
    pub count: usize,
    pub per_participant: BTreeMap<ParticipantId, usize>,
    pub details: Vec<DetailRecord>,
}

impl TimeBucket {
    fn new(index: usize) -> Self {
        Self {
            index,
            count: 0,
            per_participant: BTreeMap::new(),
            details: Vec::new(),
        }
    }
}

/// One participant's band inside a bucket of the stacked ring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StackBand {
    pub participant: ParticipantId,
    /// Zero-based distance from the inner radius, in bands.
    pub level: usize,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeBuckets {
    pub clock: BucketClock,
    pub buckets: Vec<TimeBucket>,
    /// Every participant seen in the input, in participant order.
    pub participants: Vec<ParticipantId>,
    /// Events that landed in no bucket.
    pub dropped: usize,
}

impl TimeBuckets {
    pub fn histogram(&self) -> Vec<usize> {
        self.buckets.iter().map(|b| b.count).collect()
    }

    pub fn total(&self) -> usize {
        self.buckets.iter().map(|b| b.count).sum()
    }

    /// Per bucket, the participants with a non-zero count in ascending id order, each
    /// with its band level.
    pub fn stack_layout(&self) -> Vec<Vec<StackBand>> {
        self.buckets
            .iter()
            .map(|bucket| {
                let mut present: Vec<(&ParticipantId, usize)> = bucket
                    .per_participant
                    .iter()
                    .filter(|(_, count)| **count > 0)
                    .map(|(id, count)| (id, *count))
                    .collect();
                present.sort_by(|a, b| compare_participants(a.0, b.0));
                present
                    .into_iter()
                    .enumerate()
                    .map(|(level, (participant, count))| StackBand {
                        participant: participant.clone(),
                        level,
                        count,
                    })
                    .collect()
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeBucketAggregator {
    bucket_count: usize,
    bucket_width: f64,
    clock: BucketClock,
}

impl Default for TimeBucketAggregator {
    fn default() -> Self {
        Self::new(16, 1.0)
    }
}

impl TimeBucketAggregator {
    /// An absolute-clock aggregator.
    pub fn new(bucket_count: usize, bucket_width: f64) -> Self {
        Self {
            bucket_count,
            bucket_width,
            clock: BucketClock::Absolute,
        }
    }

    pub fn from_config(config: &GlyphConfig) -> Self {
        Self::new(config.bucket_count, config.bucket_width)
    }

    /// The fifteen one-second buckets of the per-participant timeline.
    pub fn participant_relative() -> Self {
        Self {
            bucket_count: 15,
            bucket_width: 1.0,
            clock: BucketClock::ParticipantRelative,
        }
    }

    pub fn bucket_count(&self) -> usize {
        self.bucket_count
    }

    pub fn aggregate<R: EyeRecord>(&self, records: &[R]) -> TimeBuckets {
        let mut buckets: Vec<TimeBucket> = (0..self.bucket_count).map(TimeBucket::new).collect();
        let origins = match self.clock {
            BucketClock::Absolute => HashMap::new(),
            BucketClock::ParticipantRelative => participant_origins(records),
        };

        let mut dropped = 0usize;
        for record in records {
            let slot = record.onset().filter(|t| t.is_finite()).and_then(|onset| {
                match self.clock {
                    BucketClock::Absolute => self.absolute_slot(onset),
                    BucketClock::ParticipantRelative => origins
                        .get(record.participant())
                        .and_then(|origin| self.relative_slot(onset - origin)),
                }
            });
            let Some(index) = slot else {
                dropped += 1;
                continue;
            };

            let bucket = &mut buckets[index];
            bucket.count += 1;
            *bucket
                .per_participant
                .entry(record.participant().to_string())
                .or_insert(0) += 1;
            bucket.details.push(detail_of(record));
        }

        let mut participants: Vec<ParticipantId> =
            records.iter().map(|r| r.participant().to_string()).collect();
        participants.sort_by(|a, b| compare_participants(a, b));
        participants.dedup();

        if dropped > 0 {
            log::debug!("{dropped} of {} events fell outside the time buckets", records.len());
        }
        TimeBuckets {
            clock: self.clock,
            buckets,
            participants,
            dropped,
        }
    }

    fn absolute_slot(&self, seconds: f64) -> Option<usize> {
        if seconds < 0.0 || self.bucket_count == 0 {
            return None;
        }
        let index = (seconds / self.bucket_width).floor();
        Some((index as usize).min(self.bucket_count - 1))
    }

    fn relative_slot(&self, seconds: f64) -> Option<usize> {
        let index = (seconds / self.bucket_width).floor();
        (index >= 0.0 && index < self.bucket_count as f64).then_some(index as usize)
    }
}

/// Each participant's earliest finite start or end.
fn participant_origins<R: EyeRecord>(records: &[R]) -> HashMap<&str, f64> {
    let mut origins: HashMap<&str, f64> = HashMap::new();
    for record in records {
        let stamps = [record.onset(), record.end()];
        for stamp in stamps.into_iter().flatten().filter(|t| t.is_finite()) {
            origins
                .entry(record.participant())
                .and_modify(|origin| *origin = origin.min(stamp))
                .or_insert(stamp);
        }
    }
    origins
}

fn detail_of<R: EyeRecord>(record: &R) -> DetailRecord {
    let point = record.point();
    DetailRecord {
        participant: record.participant().to_string(),
        start: fixed(record.onset(), 3),
        end: fixed(record.end(), 3),
        duration: fixed(record.duration(), 3),
        x: fixed(Some(point.x), 1),
        y: fixed(Some(point.y), 1),
    }
}

fn fixed(value: Option<f64>, decimals: usize) -> String {
    let value = value.filter(|v| v.is_finite()).unwrap_or(0.0);
    format!("{value:.decimals$}")
}
