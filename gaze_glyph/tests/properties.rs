use gaze_glyph::core_modules::coordinate_mapper::{CoordinateMapper, DisplaySize};
use gaze_glyph::core_modules::density_grid::DensityGrid;
use gaze_glyph::core_modules::direction_classifier::DirectionClassifier;
use gaze_glyph::core_modules::records::{FixationEvent, Point};
use gaze_glyph::core_modules::time_buckets::TimeBucketAggregator;
use proptest::prelude::*;

fn fixation(x: f64, y: f64, start: f64) -> FixationEvent {
    FixationEvent {
        point: Point::new(x, y),
        participant: "1".into(),
        duration: 0.2,
        start,
        end: start + 0.2,
    }
}

proptest! {
    #[test]
    fn display_round_trip_restores_data_points(
        x in 0.0f64..800.0,
        y in 0.0f64..600.0,
        w in 1.0f64..4000.0,
        h in 1.0f64..4000.0,
    ) {
        let mapper = CoordinateMapper::default();
        let display = DisplaySize::new(w, h).unwrap();
        let back = mapper.to_data(mapper.to_display(Point::new(x, y), display), display);
        prop_assert!((back.x - x).abs() < 1e-6);
        prop_assert!((back.y - y).abs() < 1e-6);
    }

    #[test]
    fn accumulation_counts_every_in_bounds_point(
        points in prop::collection::vec((-100.0f64..900.0, -100.0f64..700.0), 0..200),
    ) {
        let mapper = CoordinateMapper::default();
        let display = DisplaySize::new(80.0, 60.0).unwrap();
        let (grid, stats) = DensityGrid::accumulate(
            points.iter().map(|&(x, y)| Point::new(x, y)),
            &mapper,
            display,
            1.0,
        );
        prop_assert_eq!(stats.accepted + stats.dropped, points.len());
        prop_assert_eq!(grid.total(), stats.accepted as f64);
    }

    #[test]
    fn blurring_never_adds_mass(
        cells in prop::collection::vec(0.0f64..5.0, 12 * 9),
        sigma in 0.5f64..4.0,
    ) {
        let grid = DensityGrid::from_cells(12, 9, cells).unwrap();
        let before = grid.total();
        let after = grid.blurred(sigma).total();
        prop_assert!(after <= before + 1e-9);
        prop_assert!(after >= 0.0);
    }

    #[test]
    fn interior_mass_survives_blurring(
        sigma in 0.5f64..4.0,
        masses in prop::collection::vec((0usize..1000, 0.1f64..5.0), 1..20),
    ) {
        const SIDE: usize = 40;
        let margin = (3.0 * sigma).ceil() as usize;
        let span = SIDE - 2 * margin;
        let mut cells = vec![0.0; SIDE * SIDE];
        for &(slot, mass) in &masses {
            let x = margin + slot % span;
            let y = margin + (slot / span) % span;
            cells[y * SIDE + x] += mass;
        }
        let grid = DensityGrid::from_cells(SIDE, SIDE, cells).unwrap();
        let before = grid.total();
        prop_assert!((grid.blurred(sigma).total() - before).abs() < 1e-9);
    }

    #[test]
    fn direction_counts_ignore_input_order(
        steps in prop::collection::vec((0.0f64..800.0, 0.0f64..600.0), 0..30),
        seed in any::<u64>(),
    ) {
        let records: Vec<FixationEvent> = steps
            .iter()
            .enumerate()
            .map(|(i, &(x, y))| fixation(x, y, i as f64))
            .collect();
        let mut shuffled = records.clone();
        // A deterministic Fisher-Yates driven by the seed.
        let mut state = seed | 1;
        for i in (1..shuffled.len()).rev() {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            shuffled.swap(i, (state % (i as u64 + 1)) as usize);
        }

        let classifier = DirectionClassifier::default();
        let ordered = classifier.classify(&records);
        prop_assert_eq!(ordered, classifier.classify(&shuffled));

        let skipped = records
            .windows(2)
            .filter(|w| {
                (w[1].point.x - w[0].point.x).abs() < 1.0 && (w[1].point.y - w[0].point.y).abs() < 1.0
            })
            .count();
        prop_assert_eq!(ordered.total(), records.len().saturating_sub(1) - skipped);
    }

    #[test]
    fn time_buckets_clamp_late_and_drop_negative(
        starts in prop::collection::vec(-20.0f64..40.0, 0..100),
    ) {
        let records: Vec<FixationEvent> = starts.iter().map(|&s| fixation(1.0, 1.0, s)).collect();
        let buckets = TimeBucketAggregator::default().aggregate(&records);
        let histogram = buckets.histogram();

        let negative = starts.iter().filter(|&&s| s < 0.0).count();
        let late = starts.iter().filter(|&&s| s >= 15.0).count();
        prop_assert_eq!(buckets.total(), starts.len() - negative);
        prop_assert_eq!(histogram[15], late);
        prop_assert!(buckets.total() <= records.len());
    }
}
