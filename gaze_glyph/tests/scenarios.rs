use assert_matches::assert_matches;
use gaze_glyph::core_modules::colormap::TRANSPARENT;
use gaze_glyph::core_modules::direction_classifier::{DirectionClassifier, DirectionCounts};
use gaze_glyph::core_modules::radial_glyph::AnalysisSource;
use gaze_glyph::core_modules::records::{FixationEvent, Point, ScoreInfo, ScoreTable};
use gaze_glyph::core_modules::score_histogram::ScoreHistogramBuilder;
use gaze_glyph::{
    DataType, DisplaySize, EngineConfig, GlyphPayload, HeatmapRenderer, RadialGlyphModel,
    compute_glyph_model,
};

const PAYLOAD: &str = r#"{
    "data_for_analysis": [
        {"x_centroid": 100, "y_centroid": 500, "participante": 1, "start": 0, "end": 0.4, "duration": 0.4},
        {"x_centroid": 150, "y_centroid": 520, "participante": 1, "start": 1, "end": 1.2, "duration": 0.2},
        {"x_centroid": 100, "y_centroid": 300, "participante": 1, "start": 2, "end": 2.5, "duration": 0.5},
        {"x_centroid": 400, "y_centroid": 300, "participante": "2", "start": 17.5, "end": 18, "duration": 0.5},
        {"x_centroid": 400, "participante": "3", "start": 1}
    ],
    "participant_scores": {
        "1": {"score": 8},
        "2": {"score": 9},
        "3": {"score": 2},
        "4": {"score": 2},
        "5": {"score": null}
    }
}"#;

#[test]
fn worked_direction_trace() {
    let fixations: Vec<FixationEvent> = [(100.0, 500.0), (150.0, 520.0), (100.0, 300.0)]
        .iter()
        .enumerate()
        .map(|(i, &(x, y))| FixationEvent {
            point: Point::new(x, y),
            participant: "1".into(),
            duration: 0.5,
            start: i as f64,
            end: i as f64 + 0.5,
        })
        .collect();
    let counts = DirectionClassifier::default().classify(&fixations);
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
fn worked_score_histogram() {
    let scores: ScoreTable = [("1", 2.0), ("2", 2.0), ("3", 8.0), ("4", 9.0)]
        .iter()
        .map(|(id, s)| (id.to_string(), ScoreInfo::with_score(*s)))
        .collect();
    let histogram = ScoreHistogramBuilder::default().build(&scores, ["3", "4"]);
    assert_eq!(histogram.all_bins[2], 2);
    assert_eq!(histogram.all_bins[8] + histogram.all_bins[9], 2);
    assert_eq!(histogram.all_avg, 5.25);
    assert_eq!(histogram.selection_avg, 8.5);
    assert_eq!(histogram.selection_count, 2);
}

#[test]
fn empty_heatmap_is_transparent() {
    let renderer = HeatmapRenderer::new(&EngineConfig::default()).unwrap();
    let heatmap = renderer.render(&[], DisplaySize::new(120.0, 90.0).unwrap(), DataType::Gaze);
    assert_eq!(heatmap.raster.dimensions(), (120, 90));
    assert!(heatmap.raster.pixels().all(|p| *p == TRANSPARENT));
}

#[test]
fn payload_glyph_end_to_end() {
    let payload = GlyphPayload::from_json(PAYLOAD).unwrap();
    let data = compute_glyph_model(&payload, &EngineConfig::default().glyph);

    assert_matches!(data.source, AnalysisSource::PointsForAnalysis);
    assert_eq!((data.sanitize.before, data.sanitize.after), (5, 4));
    assert_eq!(data.directions.total(), 3);
    assert_eq!(data.time_buckets.histogram()[15], 1);
    assert_eq!(data.time_buckets.participants, vec!["1", "2"]);

    // Scored population: 8, 9, 2, 2. Selection: participants 1 and 2.
    assert_eq!(data.histogram.all_count, 4);
    assert_eq!(data.histogram.all_avg, 5.25);
    assert_eq!(data.histogram.selection_count, 2);
    assert_eq!(data.histogram.selection_avg, 8.5);

    let dwell: Vec<(&str, f64)> = data
        .participants
        .iter()
        .map(|p| (p.participant.as_str(), p.total_duration))
        .collect();
    assert_eq!(dwell.len(), 2);
    assert_eq!(dwell[0].0, "1");
    assert!((dwell[0].1 - 1.1).abs() < 1e-9);
}

#[test]
fn repeated_updates_are_identical() {
    let payload = GlyphPayload::from_json(PAYLOAD).unwrap();
    let mut model = RadialGlyphModel::new(EngineConfig::default().glyph).unwrap();
    let first = model.update(&payload).clone();
    let second = model.update(&payload).clone();
    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[test]
fn config_files_drive_the_engines() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("engine.toml");
    std::fs::write(&path, "[glyph]\nbucket_count = 4\n").unwrap();
    let config = EngineConfig::load(&path).unwrap();

    let payload = GlyphPayload::from_json(PAYLOAD).unwrap();
    let data = compute_glyph_model(&payload, &config.glyph);
    assert_eq!(data.time_buckets.histogram().len(), 4);
    // 17.5 s clamps into the last of four buckets.
    assert_eq!(data.time_buckets.histogram()[3], 1);
}
