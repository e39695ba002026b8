//! Burst pipeline testing
//!
//! Exercises the offline measurement chain on synthetic scenes: card
//! detection, scale estimation, width measurement and aggregation,
//! including the documented failure shapes.

use ringgauge::aggregate::{FrameMeasurement, SizeAggregator, SIZE_NOT_AVAILABLE};
use ringgauge::card::CardDetector;
use ringgauge::config::RingGaugeConfig;
use ringgauge::quality::FailReason;
use ringgauge::testing::{blank_gray, card_scene, measurement_scene, FakeHandLandmarker};
use ringgauge::types::{FramePacket, PixelRect};
use ringgauge::{EdgeCardDetector, RingSizeEstimator, ScaleEstimator};

fn scene_frames(count: u64) -> Vec<FramePacket> {
    (0..count)
        .map(|i| FramePacket::from_gray(1_000 + i * 40, 0.8, measurement_scene(640, 480)))
        .collect()
}

#[test]
fn test_detector_finds_synthetic_card_and_scale_matches() {
    let config = RingGaugeConfig::default();
    let detector = EdgeCardDetector::new(config.card.clone());

    // 224x141 px card: the ID-1 aspect at ~0.382 mm/px.
    let card = PixelRect::new(208, 172, 432, 313);
    let frame = FramePacket::from_gray(0, 1.0, card_scene(640, 480, card, 210, 45));
    let detection = detector.detect(&frame).expect("card detected");
    assert!(detection.confidence >= 0.75);

    let scale = ScaleEstimator::from_config(&config.card)
        .estimate(&detection)
        .expect("scale estimate");
    assert!(
        (scale.mm_per_px - 0.382).abs() < 0.03,
        "mm/px was {}",
        scale.mm_per_px
    );
}

#[test]
fn test_detector_rejects_blank_frame() {
    let config = RingGaugeConfig::default();
    let detector = EdgeCardDetector::new(config.card.clone());
    let frame = FramePacket::from_gray(0, 1.0, blank_gray(640, 480, 200));
    assert!(detector.detect(&frame).is_none());
}

#[test]
fn test_full_pipeline_produces_confident_size() {
    let mut config = RingGaugeConfig::default();
    // Decouple the aggregate floor from the exact synthetic detector score.
    config.aggregate.card_min_confidence = 0.7;
    let estimator = RingSizeEstimator::from_config(&config, FakeHandLandmarker);

    let result = estimator.estimate(&scene_frames(6));
    assert_ne!(result.ring_size_suggestion, SIZE_NOT_AVAILABLE);
    assert!(
        result.confidence > 0.5,
        "confidence was {}",
        result.confidence
    );
    assert!(result.finger_width_mm > 5.0 && result.finger_width_mm < 35.0);
    assert!(result.reasons.is_empty(), "reasons: {:?}", result.reasons);
}

#[test]
fn test_pipeline_is_idempotent() {
    let config = RingGaugeConfig::default();
    let estimator = RingSizeEstimator::from_config(&config, FakeHandLandmarker);

    let frames = scene_frames(4);
    let first = estimator.estimate(&frames);
    let second = estimator.estimate(&frames);
    assert_eq!(first, second);
}

#[test]
fn test_pipeline_without_card_reports_reason() {
    let config = RingGaugeConfig::default();
    let estimator = RingSizeEstimator::from_config(&config, FakeHandLandmarker);

    // Finger but no reference card anywhere in the frame.
    let frames: Vec<FramePacket> = (0..4)
        .map(|i| {
            let gray = image::GrayImage::from_fn(640, 480, |x, _| {
                if (319..351).contains(&x) {
                    image::Luma([45u8])
                } else {
                    image::Luma([210u8])
                }
            });
            FramePacket::from_gray(1_000 + i * 40, 0.8, gray)
        })
        .collect();

    let result = estimator.estimate(&frames);
    assert_eq!(result.ring_size_suggestion, SIZE_NOT_AVAILABLE);
    assert!(result.reasons.contains(&FailReason::CardNotFound));
}

#[test]
fn test_aggregator_scenarios_match_documented_shapes() {
    // Below the minimum: fixed low-confidence failure.
    let aggregator = SizeAggregator::default();
    let single = vec![FrameMeasurement {
        timestamp_ms: 1_000,
        mm_per_px: 0.09,
        width_mm: 17.4,
        card_confidence: 0.6,
        hand_confidence: 0.9,
        quality_score: 0.8,
    }];
    let result = aggregator.aggregate(&single);
    assert_eq!(result.ring_size_suggestion, SIZE_NOT_AVAILABLE);
    assert!((result.confidence - 0.1).abs() < 1e-4);
    assert!(result.reasons.contains(&FailReason::CardNotFound));
    assert!(result.reasons.contains(&FailReason::HandNotStable));

    // Four consistent measurements: confident non-failure result.
    let mut config = RingGaugeConfig::default().aggregate;
    config.stable_frames = 4;
    let aggregator = SizeAggregator::new(config);
    let consistent: Vec<FrameMeasurement> = [17.7, 17.8, 17.9, 17.8]
        .iter()
        .zip([(0.90, 0.91), (0.92, 0.95), (0.88, 0.89), (0.90, 0.90)])
        .map(|(&width_mm, (card, hand))| FrameMeasurement {
            timestamp_ms: 1_000,
            mm_per_px: 0.09,
            width_mm,
            card_confidence: card,
            hand_confidence: hand,
            quality_score: 0.8,
        })
        .collect();
    let result = aggregator.aggregate(&consistent);
    assert_ne!(result.ring_size_suggestion, SIZE_NOT_AVAILABLE);
    assert!(result.confidence > 0.5);
    assert!(result.finger_width_mm > 17.5);
}
