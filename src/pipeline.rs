//! Burst measurement pipeline.
//!
//! Consumes the frames retained by a completed capture burst and runs each
//! through card detection, scale estimation, hand landmark detection and
//! width measurement before aggregating. Pure given fixed inputs: running
//! the same burst twice yields the identical result.

use crate::aggregate::{FrameMeasurement, SizeAggregator, SizeResult};
use crate::autocapture::CaptureResult;
use crate::card::{CardDetector, EdgeCardDetector, ScaleEstimator};
use crate::config::RingGaugeConfig;
use crate::measure::{FingerWidthMeasurer, HandLandmarker};
use crate::quality::{dedup_reasons, FailReason};
use crate::types::FramePacket;
use crossbeam_channel::{Receiver, Sender};
use std::thread;

pub struct RingSizeEstimator<C: CardDetector, H: HandLandmarker> {
    card_detector: C,
    scale_estimator: ScaleEstimator,
    hand_engine: H,
    width_measurer: FingerWidthMeasurer,
    aggregator: SizeAggregator,
}

impl<H: HandLandmarker> RingSizeEstimator<EdgeCardDetector, H> {
    /// Estimator with the built-in edge-based card detector.
    pub fn from_config(config: &RingGaugeConfig, hand_engine: H) -> Self {
        Self::new(
            EdgeCardDetector::new(config.card.clone()),
            ScaleEstimator::from_config(&config.card),
            hand_engine,
            FingerWidthMeasurer::new(config.measure.clone()),
            SizeAggregator::new(config.aggregate.clone()),
        )
    }
}

impl<C: CardDetector, H: HandLandmarker> RingSizeEstimator<C, H> {
    pub fn new(
        card_detector: C,
        scale_estimator: ScaleEstimator,
        hand_engine: H,
        width_measurer: FingerWidthMeasurer,
        aggregator: SizeAggregator,
    ) -> Self {
        Self {
            card_detector,
            scale_estimator,
            hand_engine,
            width_measurer,
            aggregator,
        }
    }

    /// Run the full measurement chain over a burst.
    ///
    /// Frames failing any stage are skipped with a per-stage reason tag;
    /// those tags are attached to the final result only when it would
    /// otherwise carry no reasons at all.
    pub fn estimate(&self, frames: &[FramePacket]) -> SizeResult {
        let mut measurements = Vec::with_capacity(frames.len());
        let mut discard_reasons = Vec::new();

        for frame in frames {
            let Some(card) = self.card_detector.detect(frame) else {
                discard_reasons.push(FailReason::CardNotFound);
                continue;
            };
            let Some(scale) = self.scale_estimator.estimate(&card) else {
                discard_reasons.push(FailReason::ScaleFail);
                continue;
            };
            let Some(hand) = self.hand_engine.detect(frame) else {
                discard_reasons.push(FailReason::HandNotFound);
                continue;
            };
            let Some(width) = self.width_measurer.measure(frame, &hand, scale.mm_per_px) else {
                discard_reasons.push(FailReason::WidthFail);
                continue;
            };

            measurements.push(FrameMeasurement {
                timestamp_ms: frame.timestamp_ms,
                mm_per_px: scale.mm_per_px,
                width_mm: width.width_mm,
                card_confidence: card.confidence,
                hand_confidence: hand.confidence,
                quality_score: frame.quality_score,
            });
        }

        log::debug!(
            "Burst pipeline: {} of {} frames measured",
            measurements.len(),
            frames.len()
        );

        let result = self.aggregator.aggregate(&measurements);
        if result.reasons.is_empty() && !discard_reasons.is_empty() {
            return SizeResult {
                reasons: dedup_reasons(discard_reasons),
                ..result
            };
        }
        result
    }
}

/// Decode a completed burst into pipeline input, carrying each retained
/// frame's quality score along.
pub fn frames_from_capture(result: &CaptureResult) -> Vec<FramePacket> {
    result
        .top_frames
        .iter()
        .map(|f| FramePacket::from_jpeg(f.timestamp_ms, f.score, f.jpeg.clone()))
        .collect()
}

/// Run the estimator on its own worker thread, fed by completed bursts.
///
/// The worker exits when the burst channel closes or the result receiver
/// goes away; dropping the sender side is the teardown signal, so no
/// callback can fire after the session is gone.
pub fn spawn_estimator_worker<C, H>(
    estimator: RingSizeEstimator<C, H>,
    bursts: Receiver<CaptureResult>,
    results: Sender<SizeResult>,
) -> thread::JoinHandle<()>
where
    C: CardDetector + Send + 'static,
    H: HandLandmarker + Send + 'static,
{
    thread::spawn(move || {
        for burst in bursts.iter() {
            log::info!(
                "Processing burst {} ({} frames)",
                burst.session_id,
                burst.top_frames.len()
            );
            let frames = frames_from_capture(&burst);
            let result = estimator.estimate(&frames);
            if results.send(result).is_err() {
                break;
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::SIZE_NOT_AVAILABLE;
    use crate::card::CardDetection;
    use crate::measure::HandLandmarks;
    use crate::testing::blank_gray;
    use crate::types::Point;

    struct NoCard;
    impl CardDetector for NoCard {
        fn detect(&self, _frame: &FramePacket) -> Option<CardDetection> {
            None
        }
    }

    struct NoHand;
    impl HandLandmarker for NoHand {
        fn detect(&self, _frame: &FramePacket) -> Option<HandLandmarks> {
            None
        }
    }

    struct FixedCard(f32);
    impl CardDetector for FixedCard {
        fn detect(&self, _frame: &FramePacket) -> Option<CardDetection> {
            Some(CardDetection {
                corners_px: [
                    Point::new(100.0, 100.0),
                    Point::new(400.0, 100.0),
                    Point::new(400.0, 289.0),
                    Point::new(100.0, 289.0),
                ],
                aspect_score: 1.0,
                angle_score: 1.0,
                area_score: 0.2,
                confidence: self.0,
            })
        }
    }

    fn gray_frame(ts: u64) -> FramePacket {
        FramePacket::from_gray(ts, 0.8, blank_gray(640, 480, 128))
    }

    #[test]
    fn test_missing_card_surfaces_reason() {
        let config = RingGaugeConfig::default();
        let estimator = RingSizeEstimator::new(
            NoCard,
            ScaleEstimator::from_config(&config.card),
            NoHand,
            FingerWidthMeasurer::new(config.measure.clone()),
            SizeAggregator::new(config.aggregate.clone()),
        );

        let result = estimator.estimate(&[gray_frame(1), gray_frame(2)]);
        assert_eq!(result.ring_size_suggestion, SIZE_NOT_AVAILABLE);
        assert!(result.reasons.contains(&FailReason::CardNotFound));
    }

    #[test]
    fn test_missing_hand_recorded_per_discarded_frame() {
        let config = RingGaugeConfig::default();
        let estimator = RingSizeEstimator::new(
            FixedCard(0.9),
            ScaleEstimator::from_config(&config.card),
            NoHand,
            FingerWidthMeasurer::new(config.measure.clone()),
            SizeAggregator::new(config.aggregate.clone()),
        );

        let result = estimator.estimate(&[gray_frame(1), gray_frame(2), gray_frame(3)]);
        // Aggregation fails first (no measurements), so its own reasons win
        // over the per-frame discard tags.
        assert!(result.reasons.contains(&FailReason::CardNotFound));
        assert!(result.reasons.contains(&FailReason::HandNotStable));
    }

    #[test]
    fn test_empty_burst_fails_cleanly() {
        let config = RingGaugeConfig::default();
        let estimator = RingSizeEstimator::from_config(&config, NoHand);
        let result = estimator.estimate(&[]);
        assert_eq!(result.ring_size_suggestion, SIZE_NOT_AVAILABLE);
        assert!((result.confidence - 0.1).abs() < 1e-4);
    }
}
