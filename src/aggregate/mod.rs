//! Burst measurement aggregation.
//!
//! Combines the per-frame width measurements of one capture burst into a
//! single robust estimate: median width, a confidence score, and a
//! discrete ring-size suggestion. Too few trustworthy frames yield a
//! terminal low-confidence result with explicit reasons instead of an
//! error.

use crate::config::AggregateConfig;
use crate::quality::FailReason;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One frame's width measurement, consumed exactly once per burst.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameMeasurement {
    pub timestamp_ms: u64,
    pub mm_per_px: f64,
    pub width_mm: f64,
    pub card_confidence: f32,
    pub hand_confidence: f32,
    pub quality_score: f32,
}

/// Terminal artifact of the measurement pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SizeResult {
    pub mm_per_px: f64,
    pub finger_width_mm: f64,
    pub ring_size_suggestion: String,
    pub confidence: f32,
    pub reasons: Vec<FailReason>,
    pub debug_metrics: HashMap<String, serde_json::Value>,
}

/// VN ring sizes as (size, reference inner diameter mm) pairs. The lookup
/// compares circumferences in cm.
const VN_SIZE_TABLE: [(f64, f64); 6] = [
    (4.7, 15.0),
    (5.1, 16.0),
    (5.4, 17.0),
    (5.7, 18.0),
    (6.1, 19.0),
    (6.4, 20.0),
];

/// The "no usable result" suggestion.
pub const SIZE_NOT_AVAILABLE: &str = "N/A";

pub struct SizeAggregator {
    config: AggregateConfig,
}

impl SizeAggregator {
    pub fn new(config: AggregateConfig) -> Self {
        Self { config }
    }

    /// Aggregate a burst's measurements.
    ///
    /// Frames below the card or hand confidence floors are discarded
    /// first. Fewer survivors than the minimum yield the fixed failure
    /// result; otherwise the median width is mapped to a size label and a
    /// weighted confidence is derived from frame count, spread and the
    /// mean detection confidences.
    pub fn aggregate(&self, measurements: &[FrameMeasurement]) -> SizeResult {
        let mut reasons = Vec::new();
        let valid: Vec<&FrameMeasurement> = measurements
            .iter()
            .filter(|m| {
                m.card_confidence >= self.config.card_min_confidence
                    && m.hand_confidence >= self.config.hand_min_confidence
            })
            .collect();

        if valid.len() < self.config.min_valid_frames {
            log::info!(
                "Aggregation failed: {} of {} measurements usable (need {})",
                valid.len(),
                measurements.len(),
                self.config.min_valid_frames
            );
            reasons.push(FailReason::CardNotFound);
            reasons.push(FailReason::HandNotStable);
            let mut debug_metrics = HashMap::new();
            debug_metrics.insert("valid_frames".to_string(), serde_json::json!(valid.len()));
            return SizeResult {
                mm_per_px: 0.0,
                finger_width_mm: 0.0,
                ring_size_suggestion: SIZE_NOT_AVAILABLE.to_string(),
                confidence: 0.1,
                reasons,
                debug_metrics,
            };
        }

        let mut widths: Vec<f64> = valid.iter().map(|m| m.width_mm).collect();
        widths.sort_by(f64::total_cmp);
        let median = widths[widths.len() / 2];
        let mean = widths.iter().sum::<f64>() / widths.len() as f64;
        let variance =
            widths.iter().map(|w| (w - mean) * (w - mean)).sum::<f64>() / widths.len() as f64;
        let stddev = variance.sqrt();

        if valid.len() < self.config.stable_frames {
            reasons.push(FailReason::NotEnoughStableFrames);
        }

        let conf_count =
            (valid.len() as f32 / self.config.stable_frames as f32).clamp(0.0, 1.0);
        let conf_spread = ((1.0 - stddev / 2.0) as f32).clamp(0.0, 1.0);
        let conf_card = (valid.iter().map(|m| m.card_confidence).sum::<f32>()
            / valid.len() as f32)
            .clamp(0.0, 1.0);
        let conf_hand = (valid.iter().map(|m| m.hand_confidence).sum::<f32>()
            / valid.len() as f32)
            .clamp(0.0, 1.0);

        let confidence = (0.35 * conf_count + 0.25 * conf_spread + 0.2 * conf_card
            + 0.2 * conf_hand)
            .clamp(0.0, 1.0);

        let ring_size = suggest_ring_size(median);
        log::info!(
            "Aggregated {} frames: width {:.2}mm, {} (confidence {:.2})",
            valid.len(),
            median,
            ring_size,
            confidence
        );

        let mut debug_metrics = HashMap::new();
        debug_metrics.insert("valid_frames".to_string(), serde_json::json!(valid.len()));
        debug_metrics.insert("width_std_dev".to_string(), serde_json::json!(stddev));
        debug_metrics.insert("median_width_mm".to_string(), serde_json::json!(median));

        SizeResult {
            mm_per_px: valid.iter().map(|m| m.mm_per_px).sum::<f64>() / valid.len() as f64,
            finger_width_mm: median,
            ring_size_suggestion: ring_size,
            confidence,
            reasons,
            debug_metrics,
        }
    }
}

impl Default for SizeAggregator {
    fn default() -> Self {
        Self::new(crate::config::RingGaugeConfig::default().aggregate)
    }
}

/// Map a finger width to the nearest VN ring size by circumference.
fn suggest_ring_size(width_mm: f64) -> String {
    let circumference_cm = width_mm * std::f64::consts::PI / 10.0;
    let closest = VN_SIZE_TABLE
        .iter()
        .min_by(|a, b| {
            (a.0 - circumference_cm)
                .abs()
                .total_cmp(&(b.0 - circumference_cm).abs())
        })
        .expect("size table is non-empty");
    format!("VN {:.1} (diameter {:.1}mm)", closest.0, closest.1)
}
