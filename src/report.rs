//! Measurement report contract.
//!
//! A thin, serializable presentation of a [`SizeResult`] for embedding
//! callers: the size recommendation, a coarse confidence level, and
//! human-consumable warnings derived from the internal reason tags. The
//! core pipeline never depends on this module.

use crate::aggregate::{SizeResult, SIZE_NOT_AVAILABLE};
use crate::quality::FailReason;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConfidenceLevel {
    High,
    Medium,
    Low,
}

impl ConfidenceLevel {
    pub fn from_score(score: f32) -> Self {
        if score >= 0.75 {
            ConfidenceLevel::High
        } else if score >= 0.5 {
            ConfidenceLevel::Medium
        } else {
            ConfidenceLevel::Low
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MeasurementWarning {
    LowLight,
    HighMotion,
    Blurry,
    ReferenceNotFound,
    ReferenceLowConfidence,
    HandNotFound,
    HandLowConfidence,
    HandPoseUnstable,
    NotEnoughValidFrames,
    HighVarianceResults,
}

impl MeasurementWarning {
    /// Map an internal reason tag to its caller-facing warning, if any.
    pub fn from_reason(reason: FailReason) -> Option<Self> {
        match reason {
            FailReason::ExposureClipHigh
            | FailReason::ExposureClipLow
            | FailReason::ExposureMeanOut
            | FailReason::ExposureLowContrast => Some(MeasurementWarning::LowLight),
            FailReason::MotionHigh => Some(MeasurementWarning::HighMotion),
            FailReason::BlurLow => Some(MeasurementWarning::Blurry),
            FailReason::CardNotFound => Some(MeasurementWarning::ReferenceNotFound),
            FailReason::CardLowConf | FailReason::ScaleFail => {
                Some(MeasurementWarning::ReferenceLowConfidence)
            }
            FailReason::NoHand | FailReason::HandNotFound => Some(MeasurementWarning::HandNotFound),
            FailReason::LowConf => Some(MeasurementWarning::HandLowConfidence),
            FailReason::RoiBad | FailReason::WidthFail | FailReason::HandNotStable => {
                Some(MeasurementWarning::HandPoseUnstable)
            }
            FailReason::NotEnoughStableFrames => Some(MeasurementWarning::NotEnoughValidFrames),
        }
    }
}

/// Final response surface handed to an embedding caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementReport {
    pub session_id: String,
    pub measured: bool,
    pub ring_size: String,
    pub finger_width_mm: f64,
    pub mm_per_px: f64,
    pub confidence: f32,
    pub confidence_level: ConfidenceLevel,
    pub warnings: Vec<MeasurementWarning>,
    pub debug_metrics: HashMap<String, serde_json::Value>,
}

impl MeasurementReport {
    pub fn from_size_result(session_id: impl Into<String>, result: &SizeResult) -> Self {
        let mut warnings = Vec::new();
        for reason in &result.reasons {
            if let Some(warning) = MeasurementWarning::from_reason(*reason) {
                if !warnings.contains(&warning) {
                    warnings.push(warning);
                }
            }
        }

        Self {
            session_id: session_id.into(),
            measured: result.ring_size_suggestion != SIZE_NOT_AVAILABLE,
            ring_size: result.ring_size_suggestion.clone(),
            finger_width_mm: result.finger_width_mm,
            mm_per_px: result.mm_per_px,
            confidence: result.confidence,
            confidence_level: ConfidenceLevel::from_score(result.confidence),
            warnings,
            debug_metrics: result.debug_metrics.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failed_result() -> SizeResult {
        SizeResult {
            mm_per_px: 0.0,
            finger_width_mm: 0.0,
            ring_size_suggestion: SIZE_NOT_AVAILABLE.to_string(),
            confidence: 0.1,
            reasons: vec![FailReason::CardNotFound, FailReason::HandNotStable],
            debug_metrics: HashMap::new(),
        }
    }

    #[test]
    fn test_failed_result_maps_to_low_level_report() {
        let report = MeasurementReport::from_size_result("1080", &failed_result());
        assert!(!report.measured);
        assert_eq!(report.confidence_level, ConfidenceLevel::Low);
        assert!(report
            .warnings
            .contains(&MeasurementWarning::ReferenceNotFound));
        assert!(report
            .warnings
            .contains(&MeasurementWarning::HandPoseUnstable));
    }

    #[test]
    fn test_confidence_levels() {
        assert_eq!(ConfidenceLevel::from_score(0.9), ConfidenceLevel::High);
        assert_eq!(ConfidenceLevel::from_score(0.6), ConfidenceLevel::Medium);
        assert_eq!(ConfidenceLevel::from_score(0.2), ConfidenceLevel::Low);
    }

    #[test]
    fn test_warnings_deduplicated() {
        let mut result = failed_result();
        result.reasons = vec![
            FailReason::ExposureClipHigh,
            FailReason::ExposureMeanOut,
            FailReason::BlurLow,
        ];
        let report = MeasurementReport::from_size_result("1", &result);
        assert_eq!(
            report.warnings,
            vec![MeasurementWarning::LowLight, MeasurementWarning::Blurry]
        );
    }

    #[test]
    fn test_report_serializes_with_wire_enums() {
        let report = MeasurementReport::from_size_result("42", &failed_result());
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"LOW\""));
        assert!(json.contains("REFERENCE_NOT_FOUND"));
    }
}
