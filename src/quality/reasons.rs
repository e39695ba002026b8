//! Failure reason tags attached to quality and measurement results.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Soft-failure tags. Per-frame tags never stop the pipeline, they only
/// block state-machine progression; burst-level tags explain why frames
/// were discarded or why the final result is low-confidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailReason {
    // Per-frame
    NoHand,
    LowConf,
    RoiBad,
    BlurLow,
    MotionHigh,
    ExposureClipHigh,
    ExposureClipLow,
    ExposureMeanOut,
    ExposureLowContrast,
    CardNotFound,
    CardLowConf,
    // Burst-level
    ScaleFail,
    HandNotFound,
    WidthFail,
    HandNotStable,
    NotEnoughStableFrames,
}

impl FailReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailReason::NoHand => "NO_HAND",
            FailReason::LowConf => "LOW_CONF",
            FailReason::RoiBad => "ROI_BAD",
            FailReason::BlurLow => "BLUR_LOW",
            FailReason::MotionHigh => "MOTION_HIGH",
            FailReason::ExposureClipHigh => "EXPOSURE_CLIP_HIGH",
            FailReason::ExposureClipLow => "EXPOSURE_CLIP_LOW",
            FailReason::ExposureMeanOut => "EXPOSURE_MEAN_OUT",
            FailReason::ExposureLowContrast => "EXPOSURE_LOW_CONTRAST",
            FailReason::CardNotFound => "CARD_NOT_FOUND",
            FailReason::CardLowConf => "CARD_LOW_CONF",
            FailReason::ScaleFail => "SCALE_FAIL",
            FailReason::HandNotFound => "HAND_NOT_FOUND",
            FailReason::WidthFail => "WIDTH_FAIL",
            FailReason::HandNotStable => "HAND_NOT_STABLE",
            FailReason::NotEnoughStableFrames => "NOT_ENOUGH_STABLE_FRAMES",
        }
    }
}

impl fmt::Display for FailReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Remove duplicate tags while keeping first-occurrence order.
pub fn dedup_reasons(reasons: Vec<FailReason>) -> Vec<FailReason> {
    let mut seen = Vec::with_capacity(reasons.len());
    for reason in reasons {
        if !seen.contains(&reason) {
            seen.push(reason);
        }
    }
    seen
}
