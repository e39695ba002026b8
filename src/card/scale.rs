//! Physical scale from a detected reference card.

use crate::card::CardDetection;
use crate::config::CardConfig;
use serde::{Deserialize, Serialize};

/// Millimeters-per-pixel ratio plus the rectified pixel dimensions it was
/// derived from. Deterministic given a detection; no lifecycle of its own.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScaleEstimate {
    pub mm_per_px: f64,
    pub rectified_width_px: f64,
    pub rectified_height_px: f64,
}

pub struct ScaleEstimator {
    reference_width_mm: f64,
    reference_height_mm: f64,
}

impl ScaleEstimator {
    pub fn new(reference_width_mm: f64, reference_height_mm: f64) -> Self {
        Self {
            reference_width_mm,
            reference_height_mm,
        }
    }

    pub fn from_config(config: &CardConfig) -> Self {
        Self::new(config.reference_width_mm, config.reference_height_mm)
    }

    /// Average the two width edges and the two height edges, then average
    /// the per-axis mm/px ratios. Fails on a degenerate pixel dimension.
    pub fn estimate(&self, card: &CardDetection) -> Option<ScaleEstimate> {
        let c = &card.corners_px;
        let width_px = (c[0].distance_to(c[1]) + c[2].distance_to(c[3])) / 2.0;
        let height_px = (c[0].distance_to(c[3]) + c[1].distance_to(c[2])) / 2.0;
        if width_px <= 1.0 || height_px <= 1.0 {
            return None;
        }

        let mm_per_px =
            (self.reference_width_mm / width_px + self.reference_height_mm / height_px) / 2.0;
        Some(ScaleEstimate {
            mm_per_px,
            rectified_width_px: width_px,
            rectified_height_px: height_px,
        })
    }
}

impl Default for ScaleEstimator {
    /// ID-1 card (85.60 x 53.98 mm).
    fn default() -> Self {
        Self::new(85.60, 53.98)
    }
}
