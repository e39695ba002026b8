/// Reference-card detection module
///
/// Finds the rectangular reference object (an ID-1 card by default) in a
/// frame and scores how trustworthy the detection is. The live pipeline
/// consumes detections through a staleness cache so the detector runs on
/// its own cadence, independent of the per-frame rate.
pub mod edge_detector;
pub mod scale;

pub use edge_detector::EdgeCardDetector;
pub use scale::{ScaleEstimate, ScaleEstimator};

use crate::types::{FramePacket, Point};
use serde::{Deserialize, Serialize};

/// A detected reference card.
///
/// Corners are always exactly four, ordered top-left, top-right,
/// bottom-right, bottom-left; a candidate without four corners is never
/// constructed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardDetection {
    pub corners_px: [Point; 4],
    pub aspect_score: f32,
    pub angle_score: f32,
    pub area_score: f32,
    pub confidence: f32,
}

/// Detector contract. Backends are swappable; any lower-level failure must
/// surface as `None` ("no detection this frame"), never as a panic.
pub trait CardDetector {
    fn detect(&self, frame: &FramePacket) -> Option<CardDetection>;
}

impl<D: CardDetector + ?Sized> CardDetector for Box<D> {
    fn detect(&self, frame: &FramePacket) -> Option<CardDetection> {
        (**self).detect(frame)
    }
}

/// Staleness cache around a detector.
///
/// Re-runs the inner detector only when the last result is older than the
/// refresh interval (or absent); between refreshes the cached detection is
/// served unchanged. Bounded staleness is the only invalidation.
pub struct CachedCardDetector<D: CardDetector> {
    inner: D,
    refresh_interval_ms: u64,
    last_refresh_ms: Option<u64>,
    last: Option<CardDetection>,
}

impl<D: CardDetector> CachedCardDetector<D> {
    pub fn new(inner: D, refresh_interval_ms: u64) -> Self {
        Self {
            inner,
            refresh_interval_ms,
            last_refresh_ms: None,
            last: None,
        }
    }

    /// Current detection, refreshing from `frame` if the cache is stale.
    pub fn latest(&mut self, now_ms: u64, frame: &FramePacket) -> Option<&CardDetection> {
        let needs_refresh = match (self.last.as_ref(), self.last_refresh_ms) {
            (None, _) | (_, None) => true,
            (Some(_), Some(at)) => now_ms.saturating_sub(at) >= self.refresh_interval_ms,
        };
        if needs_refresh {
            self.last_refresh_ms = Some(now_ms);
            self.last = self.inner.detect(frame);
        }
        self.last.as_ref()
    }

    /// Drop the cached detection; the next call re-detects.
    pub fn invalidate(&mut self) {
        self.last = None;
        self.last_refresh_ms = None;
    }
}
