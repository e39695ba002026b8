/// Finger width measurement module
///
/// Defines the hand-landmark contract consumed by the burst pipeline and
/// the sub-pixel edge-scanning width measurer built on top of it.
pub mod width;

pub use width::{FingerWidthMeasurer, WidthMeasurement};

use crate::types::{FramePacket, Point};
use serde::{Deserialize, Serialize};

/// Landmark index of the ring finger MCP joint (MediaPipe hand topology).
pub const RING_MCP: usize = 13;
/// Landmark index of the ring finger PIP joint.
pub const RING_PIP: usize = 14;
/// Minimum landmark count required before measuring.
pub const MIN_LANDMARKS: usize = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Handedness {
    Left,
    Right,
    Unknown,
}

/// One hand's landmark detection in pixel coordinates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandLandmarks {
    pub points_px: Vec<Point>,
    pub confidences: Vec<f32>,
    pub handedness: Handedness,
    pub confidence: f32,
}

/// Landmark backend contract. Implementations are swappable; failures
/// surface as `None`, never as a panic.
pub trait HandLandmarker {
    fn detect(&self, frame: &FramePacket) -> Option<HandLandmarks>;
}

impl<H: HandLandmarker + ?Sized> HandLandmarker for Box<H> {
    fn detect(&self, frame: &FramePacket) -> Option<HandLandmarks> {
        (**self).detect(frame)
    }
}
