//! Hand tracking boundary.
//!
//! The tracker produces one [`HandObservation`] per analyzed frame: a
//! padded bounding box around the hand in pixel and normalized form, a
//! confidence and a presence flag. Backend failures degrade to a centered
//! fallback box with `has_hand = false`.

use crate::measure::{HandLandmarker, HandLandmarks};
use crate::types::{FramePacket, FrameSize, HandObservation, NormRect, PixelRect};

/// Tracker contract, invoked once per analyzed frame.
pub trait HandTracker {
    fn observe(&self, frame: &FramePacket) -> HandObservation;
}

/// Observation used when no hand is visible: a centered box covering 40%
/// of each frame dimension, zero confidence.
pub fn empty_observation(frame_w: u32, frame_h: u32) -> HandObservation {
    let half_w = ((frame_w as f32 * 0.4) as i32).max(1);
    let half_h = ((frame_h as f32 * 0.4) as i32).max(1);
    let left = (frame_w as i32 - half_w) / 2;
    let top = (frame_h as i32 - half_h) / 2;
    let roi_px = PixelRect::new(
        left,
        top,
        (left + half_w).min(frame_w as i32),
        (top + half_h).min(frame_h as i32),
    );
    HandObservation {
        roi_normalized: NormRect::from_pixel(roi_px, FrameSize::new(frame_w, frame_h)),
        roi_pixel: roi_px,
        confidence: 0.0,
        has_hand: false,
    }
}

/// Tracker that derives the hand box from a landmark backend.
///
/// The box spans the landmark extremes padded by a fraction of the hand
/// size, clamped to the frame.
pub struct LandmarkHandTracker<H: HandLandmarker> {
    engine: H,
    bbox_padding_ratio: f32,
}

impl<H: HandLandmarker> LandmarkHandTracker<H> {
    pub fn new(engine: H) -> Self {
        Self::with_padding(engine, 0.18)
    }

    pub fn with_padding(engine: H, bbox_padding_ratio: f32) -> Self {
        Self {
            engine,
            bbox_padding_ratio,
        }
    }

    fn observation_from_landmarks(
        &self,
        landmarks: &HandLandmarks,
        frame_w: u32,
        frame_h: u32,
    ) -> HandObservation {
        let xs = landmarks.points_px.iter().map(|p| p.x);
        let ys = landmarks.points_px.iter().map(|p| p.y);
        let min_x = xs.clone().fold(f32::MAX, f32::min);
        let max_x = xs.fold(f32::MIN, f32::max);
        let min_y = ys.clone().fold(f32::MAX, f32::min);
        let max_y = ys.fold(f32::MIN, f32::max);

        let width = (max_x - min_x).max(1.0);
        let height = (max_y - min_y).max(1.0);
        let pad_x = width * self.bbox_padding_ratio;
        let pad_y = height * self.bbox_padding_ratio;

        let fw = frame_w as i32;
        let fh = frame_h as i32;
        let left = ((min_x - pad_x) as i32).clamp(0, fw - 1);
        let top = ((min_y - pad_y) as i32).clamp(0, fh - 1);
        let right = ((max_x + pad_x) as i32).clamp(left + 1, fw);
        let bottom = ((max_y + pad_y) as i32).clamp(top + 1, fh);

        let roi_px = PixelRect::new(left, top, right, bottom);
        HandObservation {
            roi_normalized: NormRect::from_pixel(roi_px, FrameSize::new(frame_w, frame_h)),
            roi_pixel: roi_px,
            confidence: landmarks.confidence.clamp(0.0, 1.0),
            has_hand: true,
        }
    }
}

impl<H: HandLandmarker> HandTracker for LandmarkHandTracker<H> {
    fn observe(&self, frame: &FramePacket) -> HandObservation {
        let Some((frame_w, frame_h)) = frame.dimensions() else {
            return empty_observation(1, 1);
        };
        match self.engine.detect(frame) {
            Some(landmarks) if !landmarks.points_px.is_empty() => {
                self.observation_from_landmarks(&landmarks, frame_w, frame_h)
            }
            _ => empty_observation(frame_w, frame_h),
        }
    }
}
