//! Synthetic test data.
//!
//! Deterministic luma patterns, rendered card/finger scenes matching the
//! fake landmark layout, and fake tracker/landmarker backends, enabling
//! reliable offline testing of the whole pipeline without hardware or
//! model files.

use crate::measure::{HandLandmarker, HandLandmarks, Handedness};
use crate::tracking::{empty_observation, HandTracker};
use crate::types::{FramePacket, FrameSize, HandObservation, LumaFrame, NormRect, PixelRect, Point};
use image::{GrayImage, Luma};

/// Uniform square luma buffer.
pub fn uniform_luma(size: u32, value: u8) -> LumaFrame {
    LumaFrame::from_fn(size, size, |_, _| value)
}

/// Checkerboard luma buffer with the given tile size and two intensities.
pub fn checkerboard_luma(size: u32, tile: u32, lo: u8, hi: u8) -> LumaFrame {
    let tile = tile.max(1);
    LumaFrame::from_fn(size, size, |x, y| {
        if ((x / tile) + (y / tile)) % 2 == 0 {
            hi
        } else {
            lo
        }
    })
}

/// Horizontal gradient luma buffer.
pub fn gradient_luma(size: u32) -> LumaFrame {
    LumaFrame::from_fn(size, size, |x, _| ((x * 255) / size.max(1)) as u8)
}

/// Uniform grayscale image.
pub fn blank_gray(width: u32, height: u32, value: u8) -> GrayImage {
    GrayImage::from_pixel(width, height, Luma([value]))
}

/// A filled dark rectangle (the reference card) on a light background.
pub fn card_scene(width: u32, height: u32, card: PixelRect, bg: u8, card_value: u8) -> GrayImage {
    GrayImage::from_fn(width, height, |x, y| {
        let xi = x as i32;
        let yi = y as i32;
        if xi >= card.left && xi < card.right && yi >= card.top && yi < card.bottom {
            Luma([card_value])
        } else {
            Luma([bg])
        }
    })
}

/// Full measurement scene: a reference card in the lower-left and a dark
/// finger bar crossing the ring point of [`FakeHandLandmarker`]'s layout.
///
/// Card proportions follow the ID-1 aspect ratio; the bar is placed so the
/// perpendicular edge scan from the fake landmarks hits both of its sides.
pub fn measurement_scene(width: u32, height: u32) -> GrayImage {
    let w = width as f32;
    let h = height as f32;

    let card_w = (0.35 * w) as i32;
    let card_h = (card_w as f64 / (85.60 / 53.98)) as i32;
    let card_left = (0.09 * w) as i32;
    let card_top = (0.67 * h) as i32;
    let card = PixelRect::new(card_left, card_top, card_left + card_w, card_top + card_h);

    // Ring point of the fake layout sits at ~(0.524w, 0.488h).
    let bar_left = (0.499 * w) as i32;
    let bar_right = (0.549 * w) as i32;
    let bar_top = (0.25 * h) as i32;
    let bar_bottom = (0.6875 * h) as i32;

    GrayImage::from_fn(width, height, |x, y| {
        let xi = x as i32;
        let yi = y as i32;
        let in_card = xi >= card.left && xi < card.right && yi >= card.top && yi < card.bottom;
        let in_bar = xi >= bar_left && xi < bar_right && yi >= bar_top && yi < bar_bottom;
        if in_card || in_bar {
            Luma([45u8])
        } else {
            Luma([210u8])
        }
    })
}

/// Tracker stub reporting a confident, centered hand box covering 55% of
/// each frame dimension.
pub struct FakeHandTracker;

impl HandTracker for FakeHandTracker {
    fn observe(&self, frame: &FramePacket) -> HandObservation {
        let Some((frame_w, frame_h)) = frame.dimensions() else {
            return empty_observation(1, 1);
        };
        let roi_w = ((0.55 * frame_w as f32).round() as i32).max(1);
        let roi_h = ((0.55 * frame_h as f32).round() as i32).max(1);
        let left = ((frame_w as i32 - roi_w) / 2).max(0);
        let top = ((frame_h as i32 - roi_h) / 2).max(0);
        let roi_px = PixelRect::new(
            left,
            top,
            (left + roi_w).min(frame_w as i32),
            (top + roi_h).min(frame_h as i32),
        );
        HandObservation {
            roi_normalized: NormRect::from_pixel(roi_px, FrameSize::new(frame_w, frame_h)),
            roi_pixel: roi_px,
            confidence: 1.0,
            has_hand: true,
        }
    }
}

/// Landmark backend stub producing a deterministic 21-point layout scaled
/// to the frame, with the ring finger MCP/PIP/DIP/TIP pinned to a nearly
/// vertical axis.
pub struct FakeHandLandmarker;

impl HandLandmarker for FakeHandLandmarker {
    fn detect(&self, frame: &FramePacket) -> Option<HandLandmarks> {
        let (w, h) = frame.dimensions()?;
        let w = w as f32;
        let h = h as f32;
        if w <= 0.0 || h <= 0.0 {
            return None;
        }

        let mut points = Vec::with_capacity(21);
        for i in 0..21u32 {
            let x = w * 0.4 + (i % 4) as f32 * (w * 0.05);
            let y = h * 0.5 - (i / 4) as f32 * (h * 0.04);
            points.push(Point::new(x, y));
        }

        // Ring finger chain, MCP through TIP.
        points[13] = Point::new(w * 0.52, h * 0.52);
        points[14] = Point::new(w * 0.53, h * 0.44);
        points[15] = Point::new(w * 0.54, h * 0.36);
        points[16] = Point::new(w * 0.55, h * 0.30);

        Some(HandLandmarks {
            points_px: points,
            confidences: vec![1.0; 21],
            handedness: Handedness::Right,
            confidence: 0.9,
        })
    }
}
