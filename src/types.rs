//! Core geometry and frame types shared across the crate.
//!
//! Everything that crosses a module boundary gets a named type: rectangles
//! in pixel and normalized form, the downsampled luma buffer the quality
//! engine consumes, and the frame packet the burst pipeline re-decodes.

use image::codecs::jpeg::JpegEncoder;
use image::GrayImage;
use serde::{Deserialize, Serialize};
use std::io::Cursor;

/// 2D point in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    pub fn distance_to(&self, other: Point) -> f64 {
        let dx = (self.x - other.x) as f64;
        let dy = (self.y - other.y) as f64;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Frame dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

impl FrameSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Axis-aligned rectangle in pixel coordinates.
///
/// `left`/`top` are inclusive, `right`/`bottom` exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelRect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl PixelRect {
    pub const fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }

    pub fn center(&self) -> Point {
        Point::new(
            (self.left + self.right) as f32 / 2.0,
            (self.top + self.bottom) as f32 / 2.0,
        )
    }
}

/// Rectangle as fractions of the frame, each side in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormRect {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl NormRect {
    pub fn from_pixel(rect: PixelRect, frame: FrameSize) -> Self {
        let fw = (frame.width.max(1)) as f32;
        let fh = (frame.height.max(1)) as f32;
        Self {
            left: rect.left as f32 / fw,
            top: rect.top as f32 / fh,
            right: rect.right as f32 / fw,
            bottom: rect.bottom as f32 / fh,
        }
    }
}

/// Hand detection result for one frame, produced by a [`crate::tracking::HandTracker`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandObservation {
    pub roi_normalized: NormRect,
    pub roi_pixel: PixelRect,
    /// Detection confidence in [0, 1].
    pub confidence: f32,
    pub has_hand: bool,
}

/// Fixed-size square buffer of 8-bit luma samples.
///
/// Produced by downsampling the tracked region of a full-resolution frame;
/// the quality engine owns it for one evaluation and keeps it around as the
/// previous frame for motion comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LumaFrame {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl LumaFrame {
    pub fn new(data: Vec<u8>, width: u32, height: u32) -> Self {
        debug_assert_eq!(data.len(), (width * height) as usize);
        Self {
            width,
            height,
            data,
        }
    }

    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> u8) -> Self {
        let mut data = Vec::with_capacity((width * height) as usize);
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y));
            }
        }
        Self {
            width,
            height,
            data,
        }
    }

    /// Nearest-neighbor resample of `roi` within `src` into a square buffer
    /// of side `out_size`. The region is clamped to the frame first; a
    /// degenerate source yields an all-zero buffer.
    pub fn downsample_from(src: &GrayImage, roi: PixelRect, out_size: u32) -> Self {
        let fw = src.width() as i32;
        let fh = src.height() as i32;
        if fw == 0 || fh == 0 || out_size == 0 {
            return Self::new(vec![0; (out_size * out_size) as usize], out_size, out_size);
        }

        let left = roi.left.clamp(0, fw - 1);
        let top = roi.top.clamp(0, fh - 1);
        let right = roi.right.clamp(left + 1, fw);
        let bottom = roi.bottom.clamp(top + 1, fh);
        let roi_w = (right - left).max(1);
        let roi_h = (bottom - top).max(1);

        let out = out_size as i32;
        let mut data = Vec::with_capacity((out_size * out_size) as usize);
        for y in 0..out {
            let src_y = top + (y * roi_h) / out;
            for x in 0..out {
                let src_x = left + (x * roi_w) / out;
                data.push(src.get_pixel(src_x as u32, src_y as u32)[0]);
            }
        }
        Self::new(data, out_size, out_size)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

/// One full-resolution frame handed to detectors and the burst pipeline.
///
/// Carries either an encoded JPEG payload, a decoded grayscale plane, or
/// both; conversion between the two is on demand and failure degrades to
/// `None` rather than an error.
#[derive(Debug, Clone)]
pub struct FramePacket {
    pub timestamp_ms: u64,
    pub quality_score: f32,
    jpeg: Option<Vec<u8>>,
    gray: Option<GrayImage>,
}

impl FramePacket {
    pub fn from_jpeg(timestamp_ms: u64, quality_score: f32, jpeg: Vec<u8>) -> Self {
        Self {
            timestamp_ms,
            quality_score,
            jpeg: Some(jpeg),
            gray: None,
        }
    }

    pub fn from_gray(timestamp_ms: u64, quality_score: f32, gray: GrayImage) -> Self {
        Self {
            timestamp_ms,
            quality_score,
            jpeg: None,
            gray: Some(gray),
        }
    }

    /// Grayscale plane of the frame, decoding the JPEG payload if needed.
    pub fn to_gray(&self) -> Option<GrayImage> {
        if let Some(gray) = &self.gray {
            return Some(gray.clone());
        }
        let jpeg = self.jpeg.as_ref()?;
        match image::load_from_memory(jpeg) {
            Ok(img) => Some(img.to_luma8()),
            Err(e) => {
                log::warn!("Failed to decode frame payload: {}", e);
                None
            }
        }
    }

    /// Encoded JPEG payload, encoding the grayscale plane if needed.
    pub fn to_jpeg(&self, quality: u8) -> Option<Vec<u8>> {
        if let Some(jpeg) = &self.jpeg {
            return Some(jpeg.clone());
        }
        let gray = self.gray.as_ref()?;
        let mut cursor = Cursor::new(Vec::new());
        let encoder = JpegEncoder::new_with_quality(&mut cursor, quality);
        let dynamic = image::DynamicImage::ImageLuma8(gray.clone());
        match dynamic.write_with_encoder(encoder) {
            Ok(()) => Some(cursor.into_inner()),
            Err(e) => {
                log::warn!("Failed to encode frame payload: {}", e);
                None
            }
        }
    }

    /// Frame dimensions, decoding the payload if no plane is attached.
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        if let Some(gray) = &self.gray {
            return Some(gray.dimensions());
        }
        self.to_gray().map(|g| g.dimensions())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pixel_rect_dimensions() {
        let rect = PixelRect::new(10, 20, 110, 220);
        assert_eq!(rect.width(), 100);
        assert_eq!(rect.height(), 200);
        let center = rect.center();
        assert_eq!(center.x, 60.0);
        assert_eq!(center.y, 120.0);
    }

    #[test]
    fn test_norm_rect_from_pixel() {
        let rect = PixelRect::new(0, 0, 320, 240);
        let norm = NormRect::from_pixel(rect, FrameSize::new(640, 480));
        assert_eq!(norm.right, 0.5);
        assert_eq!(norm.bottom, 0.5);
    }

    #[test]
    fn test_downsample_preserves_uniform_value() {
        let src = GrayImage::from_pixel(64, 64, image::Luma([128u8]));
        let luma = LumaFrame::downsample_from(&src, PixelRect::new(8, 8, 56, 56), 16);
        assert_eq!(luma.width(), 16);
        assert!(luma.data().iter().all(|&v| v == 128));
    }

    #[test]
    fn test_downsample_clamps_out_of_bounds_roi() {
        let src = GrayImage::from_pixel(32, 32, image::Luma([50u8]));
        let luma = LumaFrame::downsample_from(&src, PixelRect::new(-100, -100, 500, 500), 8);
        assert_eq!(luma.data().len(), 64);
        assert!(luma.data().iter().all(|&v| v == 50));
    }

    #[test]
    fn test_frame_packet_jpeg_round_trip() {
        let gray = GrayImage::from_fn(48, 48, |x, _| image::Luma([if x < 24 { 40 } else { 200 }]));
        let packet = FramePacket::from_gray(1_000, 0.9, gray);
        let jpeg = packet.to_jpeg(90).expect("encode");
        let decoded = FramePacket::from_jpeg(1_000, 0.9, jpeg);
        let round = decoded.to_gray().expect("decode");
        assert_eq!(round.dimensions(), (48, 48));
        // Lossy, but the step edge must survive.
        assert!(round.get_pixel(0, 24)[0] < 100);
        assert!(round.get_pixel(47, 24)[0] > 150);
    }
}
