//! Finger width measurement at the ring point.
//!
//! Derives a measurement point between the ring MCP and PIP landmarks,
//! then scans outward along the finger-perpendicular direction over a
//! gradient-magnitude crop until both finger edges are found. The pixel
//! distance between the edges times the card scale gives the physical
//! width.

use crate::config::MeasureConfig;
use crate::measure::{HandLandmarks, MIN_LANDMARKS, RING_MCP, RING_PIP};
use crate::types::{FramePacket, Point};
use image::{ImageBuffer, Luma};
use imageproc::gradients::horizontal_sobel;
use serde::{Deserialize, Serialize};

type GradientImage = ImageBuffer<Luma<i16>, Vec<i16>>;

/// One successful width measurement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WidthMeasurement {
    pub width_px: f64,
    pub width_mm: f64,
    pub ring_point_px: Point,
    pub left_edge_px: Point,
    pub right_edge_px: Point,
}

pub struct FingerWidthMeasurer {
    config: MeasureConfig,
}

impl FingerWidthMeasurer {
    pub fn new(config: MeasureConfig) -> Self {
        Self { config }
    }

    /// Measure the finger width in `frame` at the derived ring point.
    ///
    /// Returns `None` on any rejection: too few landmarks, degenerate
    /// scale or axis, a missing edge on either side, an implausible width,
    /// or asymmetric scan distances.
    pub fn measure(
        &self,
        frame: &FramePacket,
        hand: &HandLandmarks,
        mm_per_px: f64,
    ) -> Option<WidthMeasurement> {
        if hand.points_px.len() < MIN_LANDMARKS {
            return None;
        }
        if mm_per_px <= 0.0 {
            return None;
        }
        let gray = frame.to_gray()?;

        let mcp = hand.points_px[RING_MCP];
        let pip = hand.points_px[RING_PIP];
        let t = self.config.measure_point_offset;
        let ring_point = Point::new(mcp.x + (pip.x - mcp.x) * t, mcp.y + (pip.y - mcp.y) * t);

        let axis_x = (pip.x - mcp.x) as f64;
        let axis_y = (pip.y - mcp.y) as f64;
        let len = (axis_x * axis_x + axis_y * axis_y).sqrt();
        if len == 0.0 {
            return None;
        }
        let dir = ((axis_x / len) as f32, (axis_y / len) as f32);
        let perp = (-dir.1, dir.0);

        // Crop a square region around the ring point and take the
        // saturated horizontal-derivative magnitude as the edge image.
        let radius = self.config.scan_radius_px as i32;
        let cx = ring_point.x as i32;
        let cy = ring_point.y as i32;
        let x0 = (cx - radius).max(0);
        let y0 = (cy - radius).max(0);
        let x1 = (cx + radius).min(gray.width() as i32);
        let y1 = (cy + radius).min(gray.height() as i32);
        if x1 - x0 <= 2 || y1 - y0 <= 2 {
            return None;
        }
        let crop = image::imageops::crop_imm(
            &gray,
            x0 as u32,
            y0 as u32,
            (x1 - x0) as u32,
            (y1 - y0) as u32,
        )
        .to_image();
        let gradient = horizontal_sobel(&crop);

        let center = Point::new(ring_point.x - x0 as f32, ring_point.y - y0 as f32);
        let left = self.scan_edge(&gradient, center, perp, -1.0)?;
        let right = self.scan_edge(&gradient, center, perp, 1.0)?;

        let left_abs = Point::new(left.x + x0 as f32, left.y + y0 as f32);
        let right_abs = Point::new(right.x + x0 as f32, right.y + y0 as f32);
        let width_px = left_abs.distance_to(right_abs);
        if width_px <= 1.0 {
            return None;
        }

        let width_mm = width_px * mm_per_px;
        if width_mm < self.config.min_width_mm || width_mm > self.config.max_width_mm {
            log::debug!("Rejecting implausible finger width {:.1}mm", width_mm);
            return None;
        }

        let dist_left = center.distance_to(left);
        let dist_right = center.distance_to(right);
        let longer = dist_left.max(dist_right);
        if longer > 0.0 && (dist_left - dist_right).abs() / longer > self.config.symmetry_tolerance
        {
            log::debug!(
                "Rejecting asymmetric edge scan ({:.1}px vs {:.1}px)",
                dist_left,
                dist_right
            );
            return None;
        }

        Some(WidthMeasurement {
            width_px,
            width_mm,
            ring_point_px: ring_point,
            left_edge_px: left_abs,
            right_edge_px: right_abs,
        })
    }

    /// Walk from `center` along `direction * sign`, returning the first
    /// point whose gradient magnitude reaches the edge threshold. The walk
    /// starts a few pixels out to clear the measurement point itself and is
    /// bounded by the crop size.
    fn scan_edge(
        &self,
        gradient: &GradientImage,
        center: Point,
        direction: (f32, f32),
        sign: f32,
    ) -> Option<Point> {
        let max_steps = (gradient.width().min(gradient.height()) / 2) as i32;
        for step in 3..max_steps {
            let x = (center.x + direction.0 * step as f32 * sign) as i32;
            let y = (center.y + direction.1 * step as f32 * sign) as i32;
            if x < 1
                || x >= gradient.width() as i32 - 1
                || y < 1
                || y >= gradient.height() as i32 - 1
            {
                break;
            }
            let magnitude = (gradient.get_pixel(x as u32, y as u32)[0] as i32)
                .unsigned_abs()
                .min(255) as f64;
            if magnitude >= self.config.edge_threshold {
                return Some(Point::new(x as f32, y as f32));
            }
        }
        None
    }
}
