//! Edge-based reference-card detector.
//!
//! Pipeline: Gaussian blur, Canny edges, external contours, quadrilateral
//! approximation, then geometric scoring (aspect, corner angles, area) with
//! a penalty for detections touching the frame border. The best-scoring
//! surviving candidate wins; anything else is "not found".

use crate::card::{CardDetection, CardDetector};
use crate::config::CardConfig;
use crate::types::{FramePacket, Point};
use imageproc::contours::{find_contours, BorderType};
use imageproc::edges::canny;
use imageproc::filter::gaussian_blur_f32;
use imageproc::geometry::{approximate_polygon_dp, arc_length};
use imageproc::point::Point as ContourPoint;

/// Polygon-approximation tolerance as a fraction of the contour perimeter.
const APPROX_EPSILON_FRAC: f64 = 0.02;

pub struct EdgeCardDetector {
    config: CardConfig,
}

impl EdgeCardDetector {
    pub fn new(config: CardConfig) -> Self {
        Self { config }
    }

    fn aspect_score(&self, aspect: f64) -> f32 {
        let target = self.config.aspect_target();
        let diff = (aspect - target).abs() / target;
        ((1.0 - diff / self.config.aspect_tolerance) as f32).clamp(0.0, 1.0)
    }

    fn cutoff_penalty(&self, corners: &[Point; 4], width: u32, height: u32) -> f32 {
        let margin = self.config.edge_margin_frac;
        let fw = width as f32;
        let fh = height as f32;
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (f32::MAX, f32::MAX, f32::MIN, f32::MIN);
        for c in corners {
            min_x = min_x.min(c.x);
            min_y = min_y.min(c.y);
            max_x = max_x.max(c.x);
            max_y = max_y.max(c.y);
        }
        let cut = min_x / fw < margin
            || min_y / fh < margin
            || max_x / fw > 1.0 - margin
            || max_y / fh > 1.0 - margin;
        if cut {
            0.6
        } else {
            1.0
        }
    }
}

impl CardDetector for EdgeCardDetector {
    fn detect(&self, frame: &FramePacket) -> Option<CardDetection> {
        let gray = frame.to_gray()?;
        let (width, height) = gray.dimensions();
        if width < 8 || height < 8 {
            return None;
        }

        let blurred = gaussian_blur_f32(&gray, self.config.blur_sigma);
        let edges = canny(&blurred, self.config.canny_low, self.config.canny_high);
        let contours = find_contours::<i32>(&edges);

        let frame_area = (width as f64) * (height as f64);
        let min_area = frame_area * self.config.min_area_ratio;
        let mut best: Option<CardDetection> = None;

        for contour in &contours {
            if contour.border_type != BorderType::Outer {
                continue;
            }
            let points = &contour.points;
            if points.len() < 4 {
                continue;
            }

            let area = polygon_area(points);
            if area < min_area {
                continue;
            }

            let perimeter = arc_length(points, true);
            let approx = approximate_polygon_dp(points, APPROX_EPSILON_FRAC * perimeter, true);
            if approx.len() != 4 {
                continue;
            }

            let corners = order_corners(&approx);
            let aspect = estimate_aspect(&corners);
            let aspect_score = self.aspect_score(aspect);
            if aspect_score <= 0.0 {
                continue;
            }

            let angle_score = angle_score(&corners);
            if angle_score < self.config.min_angle_score {
                continue;
            }

            let area_score = ((area / frame_area) as f32).clamp(0.0, 1.0);
            let penalty = self.cutoff_penalty(&corners, width, height);
            let confidence =
                (0.5 * aspect_score + 0.3 * angle_score + 0.2 * area_score) * penalty;

            if best.as_ref().map_or(true, |b| confidence > b.confidence) {
                best = Some(CardDetection {
                    corners_px: corners,
                    aspect_score,
                    angle_score,
                    area_score,
                    confidence,
                });
            }
        }

        if let Some(detection) = &best {
            log::debug!(
                "Card detected: confidence {:.3} (aspect {:.2}, angle {:.2}, area {:.3})",
                detection.confidence,
                detection.aspect_score,
                detection.angle_score,
                detection.area_score
            );
        }
        best
    }
}

/// Shoelace area of a closed contour.
fn polygon_area(points: &[ContourPoint<i32>]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let mut acc = 0i64;
    for i in 0..points.len() {
        let a = points[i];
        let b = points[(i + 1) % points.len()];
        acc += a.x as i64 * b.y as i64 - b.x as i64 * a.y as i64;
    }
    (acc as f64 / 2.0).abs()
}

/// Order four vertices canonically: top-left has the minimum coordinate
/// sum, bottom-right the maximum, top-right the maximum x-y difference,
/// bottom-left the minimum.
fn order_corners(approx: &[ContourPoint<i32>]) -> [Point; 4] {
    let pts: Vec<Point> = approx
        .iter()
        .map(|p| Point::new(p.x as f32, p.y as f32))
        .collect();

    let extremum = |key: fn(&Point) -> f32, max: bool| -> Point {
        let mut best = pts[0];
        let mut best_key = key(&pts[0]);
        for p in &pts[1..] {
            let k = key(p);
            if (max && k > best_key) || (!max && k < best_key) {
                best = *p;
                best_key = k;
            }
        }
        best
    };

    let top_left = extremum(|p| p.x + p.y, false);
    let bottom_right = extremum(|p| p.x + p.y, true);
    let top_right = extremum(|p| p.x - p.y, true);
    let bottom_left = extremum(|p| p.x - p.y, false);
    [top_left, top_right, bottom_right, bottom_left]
}

/// Width/height ratio from averaged opposite-edge lengths.
fn estimate_aspect(corners: &[Point; 4]) -> f64 {
    let w1 = corners[0].distance_to(corners[1]);
    let w2 = corners[2].distance_to(corners[3]);
    let h1 = corners[0].distance_to(corners[3]);
    let h2 = corners[1].distance_to(corners[2]);
    let width = (w1 + w2) / 2.0;
    let height = (h1 + h2) / 2.0;
    if height <= 0.0 {
        return 0.0;
    }
    width / height
}

/// Mean per-corner score for deviation from a right angle.
fn angle_score(corners: &[Point; 4]) -> f32 {
    let mut sum = 0.0;
    for i in 0..4 {
        let prev = corners[(i + 3) % 4];
        let curr = corners[i];
        let next = corners[(i + 1) % 4];
        let deg = corner_angle_deg(prev, curr, next);
        sum += (1.0 - (deg - 90.0).abs() / 90.0).clamp(0.0, 1.0);
    }
    (sum / 4.0) as f32
}

fn corner_angle_deg(a: Point, b: Point, c: Point) -> f64 {
    let abx = (a.x - b.x) as f64;
    let aby = (a.y - b.y) as f64;
    let cbx = (c.x - b.x) as f64;
    let cby = (c.y - b.y) as f64;
    let dot = abx * cbx + aby * cby;
    let mag1 = (abx * abx + aby * aby).sqrt();
    let mag2 = (cbx * cbx + cby * cby).sqrt();
    if mag1 * mag2 == 0.0 {
        return 0.0;
    }
    (dot / (mag1 * mag2)).clamp(-1.0, 1.0).acos().to_degrees()
}
