//! Stateless metric computations over 8-bit luma buffers.
//!
//! Every function here is pure: given the same buffers and thresholds it
//! returns the same value, which keeps the quality gate deterministic and
//! testable without a camera.

use crate::types::{FrameSize, PixelRect};

/// One-pass exposure statistics for a luma buffer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExposureStats {
    pub mean: f64,
    pub std: f64,
    /// Fraction of pixels at or above the high clip threshold (250).
    pub pct_high: f64,
    /// Fraction of pixels at or below the low clip threshold (5).
    pub pct_low: f64,
}

const CLIP_HIGH: u8 = 250;
const CLIP_LOW: u8 = 5;

/// Variance of the 4-neighbor Laplacian over all interior pixels.
///
/// Higher variance means a sharper image. Buffers smaller than 3x3 have no
/// interior and yield 0.
pub fn blur_variance_of_laplacian(luma: &[u8], width: usize, height: usize) -> f64 {
    if width < 3 || height < 3 || luma.len() < width * height {
        return 0.0;
    }
    let mut sum = 0.0;
    let mut sum_sq = 0.0;
    let mut count = 0u64;

    for y in 1..height - 1 {
        let row = y * width;
        for x in 1..width - 1 {
            let idx = row + x;
            let c = luma[idx] as i32;
            let l = luma[idx - 1] as i32;
            let r = luma[idx + 1] as i32;
            let u = luma[idx - width] as i32;
            let d = luma[idx + width] as i32;
            let lap = (u + d + l + r - 4 * c) as f64;
            sum += lap;
            sum_sq += lap * lap;
            count += 1;
        }
    }

    if count == 0 {
        return 0.0;
    }
    let mean = sum / count as f64;
    sum_sq / count as f64 - mean * mean
}

/// Mean absolute difference between two equally sized luma buffers.
///
/// Mismatched sizes or empty input yield 0.
pub fn motion_mean_abs_diff(curr: &[u8], prev: &[u8]) -> f64 {
    if curr.len() != prev.len() || curr.is_empty() {
        return 0.0;
    }
    let mut sum = 0u64;
    for (a, b) in curr.iter().zip(prev.iter()) {
        sum += (*a as i32 - *b as i32).unsigned_abs() as u64;
    }
    sum as f64 / curr.len() as f64
}

/// Mean, standard deviation and clip fractions in a single pass.
pub fn exposure_stats(luma: &[u8]) -> ExposureStats {
    if luma.is_empty() {
        return ExposureStats {
            mean: 0.0,
            std: 0.0,
            pct_high: 0.0,
            pct_low: 0.0,
        };
    }
    let n = luma.len() as f64;
    let mut sum = 0.0;
    let mut sum_sq = 0.0;
    let mut high = 0u64;
    let mut low = 0u64;
    for &b in luma {
        let v = b as f64;
        sum += v;
        sum_sq += v * v;
        if b >= CLIP_HIGH {
            high += 1;
        }
        if b <= CLIP_LOW {
            low += 1;
        }
    }
    let mean = sum / n;
    let variance = (sum_sq / n - mean * mean).max(0.0);
    ExposureStats {
        mean,
        std: variance.sqrt(),
        pct_high: high as f64 / n,
        pct_low: low as f64 / n,
    }
}

/// Score the hand bounding box against the frame.
///
/// 1.0 inside the `[min_target, max_target]` area-ratio band, linearly
/// degraded outside it, with an independent 0.6x penalty for touching the
/// horizontal or vertical frame margin.
pub fn region_score(
    roi: PixelRect,
    frame: FrameSize,
    min_target: f32,
    max_target: f32,
    margin_frac: f32,
) -> f32 {
    let fw = frame.width as f32;
    let fh = frame.height as f32;
    if fw <= 0.0 || fh <= 0.0 {
        return 0.0;
    }
    let rw = roi.width() as f32;
    let rh = roi.height() as f32;
    if rw <= 0.0 || rh <= 0.0 {
        return 0.0;
    }

    let roi_ratio = (rw * rh) / (fw * fh);
    let size_score = (if roi_ratio < min_target {
        roi_ratio / min_target
    } else if roi_ratio > max_target {
        max_target / roi_ratio
    } else {
        1.0
    })
    .clamp(0.0, 1.0);

    let margin_x = margin_frac * fw;
    let margin_y = margin_frac * fh;
    let mut edge_penalty = 1.0;
    if roi.left as f32 <= margin_x || roi.right as f32 >= fw - margin_x {
        edge_penalty *= 0.6;
    }
    if roi.top as f32 <= margin_y || roi.bottom as f32 >= fh - margin_y {
        edge_penalty *= 0.6;
    }

    (size_score * edge_penalty).clamp(0.0, 1.0)
}

/// Linear normalization of the blur variance between `low` (bad) and `ok` (good).
pub fn normalize_blur(vol: f64, blur_low: f64, blur_ok: f64) -> f32 {
    if blur_ok <= blur_low {
        return 0.0;
    }
    (((vol - blur_low) / (blur_ok - blur_low)) as f32).clamp(0.0, 1.0)
}

/// Inverted linear normalization of the motion estimate: more motion, lower score.
pub fn normalize_motion(mad: f64, motion_low: f64, motion_high: f64) -> f32 {
    if motion_high <= motion_low {
        return 0.0;
    }
    let t = (((mad - motion_low) / (motion_high - motion_low)) as f32).clamp(0.0, 1.0);
    (1.0 - t).clamp(0.0, 1.0)
}

/// Combined exposure score: mean centering times contrast adequacy, forced
/// to 0 whenever either clip fraction exceeds the ceiling.
pub fn normalize_exposure(
    stats: &ExposureStats,
    min_mean: f64,
    max_mean: f64,
    min_std: f64,
    pct_clip_max: f64,
) -> f32 {
    if stats.pct_high > pct_clip_max || stats.pct_low > pct_clip_max {
        return 0.0;
    }
    if max_mean <= min_mean {
        return 0.0;
    }

    let center = (min_mean + max_mean) / 2.0;
    let half_range = (max_mean - min_mean) / 2.0;
    let mean_dist = (stats.mean - center).abs();
    let mean_q = ((1.0 - (mean_dist / half_range).min(1.0)) as f32).clamp(0.0, 1.0);

    let std_q = (((stats.std - min_std) / min_std.max(1.0)) as f32).clamp(0.0, 1.0);
    (mean_q * std_q).clamp(0.0, 1.0)
}
