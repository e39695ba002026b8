//! Per-frame quality gate.
//!
//! Turns raw metrics into normalized sub-scores, a weighted aggregate and a
//! sliding-window average. Only two pieces of state survive between frames:
//! the previous luma buffer (for the motion estimate) and the bounded
//! sample window.

use crate::config::QualityConfig;
use crate::quality::metrics;
use crate::quality::reasons::FailReason;
use crate::types::{FrameSize, HandObservation, LumaFrame, PixelRect};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Quality snapshot for one evaluated frame.
///
/// The six scores are averaged over the recent sample window; the raw
/// metrics and the failure reasons reflect the current frame alone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityResult {
    pub timestamp_ms: u64,

    /// Windowed scores, each in [0, 1].
    pub q_total: f32,
    pub q_blur: f32,
    pub q_motion: f32,
    pub q_exposure: f32,
    pub q_roi: f32,
    pub q_conf: f32,

    /// Instantaneous failure reasons; never accumulated across frames.
    pub reasons: Vec<FailReason>,

    // Raw metrics of the current frame.
    pub blur_vol: f64,
    pub motion_mad: f64,
    pub mean_luma: f64,
    pub std_luma: f64,
    pub pct_high: f64,
    pub pct_low: f64,
    pub roi_score: f32,
    pub confidence: f32,
}

#[derive(Debug, Clone, Copy, Default)]
struct QualitySample {
    total: f32,
    q_blur: f32,
    q_motion: f32,
    q_exposure: f32,
    q_roi: f32,
    q_conf: f32,
}

/// Windowed quality gate. One instance per session; evaluation is strictly
/// sequential, so no internal synchronization.
pub struct QualityGateEngine {
    config: QualityConfig,
    prev: Option<LumaFrame>,
    window: VecDeque<QualitySample>,
}

impl QualityGateEngine {
    pub fn new(config: QualityConfig) -> Self {
        let capacity = config.aggregation_window.max(1);
        Self {
            config,
            prev: None,
            window: VecDeque::with_capacity(capacity),
        }
    }

    /// Score one frame.
    ///
    /// Takes ownership of the luma buffer; it becomes the previous frame
    /// for the next motion comparison. Absent input never errors, it only
    /// produces neutral scores plus reason tags.
    pub fn evaluate(
        &mut self,
        timestamp_ms: u64,
        luma: LumaFrame,
        roi_px: PixelRect,
        frame_size: FrameSize,
        observation: &HandObservation,
    ) -> QualityResult {
        let cfg = &self.config;
        let mut reasons = Vec::new();

        let q_conf = if observation.has_hand {
            observation.confidence.clamp(0.0, 1.0)
        } else {
            0.0
        };
        if !observation.has_hand {
            reasons.push(FailReason::NoHand);
        }
        if q_conf < 0.5 {
            reasons.push(FailReason::LowConf);
        }

        let roi_score = metrics::region_score(
            roi_px,
            frame_size,
            cfg.roi_min_ratio,
            cfg.roi_max_ratio,
            cfg.roi_margin_frac,
        );
        let q_roi = roi_score.clamp(0.0, 1.0);
        if q_roi < 0.5 {
            reasons.push(FailReason::RoiBad);
        }

        let blur_vol = metrics::blur_variance_of_laplacian(
            luma.data(),
            luma.width() as usize,
            luma.height() as usize,
        );
        let q_blur = metrics::normalize_blur(blur_vol, cfg.blur_low, cfg.blur_ok);
        if q_blur < 0.5 {
            reasons.push(FailReason::BlurLow);
        }

        let motion_mad = match &self.prev {
            Some(prev) => metrics::motion_mean_abs_diff(luma.data(), prev.data()),
            None => 0.0,
        };
        let q_motion = metrics::normalize_motion(motion_mad, cfg.motion_low, cfg.motion_high);
        if motion_mad > cfg.motion_high {
            reasons.push(FailReason::MotionHigh);
        }

        let exp = metrics::exposure_stats(luma.data());
        let q_exposure = metrics::normalize_exposure(
            &exp,
            cfg.exposure_min_mean,
            cfg.exposure_max_mean,
            cfg.exposure_min_std,
            cfg.exposure_pct_clip_max,
        );
        if exp.pct_high > cfg.exposure_pct_clip_max {
            reasons.push(FailReason::ExposureClipHigh);
        }
        if exp.pct_low > cfg.exposure_pct_clip_max {
            reasons.push(FailReason::ExposureClipLow);
        }
        if exp.mean < cfg.exposure_min_mean || exp.mean > cfg.exposure_max_mean {
            reasons.push(FailReason::ExposureMeanOut);
        }
        if exp.std < cfg.exposure_min_std {
            reasons.push(FailReason::ExposureLowContrast);
        }

        let total_raw = cfg.w_blur * q_blur
            + cfg.w_motion * q_motion
            + cfg.w_exposure * q_exposure
            + cfg.w_roi * q_roi
            + cfg.w_conf * q_conf;

        self.window.push_back(QualitySample {
            total: total_raw,
            q_blur,
            q_motion,
            q_exposure,
            q_roi,
            q_conf,
        });
        while self.window.len() > cfg.aggregation_window {
            self.window.pop_front();
        }
        self.prev = Some(luma);

        let avg = self.window_mean();
        log::debug!(
            "Quality @{}ms: total {:.3} (raw {:.3}), reasons {:?}",
            timestamp_ms,
            avg.total,
            total_raw,
            reasons
        );

        QualityResult {
            timestamp_ms,
            q_total: avg.total,
            q_blur: avg.q_blur,
            q_motion: avg.q_motion,
            q_exposure: avg.q_exposure,
            q_roi: avg.q_roi,
            q_conf: avg.q_conf,
            reasons,
            blur_vol,
            motion_mad,
            mean_luma: exp.mean,
            std_luma: exp.std,
            pct_high: exp.pct_high,
            pct_low: exp.pct_low,
            roi_score,
            confidence: q_conf,
        }
    }

    /// Drop the previous frame and the sample window.
    pub fn reset(&mut self) {
        self.prev = None;
        self.window.clear();
    }

    fn window_mean(&self) -> QualitySample {
        if self.window.is_empty() {
            return QualitySample::default();
        }
        let mut acc = QualitySample::default();
        for s in &self.window {
            acc.total += s.total;
            acc.q_blur += s.q_blur;
            acc.q_motion += s.q_motion;
            acc.q_exposure += s.q_exposure;
            acc.q_roi += s.q_roi;
            acc.q_conf += s.q_conf;
        }
        let n = self.window.len() as f32;
        QualitySample {
            total: acc.total / n,
            q_blur: acc.q_blur / n,
            q_motion: acc.q_motion / n,
            q_exposure: acc.q_exposure / n,
            q_roi: acc.q_roi / n,
            q_conf: acc.q_conf / n,
        }
    }
}
