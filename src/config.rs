//! Configuration management for RingGauge.
//!
//! All numeric thresholds, weights and durations used by the quality gate,
//! the auto-capture controller and the measurement pipeline live in one
//! read-only structure supplied at session start. No hot reload.

use crate::errors::RingGaugeError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RingGaugeConfig {
    pub quality: QualityConfig,
    pub capture: CaptureConfig,
    pub card: CardConfig,
    pub measure: MeasureConfig,
    pub aggregate: AggregateConfig,
}

/// Per-frame quality scoring configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityConfig {
    /// Side length of the square luma buffer the metrics run on
    pub downsample_size: u32,
    /// Minimum interval between analyzed frames (ms); faster frames are dropped
    pub analysis_min_interval_ms: u64,
    /// Number of recent frames averaged into the reported scores
    pub aggregation_window: usize,

    /// Laplacian-variance blur thresholds (after downsampling)
    pub blur_low: f64,
    pub blur_ok: f64,

    /// Mean-absolute-difference motion thresholds (luma 0..255)
    pub motion_low: f64,
    pub motion_high: f64,

    /// Exposure thresholds
    pub exposure_min_mean: f64,
    pub exposure_max_mean: f64,
    pub exposure_min_std: f64,
    pub exposure_pct_clip_max: f64,

    /// Target band for the hand-box-to-frame area ratio
    pub roi_min_ratio: f32,
    pub roi_max_ratio: f32,
    /// Frame margin fraction the hand box must stay clear of
    pub roi_margin_frac: f32,

    /// Weights for the aggregate score
    pub w_blur: f32,
    pub w_motion: f32,
    pub w_exposure: f32,
    pub w_roi: f32,
    pub w_conf: f32,
}

/// Auto-capture state machine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// Smoothed score required to leave SEARCH
    pub ready_threshold: f32,
    /// Stricter smoothed score required to accumulate STABLE frames
    pub stable_threshold: f32,
    /// Consecutive stable frames required before capturing
    pub stable_frames: u32,
    /// Capture burst duration (ms)
    pub capture_duration_ms: u64,
    /// Cooldown after a burst before searching again (ms)
    pub cooldown_ms: u64,
    /// Number of best frames kept from a burst
    pub top_k: usize,
    /// Maximum hand-box center displacement between frames (px)
    pub jitter_threshold_px: f32,
    /// Capacity of the in-flight burst buffer
    pub burst_capacity: usize,
    /// JPEG quality for retained frames (1-100)
    pub jpeg_quality: u8,
}

/// Reference-card detection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardConfig {
    /// Gate capture on a confident card detection
    pub require_card_for_capture: bool,
    /// Minimum detection confidence for the capture gate and the aggregator
    pub card_min_confidence: f32,
    /// Staleness interval for the cached live detection (ms)
    pub card_analysis_interval_ms: u64,

    /// Physical reference dimensions (ID-1 card by default)
    pub reference_width_mm: f64,
    pub reference_height_mm: f64,

    /// Minimum contour area as a fraction of the frame
    pub min_area_ratio: f64,
    /// Relative tolerance around the target aspect ratio
    pub aspect_tolerance: f64,
    /// Minimum corner-angle score
    pub min_angle_score: f32,
    /// Canny hysteresis thresholds
    pub canny_low: f32,
    pub canny_high: f32,
    /// Gaussian blur sigma applied before edge detection
    pub blur_sigma: f32,
    /// Frame-edge margin fraction that triggers the cutoff penalty
    pub edge_margin_frac: f32,
}

impl CardConfig {
    /// Target width/height ratio derived from the physical reference.
    pub fn aspect_target(&self) -> f64 {
        self.reference_width_mm / self.reference_height_mm
    }
}

/// Finger width measurement configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeasureConfig {
    /// Gradient magnitude that counts as a finger edge
    pub edge_threshold: f64,
    /// Half-size of the crop scanned around the measurement point (px)
    pub scan_radius_px: u32,
    /// Fractional offset of the measurement point between the landmark pair
    pub measure_point_offset: f32,
    /// Plausible physical width range (mm)
    pub min_width_mm: f64,
    pub max_width_mm: f64,
    /// Maximum relative difference between the two scan distances
    pub symmetry_tolerance: f64,
}

/// Burst aggregation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregateConfig {
    pub card_min_confidence: f32,
    pub hand_min_confidence: f32,
    /// Minimum surviving measurements for a usable result
    pub min_valid_frames: usize,
    /// Measurement count treated as a fully stable burst
    pub stable_frames: usize,
}

impl Default for RingGaugeConfig {
    fn default() -> Self {
        Self {
            quality: QualityConfig {
                downsample_size: 160,
                analysis_min_interval_ms: 70,
                aggregation_window: 12,
                blur_low: 60.0,
                blur_ok: 140.0,
                motion_low: 2.0,
                motion_high: 10.0,
                exposure_min_mean: 60.0,
                exposure_max_mean: 190.0,
                exposure_min_std: 18.0,
                exposure_pct_clip_max: 0.12,
                roi_min_ratio: 0.18,
                roi_max_ratio: 0.45,
                roi_margin_frac: 0.04,
                w_blur: 0.25,
                w_motion: 0.25,
                w_exposure: 0.20,
                w_roi: 0.15,
                w_conf: 0.15,
            },
            capture: CaptureConfig {
                ready_threshold: 0.65,
                stable_threshold: 0.78,
                stable_frames: 12,
                capture_duration_ms: 1500,
                cooldown_ms: 1000,
                top_k: 10,
                jitter_threshold_px: 12.0,
                burst_capacity: 64,
                jpeg_quality: 90,
            },
            card: CardConfig {
                require_card_for_capture: true,
                card_min_confidence: 0.75,
                card_analysis_interval_ms: 180,
                reference_width_mm: 85.60,
                reference_height_mm: 53.98,
                min_area_ratio: 0.03,
                aspect_tolerance: 0.18,
                min_angle_score: 0.65,
                canny_low: 50.0,
                canny_high: 150.0,
                blur_sigma: 1.4,
                edge_margin_frac: 0.02,
            },
            measure: MeasureConfig {
                edge_threshold: 35.0,
                scan_radius_px: 80,
                measure_point_offset: 0.4,
                min_width_mm: 5.0,
                max_width_mm: 35.0,
                symmetry_tolerance: 0.6,
            },
            aggregate: AggregateConfig {
                card_min_confidence: 0.75,
                hand_min_confidence: 0.65,
                min_valid_frames: 3,
                stable_frames: 6,
            },
        }
    }
}

impl RingGaugeConfig {
    /// Load configuration from a TOML file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, RingGaugeError> {
        let path = path.as_ref();

        if !path.exists() {
            log::info!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .map_err(|e| RingGaugeError::Io(format!("Failed to read config file: {}", e)))?;

        let config: RingGaugeConfig = toml::from_str(&contents)
            .map_err(|e| RingGaugeError::InvalidConfig(format!("Failed to parse config: {}", e)))?;

        log::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Save configuration to a TOML file.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), RingGaugeError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| RingGaugeError::Io(format!("Failed to create config dir: {}", e)))?;
        }

        let toml_string = toml::to_string_pretty(self)
            .map_err(|e| RingGaugeError::Encoding(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, toml_string)
            .map_err(|e| RingGaugeError::Io(format!("Failed to write config file: {}", e)))?;

        log::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Default config file path.
    pub fn default_path() -> PathBuf {
        PathBuf::from("ringgauge.toml")
    }

    /// Load from the default location or fall back to defaults.
    pub fn load_or_default() -> Self {
        Self::load_from_file(Self::default_path()).unwrap_or_else(|e| {
            log::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), RingGaugeError> {
        let fail = |msg: &str| Err(RingGaugeError::InvalidConfig(msg.to_string()));

        if self.quality.downsample_size < 16 {
            return fail("Downsample size must be at least 16");
        }
        if self.quality.aggregation_window == 0 {
            return fail("Aggregation window must be at least 1");
        }
        if self.quality.blur_ok <= self.quality.blur_low {
            return fail("blur_ok must exceed blur_low");
        }
        if self.quality.motion_high <= self.quality.motion_low {
            return fail("motion_high must exceed motion_low");
        }
        if self.quality.exposure_max_mean <= self.quality.exposure_min_mean {
            return fail("exposure_max_mean must exceed exposure_min_mean");
        }
        if self.quality.roi_max_ratio <= self.quality.roi_min_ratio {
            return fail("roi_max_ratio must exceed roi_min_ratio");
        }
        for (name, w) in [
            ("w_blur", self.quality.w_blur),
            ("w_motion", self.quality.w_motion),
            ("w_exposure", self.quality.w_exposure),
            ("w_roi", self.quality.w_roi),
            ("w_conf", self.quality.w_conf),
        ] {
            if !(0.0..=1.0).contains(&w) {
                return Err(RingGaugeError::InvalidConfig(format!(
                    "{} must be between 0.0 and 1.0",
                    name
                )));
            }
        }

        if !(0.0..=1.0).contains(&self.capture.ready_threshold)
            || !(0.0..=1.0).contains(&self.capture.stable_threshold)
        {
            return fail("Capture thresholds must be between 0.0 and 1.0");
        }
        if self.capture.stable_frames == 0 {
            return fail("stable_frames must be at least 1");
        }
        if self.capture.capture_duration_ms == 0 || self.capture.cooldown_ms == 0 {
            return fail("Capture and cooldown durations must be non-zero");
        }
        if self.capture.top_k == 0 || self.capture.top_k > self.capture.burst_capacity {
            return fail("top_k must be between 1 and burst_capacity");
        }
        if self.capture.jpeg_quality == 0 || self.capture.jpeg_quality > 100 {
            return fail("JPEG quality must be between 1 and 100");
        }

        if self.card.reference_width_mm <= 0.0 || self.card.reference_height_mm <= 0.0 {
            return fail("Reference dimensions must be positive");
        }
        if self.card.aspect_tolerance <= 0.0 {
            return fail("Aspect tolerance must be positive");
        }
        if self.card.canny_high <= self.card.canny_low {
            return fail("canny_high must exceed canny_low");
        }

        if self.measure.max_width_mm <= self.measure.min_width_mm {
            return fail("max_width_mm must exceed min_width_mm");
        }
        if self.measure.scan_radius_px < 8 {
            return fail("scan_radius_px must be at least 8");
        }
        if !(0.0..1.0).contains(&self.measure.measure_point_offset) {
            return fail("measure_point_offset must be in [0, 1)");
        }

        if self.aggregate.min_valid_frames == 0 || self.aggregate.stable_frames == 0 {
            return fail("Aggregation frame counts must be at least 1");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RingGaugeConfig::default();
        assert_eq!(config.quality.downsample_size, 160);
        assert_eq!(config.quality.aggregation_window, 12);
        assert_eq!(config.capture.stable_frames, 12);
        assert_eq!(config.capture.top_k, 10);
        assert!(config.card.require_card_for_capture);
        assert!((config.card.aspect_target() - 1.5858).abs() < 0.001);
    }

    #[test]
    fn test_config_validation() {
        let config = RingGaugeConfig::default();
        assert!(config.validate().is_ok());

        let mut bad = config.clone();
        bad.quality.blur_ok = bad.quality.blur_low;
        assert!(bad.validate().is_err());

        let mut bad = RingGaugeConfig::default();
        bad.capture.top_k = 0;
        assert!(bad.validate().is_err());

        let mut bad = RingGaugeConfig::default();
        bad.measure.max_width_mm = 1.0;
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_config_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("ringgauge.toml");

        let config = RingGaugeConfig::default();
        assert!(config.save_to_file(&config_path).is_ok());

        let loaded = RingGaugeConfig::load_from_file(&config_path).unwrap();
        assert_eq!(loaded.capture.stable_frames, config.capture.stable_frames);
        assert_eq!(loaded.quality.blur_ok, config.quality.blur_ok);
        assert_eq!(
            loaded.card.card_min_confidence,
            config.card.card_min_confidence
        );
    }

    #[test]
    fn test_config_toml_format() {
        let config = RingGaugeConfig::default();
        let toml_string = toml::to_string_pretty(&config).unwrap();

        assert!(toml_string.contains("[quality]"));
        assert!(toml_string.contains("[capture]"));
        assert!(toml_string.contains("[card]"));
        assert!(toml_string.contains("[measure]"));
        assert!(toml_string.contains("[aggregate]"));
        assert!(toml_string.contains("ready_threshold"));
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = RingGaugeConfig::load_from_file("nonexistent_ringgauge.toml");
        assert!(result.is_ok()); // Should return default
        assert_eq!(result.unwrap().quality.downsample_size, 160);
    }
}
