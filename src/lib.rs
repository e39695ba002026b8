//! RingGauge: frame-quality gating and auto-capture for camera-based
//! ring-size measurement.
//!
//! This crate scores incoming camera frames for usability, drives a timed
//! state machine that decides when to auto-capture a burst, and converts a
//! captured burst into a calibrated finger-width measurement with a
//! confidence estimate and failure diagnostics.
//!
//! # Features
//! - Pure, deterministic frame metrics (blur, motion, exposure, region fit)
//! - Windowed quality gate with failure reason tags
//! - Timestamp-driven SEARCH/READY/STABLE/CAPTURE/COOLDOWN controller
//! - Reference-card detection and physical scale estimation
//! - Sub-pixel finger-width measurement and robust burst aggregation
//!
//! # Usage
//! ```rust
//! use ringgauge::config::RingGaugeConfig;
//! use ringgauge::session::GateSession;
//! use ringgauge::testing::{measurement_scene, FakeHandTracker};
//! use ringgauge::types::FramePacket;
//! use ringgauge::EdgeCardDetector;
//!
//! let config = RingGaugeConfig::default();
//! let detector = EdgeCardDetector::new(config.card.clone());
//! let mut session = GateSession::new(config, FakeHandTracker, detector);
//!
//! let frame = FramePacket::from_gray(0, 0.0, measurement_scene(640, 480));
//! let verdict = session.analyze(0, &frame).expect("first frame is analyzed");
//! println!("state {:?}, quality {:.2}", verdict.state, verdict.quality.q_total);
//! ```
pub mod aggregate;
pub mod autocapture;
pub mod card;
pub mod config;
pub mod errors;
pub mod measure;
pub mod pipeline;
pub mod quality;
pub mod report;
pub mod session;
pub mod timing;
pub mod tracking;
pub mod types;

// Testing utilities - synthetic data for offline testing
pub mod testing;

// Re-exports for convenience
pub use aggregate::{FrameMeasurement, SizeAggregator, SizeResult};
pub use autocapture::{
    AutoCaptureState, AutoCaptureStateMachine, CaptureResult, CaptureTick, CapturedFrame,
};
pub use card::{
    CachedCardDetector, CardDetection, CardDetector, EdgeCardDetector, ScaleEstimate,
    ScaleEstimator,
};
pub use config::RingGaugeConfig;
pub use errors::RingGaugeError;
pub use measure::{FingerWidthMeasurer, HandLandmarker, HandLandmarks, WidthMeasurement};
pub use pipeline::RingSizeEstimator;
pub use quality::{FailReason, QualityGateEngine, QualityResult};
pub use report::MeasurementReport;
pub use session::{FrameVerdict, GateSession};
pub use tracking::{HandTracker, LandmarkHandTracker};
pub use types::{FramePacket, HandObservation, LumaFrame, PixelRect, Point};

/// Initialize logging for the measurement pipeline.
pub fn init_logging() {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "ringgauge=info");
    }
    let _ = env_logger::try_init();
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

#[cfg(test)]
mod lib_tests {
    use super::*;

    #[test]
    fn test_crate_metadata() {
        assert_eq!(NAME, "ringgauge");
        assert!(!VERSION.is_empty());
        assert!(!DESCRIPTION.is_empty());
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(RingGaugeConfig::default().validate().is_ok());
    }
}
