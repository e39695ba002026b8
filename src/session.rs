//! Live analysis session.
//!
//! Ties the per-frame pipeline together: keep-only-latest rate limiting,
//! hand tracking, luma ROI extraction, quality gating, the optional
//! reference-card gate, the auto-capture state machine, and JPEG encoding
//! of frames retained during a burst.
//!
//! One session owns all of this state and is driven strictly sequentially
//! from a single worker; dropping the session is teardown, after which no
//! further notifications can be produced.

use crate::autocapture::{AutoCaptureState, AutoCaptureStateMachine, CaptureResult, CapturedFrame};
use crate::card::{CachedCardDetector, CardDetector};
use crate::config::RingGaugeConfig;
use crate::quality::{dedup_reasons, FailReason, QualityGateEngine, QualityResult};
use crate::tracking::HandTracker;
use crate::types::{FramePacket, FrameSize, LumaFrame};

/// Everything the surrounding UI learns about one analyzed frame: the
/// quality snapshot plus the state-machine notification.
#[derive(Debug, Clone)]
pub struct FrameVerdict {
    pub quality: QualityResult,
    pub state: AutoCaptureState,
    pub progress: f32,
    pub capturing: bool,
    pub completed: Option<CaptureResult>,
}

pub struct GateSession<T: HandTracker, D: CardDetector> {
    config: RingGaugeConfig,
    tracker: T,
    engine: QualityGateEngine,
    state_machine: AutoCaptureStateMachine,
    card_gate: Option<CachedCardDetector<D>>,
    last_analyze_at_ms: Option<u64>,
}

impl<T: HandTracker, D: CardDetector> GateSession<T, D> {
    /// Build a session around a tracker and a card detector. The card gate
    /// is active only when the configuration requires a card for capture.
    pub fn new(config: RingGaugeConfig, tracker: T, card_detector: D) -> Self {
        let card_gate = config.card.require_card_for_capture.then(|| {
            CachedCardDetector::new(card_detector, config.card.card_analysis_interval_ms)
        });
        let engine = QualityGateEngine::new(config.quality.clone());
        let state_machine = AutoCaptureStateMachine::new(config.capture.clone());
        Self {
            config,
            tracker,
            engine,
            state_machine,
            card_gate,
            last_analyze_at_ms: None,
        }
    }

    pub fn state(&self) -> AutoCaptureState {
        self.state_machine.state()
    }

    /// Analyze one frame.
    ///
    /// `now_ms` is the caller's monotonic clock (see
    /// [`crate::timing::MonotonicClock`]) and drives only the rate limiter
    /// and the card-cache staleness; state-machine timing uses the frame
    /// timestamp. Frames arriving faster than the configured minimum
    /// interval are dropped (`None`), not queued.
    pub fn analyze(&mut self, now_ms: u64, frame: &FramePacket) -> Option<FrameVerdict> {
        if let Some(last) = self.last_analyze_at_ms {
            if now_ms.saturating_sub(last) < self.config.quality.analysis_min_interval_ms {
                log::debug!("Dropping frame at {}ms (rate limited)", now_ms);
                return None;
            }
        }
        self.last_analyze_at_ms = Some(now_ms);

        let observation = self.tracker.observe(frame);
        let Some(gray) = frame.to_gray() else {
            log::warn!("Frame at {}ms carried no decodable image", frame.timestamp_ms);
            return None;
        };
        let frame_size = FrameSize::new(gray.width(), gray.height());
        let luma = LumaFrame::downsample_from(
            &gray,
            observation.roi_pixel,
            self.config.quality.downsample_size,
        );

        let mut quality = self.engine.evaluate(
            frame.timestamp_ms,
            luma,
            observation.roi_pixel,
            frame_size,
            &observation,
        );
        self.apply_card_gate(now_ms, frame, &mut quality);

        let tick = self
            .state_machine
            .update(frame.timestamp_ms, &observation, &quality);

        if tick.capturing {
            if let Some(jpeg) = frame.to_jpeg(self.config.capture.jpeg_quality) {
                self.state_machine.add_captured_frame(CapturedFrame {
                    timestamp_ms: frame.timestamp_ms,
                    score: quality.q_total,
                    jpeg,
                });
            }
        }

        Some(FrameVerdict {
            quality,
            state: tick.state,
            progress: tick.progress,
            capturing: tick.capturing,
            completed: tick.completed,
        })
    }

    /// Layer the reference-card gate onto a quality result: a missing or
    /// weak cached detection adds its reason tag, blocking state-machine
    /// progression without touching the scores. Skipped during COOLDOWN.
    fn apply_card_gate(&mut self, now_ms: u64, frame: &FramePacket, quality: &mut QualityResult) {
        let Some(gate) = self.card_gate.as_mut() else {
            return;
        };
        if self.state_machine.state() == AutoCaptureState::Cooldown {
            return;
        }

        let min_confidence = self.config.card.card_min_confidence;
        match gate.latest(now_ms, frame) {
            None => quality.reasons.push(FailReason::CardNotFound),
            Some(card) if card.confidence < min_confidence => {
                quality.reasons.push(FailReason::CardLowConf)
            }
            Some(_) => return,
        }
        quality.reasons = dedup_reasons(std::mem::take(&mut quality.reasons));
    }
}
