//! Auto-capture controller.
//!
//! A timed five-state machine that consumes per-frame quality snapshots and
//! decides when to run a capture burst and which frames to keep. All timing
//! is driven by caller-supplied millisecond timestamps, so the controller
//! is deterministic and testable without real time.

use crate::config::CaptureConfig;
use crate::quality::QualityResult;
use crate::types::{HandObservation, Point};
use serde::{Deserialize, Serialize};

/// Controller states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AutoCaptureState {
    Search,
    Ready,
    Stable,
    Capture,
    Cooldown,
}

/// One frame retained during a capture burst.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapturedFrame {
    pub timestamp_ms: u64,
    pub score: f32,
    pub jpeg: Vec<u8>,
}

/// Completed burst: the capture-start timestamp as session id plus the
/// top-K frames by score, best first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureResult {
    pub session_id: u64,
    pub top_frames: Vec<CapturedFrame>,
}

/// State notification produced by every [`AutoCaptureStateMachine::update`]
/// call, transition or not. This is the only channel through which the
/// surrounding UI learns the controller state.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureTick {
    pub state: AutoCaptureState,
    pub progress: f32,
    /// True for every tick spent inside CAPTURE; the caller should encode
    /// and submit the current frame while this holds.
    pub capturing: bool,
    pub completed: Option<CaptureResult>,
}

impl CaptureTick {
    fn new(state: AutoCaptureState, progress: f32) -> Self {
        Self {
            state,
            progress,
            capturing: state == AutoCaptureState::Capture,
            completed: None,
        }
    }
}

/// Fixed-capacity burst store. When full, a new frame only enters by
/// evicting the lowest-scoring one it beats; insertion order is kept so
/// top-K ties resolve to the earliest frame.
#[derive(Debug)]
struct BurstBuffer {
    capacity: usize,
    frames: Vec<CapturedFrame>,
}

impl BurstBuffer {
    fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            frames: Vec::with_capacity(capacity.max(1)),
        }
    }

    fn push(&mut self, frame: CapturedFrame) {
        if self.frames.len() < self.capacity {
            self.frames.push(frame);
            return;
        }
        let (worst_idx, worst_score) = self
            .frames
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| a.score.total_cmp(&b.score))
            .map(|(i, f)| (i, f.score))
            .expect("burst buffer is non-empty when full");
        if frame.score > worst_score {
            self.frames.remove(worst_idx);
            self.frames.push(frame);
        }
    }

    /// Best `k` frames by descending score (stable: ties keep arrival
    /// order), draining the buffer.
    fn take_top_k(&mut self, k: usize) -> Vec<CapturedFrame> {
        let mut frames = std::mem::take(&mut self.frames);
        frames.sort_by(|a, b| b.score.total_cmp(&a.score));
        frames.truncate(k);
        frames
    }

    fn clear(&mut self) {
        self.frames.clear();
    }

    fn len(&self) -> usize {
        self.frames.len()
    }
}

/// The auto-capture state machine. Owned by exactly one session and driven
/// strictly sequentially.
pub struct AutoCaptureStateMachine {
    config: CaptureConfig,
    state: AutoCaptureState,
    stable_count: u32,
    capture_start_ms: u64,
    cooldown_until_ms: u64,
    last_roi_center: Option<Point>,
    burst: BurstBuffer,
}

impl AutoCaptureStateMachine {
    pub fn new(config: CaptureConfig) -> Self {
        let burst = BurstBuffer::new(config.burst_capacity);
        Self {
            config,
            state: AutoCaptureState::Search,
            stable_count: 0,
            capture_start_ms: 0,
            cooldown_until_ms: 0,
            last_roi_center: None,
            burst,
        }
    }

    pub fn state(&self) -> AutoCaptureState {
        self.state
    }

    /// Advance the machine by one analyzed frame.
    ///
    /// "Ready" requires a present hand, the smoothed score at or above the
    /// ready threshold and an empty reason list; "stable" the same against
    /// the stricter stable threshold; jitter compares the hand-box center
    /// against the previous frame. COOLDOWN ignores quality entirely and is
    /// purely time-gated.
    pub fn update(
        &mut self,
        timestamp_ms: u64,
        observation: &HandObservation,
        quality: &QualityResult,
    ) -> CaptureTick {
        let roi_center = observation.roi_pixel.center();

        if self.state == AutoCaptureState::Cooldown {
            if timestamp_ms >= self.cooldown_until_ms {
                return self.transition(AutoCaptureState::Search, 0.0);
            }
            let remaining = self.cooldown_until_ms.saturating_sub(timestamp_ms);
            let progress =
                1.0 - (remaining as f32 / self.config.cooldown_ms as f32).clamp(0.0, 1.0);
            return CaptureTick::new(self.state, progress);
        }

        let has_hand = observation.has_hand;
        let ready = has_hand
            && quality.q_total >= self.config.ready_threshold
            && quality.reasons.is_empty();
        let stable = has_hand
            && quality.q_total >= self.config.stable_threshold
            && quality.reasons.is_empty();

        let jitter_ok = self.is_jitter_ok(roi_center);
        self.last_roi_center = Some(roi_center);

        match self.state {
            AutoCaptureState::Search => {
                if ready {
                    self.transition(AutoCaptureState::Ready, 0.0)
                } else {
                    CaptureTick::new(self.state, 0.0)
                }
            }
            AutoCaptureState::Ready => {
                if !ready {
                    self.stable_count = 0;
                    self.transition(AutoCaptureState::Search, 0.0)
                } else if stable && jitter_ok {
                    self.stable_count = 1;
                    let progress = self.stable_count as f32 / self.config.stable_frames as f32;
                    self.transition(AutoCaptureState::Stable, progress)
                } else {
                    CaptureTick::new(self.state, 0.0)
                }
            }
            AutoCaptureState::Stable => {
                if !stable || !jitter_ok {
                    self.stable_count = 0;
                    self.transition(AutoCaptureState::Ready, 0.0)
                } else {
                    self.stable_count += 1;
                    let progress = (self.stable_count as f32
                        / self.config.stable_frames as f32)
                        .clamp(0.0, 1.0);
                    if self.stable_count >= self.config.stable_frames {
                        self.start_capture(timestamp_ms)
                    } else {
                        CaptureTick::new(self.state, progress)
                    }
                }
            }
            AutoCaptureState::Capture => {
                let elapsed = timestamp_ms.saturating_sub(self.capture_start_ms);
                let progress =
                    (elapsed as f32 / self.config.capture_duration_ms as f32).clamp(0.0, 1.0);
                if elapsed >= self.config.capture_duration_ms {
                    self.finish_capture(timestamp_ms)
                } else {
                    CaptureTick::new(self.state, progress)
                }
            }
            AutoCaptureState::Cooldown => unreachable!("cooldown handled above"),
        }
    }

    /// Submit a frame retained during the burst. A no-op outside CAPTURE:
    /// frames arriving in any other state are silently dropped.
    pub fn add_captured_frame(&mut self, frame: CapturedFrame) {
        if self.state != AutoCaptureState::Capture {
            return;
        }
        self.burst.push(frame);
    }

    fn start_capture(&mut self, timestamp_ms: u64) -> CaptureTick {
        self.burst.clear();
        self.capture_start_ms = timestamp_ms;
        self.stable_count = 0;
        self.transition(AutoCaptureState::Capture, 0.0)
    }

    fn finish_capture(&mut self, timestamp_ms: u64) -> CaptureTick {
        let session_id = self.capture_start_ms;
        let retained = self.burst.len();
        let selected = self.burst.take_top_k(self.config.top_k);
        log::info!(
            "Capture {} complete: kept {} of {} frames",
            session_id,
            selected.len(),
            retained
        );
        self.cooldown_until_ms = timestamp_ms + self.config.cooldown_ms;
        let mut tick = self.transition(AutoCaptureState::Cooldown, 0.0);
        tick.completed = Some(CaptureResult {
            session_id,
            top_frames: selected,
        });
        tick
    }

    fn transition(&mut self, new_state: AutoCaptureState, progress: f32) -> CaptureTick {
        if new_state != self.state {
            log::info!("Auto-capture {:?} -> {:?}", self.state, new_state);
        }
        self.state = new_state;
        CaptureTick::new(self.state, progress)
    }

    fn is_jitter_ok(&self, curr_center: Point) -> bool {
        match self.last_roi_center {
            Some(prev) => curr_center.distance_to(prev) <= self.config.jitter_threshold_px as f64,
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RingGaugeConfig;
    use crate::quality::FailReason;
    use crate::types::{NormRect, PixelRect};

    fn test_config() -> CaptureConfig {
        CaptureConfig {
            ready_threshold: 0.6,
            stable_threshold: 0.7,
            stable_frames: 2,
            capture_duration_ms: 100,
            cooldown_ms: 200,
            top_k: 2,
            jitter_threshold_px: 100.0,
            ..RingGaugeConfig::default().capture
        }
    }

    fn observation() -> HandObservation {
        HandObservation {
            roi_normalized: NormRect {
                left: 0.2,
                top: 0.2,
                right: 0.5,
                bottom: 0.6,
            },
            roi_pixel: PixelRect::new(100, 100, 240, 300),
            confidence: 1.0,
            has_hand: true,
        }
    }

    fn quality(total: f32, reasons: Vec<FailReason>) -> QualityResult {
        QualityResult {
            timestamp_ms: 0,
            q_total: total,
            q_blur: total,
            q_motion: total,
            q_exposure: total,
            q_roi: total,
            q_conf: total,
            reasons,
            blur_vol: 120.0,
            motion_mad: 1.0,
            mean_luma: 128.0,
            std_luma: 24.0,
            pct_high: 0.01,
            pct_low: 0.01,
            roi_score: 0.9,
            confidence: 1.0,
        }
    }

    fn frame(ts: u64, score: f32, payload: u8) -> CapturedFrame {
        CapturedFrame {
            timestamp_ms: ts,
            score,
            jpeg: vec![payload],
        }
    }

    #[test]
    fn test_full_flow_emits_expected_transitions_and_top_k() {
        let mut sm = AutoCaptureStateMachine::new(test_config());
        let obs = observation();
        let good = quality(0.8, vec![]);

        assert_eq!(sm.state(), AutoCaptureState::Search);

        let tick = sm.update(1_000, &obs, &good);
        assert_eq!(tick.state, AutoCaptureState::Ready);
        assert!(!tick.capturing);

        let tick = sm.update(1_040, &obs, &good);
        assert_eq!(tick.state, AutoCaptureState::Stable);
        assert_eq!(tick.progress, 0.5);

        let tick = sm.update(1_080, &obs, &good);
        assert_eq!(tick.state, AutoCaptureState::Capture);
        assert!(tick.capturing);

        sm.add_captured_frame(frame(1_081, 0.30, 1));
        sm.add_captured_frame(frame(1_082, 0.90, 2));
        sm.add_captured_frame(frame(1_083, 0.60, 3));

        let tick = sm.update(1_200, &obs, &good);
        assert_eq!(tick.state, AutoCaptureState::Cooldown);
        assert!(!tick.capturing);
        let result = tick.completed.expect("burst should complete");
        assert_eq!(result.session_id, 1_080);
        assert_eq!(result.top_frames.len(), 2);
        assert_eq!(result.top_frames[0].score, 0.90);
        assert_eq!(result.top_frames[1].score, 0.60);

        let tick = sm.update(1_250, &obs, &good);
        assert_eq!(tick.state, AutoCaptureState::Cooldown);
        assert!(tick.progress > 0.0 && tick.progress < 1.0);

        let tick = sm.update(1_450, &obs, &good);
        assert_eq!(tick.state, AutoCaptureState::Search);
    }

    #[test]
    fn test_ready_falls_back_to_search_when_condition_breaks() {
        let mut sm = AutoCaptureStateMachine::new(test_config());
        let obs = observation();

        let tick = sm.update(1_000, &obs, &quality(0.8, vec![]));
        assert_eq!(tick.state, AutoCaptureState::Ready);

        let tick = sm.update(1_040, &obs, &quality(0.2, vec![FailReason::BlurLow]));
        assert_eq!(tick.state, AutoCaptureState::Search);
    }

    #[test]
    fn test_reasons_block_progress_even_with_high_score() {
        let mut sm = AutoCaptureStateMachine::new(test_config());
        let obs = observation();

        let tick = sm.update(1_000, &obs, &quality(0.9, vec![FailReason::CardNotFound]));
        assert_eq!(tick.state, AutoCaptureState::Search);
    }

    #[test]
    fn test_stable_resets_on_jitter() {
        let mut config = test_config();
        config.jitter_threshold_px = 5.0;
        config.stable_frames = 3;
        let mut sm = AutoCaptureStateMachine::new(config);
        let good = quality(0.8, vec![]);

        let obs = observation();
        sm.update(1_000, &obs, &good);
        let tick = sm.update(1_040, &obs, &good);
        assert_eq!(tick.state, AutoCaptureState::Stable);

        // Move the hand box far enough to break the jitter gate.
        let mut moved = observation();
        moved.roi_pixel = PixelRect::new(160, 100, 300, 300);
        let tick = sm.update(1_080, &moved, &good);
        assert_eq!(tick.state, AutoCaptureState::Ready);
    }

    #[test]
    fn test_stable_count_reaches_capture_after_configured_frames() {
        let mut config = test_config();
        config.stable_frames = 4;
        let mut sm = AutoCaptureStateMachine::new(config);
        let obs = observation();
        let good = quality(0.8, vec![]);

        sm.update(0, &obs, &good); // -> READY
        let tick = sm.update(40, &obs, &good); // -> STABLE, count 1
        assert_eq!(tick.state, AutoCaptureState::Stable);

        // Exactly stable_frames - 1 further ticks reach CAPTURE.
        let mut state = tick.state;
        for i in 0..3u64 {
            state = sm.update(80 + i * 40, &obs, &good).state;
        }
        assert_eq!(state, AutoCaptureState::Capture);
    }

    #[test]
    fn test_frames_outside_capture_are_dropped() {
        let mut sm = AutoCaptureStateMachine::new(test_config());
        sm.add_captured_frame(frame(1, 0.9, 1));
        assert_eq!(sm.burst.len(), 0);
    }

    #[test]
    fn test_second_burst_never_contains_prior_frames() {
        let mut sm = AutoCaptureStateMachine::new(test_config());
        let obs = observation();
        let good = quality(0.8, vec![]);

        // First burst.
        sm.update(0, &obs, &good);
        sm.update(40, &obs, &good);
        sm.update(80, &obs, &good);
        sm.add_captured_frame(frame(81, 0.9, 1));
        let first = sm.update(200, &obs, &good).completed.unwrap();
        assert_eq!(first.top_frames.len(), 1);

        // Through cooldown and back to a second burst.
        sm.update(420, &obs, &good); // cooldown expired -> SEARCH
        sm.update(460, &obs, &good); // -> READY
        sm.update(500, &obs, &good); // -> STABLE
        let tick = sm.update(540, &obs, &good); // -> CAPTURE
        assert_eq!(tick.state, AutoCaptureState::Capture);
        sm.add_captured_frame(frame(541, 0.5, 9));
        let second = sm.update(700, &obs, &good).completed.unwrap();
        assert_eq!(second.session_id, 540);
        assert_eq!(second.top_frames.len(), 1);
        assert_eq!(second.top_frames[0].jpeg, vec![9]);
    }

    #[test]
    fn test_cooldown_ignores_quality_input() {
        let mut sm = AutoCaptureStateMachine::new(test_config());
        let obs = observation();
        let good = quality(0.8, vec![]);

        sm.update(0, &obs, &good);
        sm.update(40, &obs, &good);
        sm.update(80, &obs, &good);
        sm.update(200, &obs, &good); // -> COOLDOWN until 400

        // Terrible quality must not matter during cooldown.
        let tick = sm.update(250, &obs, &quality(0.0, vec![FailReason::NoHand]));
        assert_eq!(tick.state, AutoCaptureState::Cooldown);
        let tick = sm.update(399, &obs, &quality(0.0, vec![FailReason::NoHand]));
        assert_eq!(tick.state, AutoCaptureState::Cooldown);
        let tick = sm.update(400, &obs, &quality(0.0, vec![FailReason::NoHand]));
        assert_eq!(tick.state, AutoCaptureState::Search);
    }

    #[test]
    fn test_cooldown_progress_is_monotonic() {
        let mut sm = AutoCaptureStateMachine::new(test_config());
        let obs = observation();
        let good = quality(0.8, vec![]);

        sm.update(0, &obs, &good);
        sm.update(40, &obs, &good);
        sm.update(80, &obs, &good);
        sm.update(200, &obs, &good);

        let mut last = -1.0f32;
        for ts in [210u64, 250, 300, 350, 390] {
            let tick = sm.update(ts, &obs, &good);
            assert_eq!(tick.state, AutoCaptureState::Cooldown);
            assert!(tick.progress >= last);
            last = tick.progress;
        }
    }

    #[test]
    fn test_burst_buffer_eviction_keeps_best() {
        let mut buffer = BurstBuffer::new(2);
        buffer.push(frame(1, 0.2, 1));
        buffer.push(frame(2, 0.5, 2));
        buffer.push(frame(3, 0.9, 3)); // evicts 0.2
        buffer.push(frame(4, 0.1, 4)); // dropped

        let top = buffer.take_top_k(2);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].score, 0.9);
        assert_eq!(top[1].score, 0.5);
    }

    #[test]
    fn test_top_k_ties_keep_arrival_order() {
        let mut buffer = BurstBuffer::new(8);
        buffer.push(frame(1, 0.5, 1));
        buffer.push(frame(2, 0.5, 2));
        buffer.push(frame(3, 0.5, 3));

        let top = buffer.take_top_k(2);
        assert_eq!(top[0].timestamp_ms, 1);
        assert_eq!(top[1].timestamp_ms, 2);
    }
}
