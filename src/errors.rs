use thiserror::Error;

/// Faults raised outside the per-frame path.
///
/// The frame path itself never errors: absent hands, degenerate geometry
/// and failed detections degrade to `None` / zero-confidence results with
/// reason tags instead.
#[derive(Debug, Error)]
pub enum RingGaugeError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Encoding error: {0}")]
    Encoding(String),
}
