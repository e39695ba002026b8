/// Testing utilities
///
/// Synthetic frames and fake detection backends for offline testing
/// without a camera or real model backends.
pub mod synthetic;

pub use synthetic::{
    blank_gray, card_scene, checkerboard_luma, gradient_luma, measurement_scene, uniform_luma,
    FakeHandLandmarker, FakeHandTracker,
};
