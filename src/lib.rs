//! Color picker core: a draggable target reticle, a magnifier bubble that
//! follows it, and the capture loop that samples the pixels underneath.
//!
//! Flow per frame:
//! capture source -> `capture::CaptureLoop` -> `sampler::FrameSampler`
//! (at the scan point from `positioning::PositioningEngine`) -> `render::RenderSink`.

pub mod capture;
pub mod config;
pub mod error;
pub mod geometry;
pub mod input;
pub mod positioning;
pub mod render;
pub mod sampler;
pub mod session;
pub mod synthetic;
pub mod types;

/// Webcam source (nokhwa backend is only wired up on these platforms).
#[cfg(any(target_os = "windows", target_os = "macos", target_os = "linux"))]
pub mod camera;

pub use capture::{CaptureLoop, CaptureSource, LoopState, TickOutcome};
pub use config::CaptureConfig;
pub use error::{CaptureError, ConfigError, SampleError};
pub use positioning::{GapPolicy, PositioningEngine};
pub use render::{RenderModel, RenderSink, UserAction};
pub use sampler::FrameSampler;
pub use session::{PickerSession, RunningFlag};
pub use types::{CircularRegion, Frame, SampleResult, ScanPoint, ScreenBounds};
