// Error types for the picker core and the demo host.
// Every variant states *where* things went wrong.
use std::path::PathBuf;
use thiserror::Error;

/// Why a single sampling cycle could not produce a result.
/// These are per-cycle: the capture loop logs them and keeps going.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SampleError {
    #[error("frame has no pixel buffer")]
    MissingBuffer,

    #[error("malformed frame: {0}")]
    MalformedFrame(String),

    #[error("invalid crop size {crop_size} for a {width}x{height} frame")]
    InvalidCropSize {
        crop_size: u32,
        width: u32,
        height: u32,
    },
}

/// Failures coming from a capture source.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CaptureError {
    /// The source went away for good (device unplugged, permission revoked).
    /// Terminal: the loop stops and does not retry.
    #[error("capture source lost: {0}")]
    CaptureLost(String),

    #[error("capture source init error: {0}")]
    SourceInit(String),
}

/// Problems loading or validating a `CaptureConfig`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("gap policy requires 0 <= min_gap < max_gap (got min {min_gap}, max {max_gap})")]
    InvalidGapPolicy { min_gap: f64, max_gap: f64 },

    #[error("crop size must be at least 1")]
    InvalidCropSize,

    #[error("capture delay must be at least 1 ms")]
    InvalidDelay,
}

/// Top-level error for the demo binary.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("window init error: {0}")]
    WindowInit(String),

    #[error("window update error: {0}")]
    WindowUpdate(String),

    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
