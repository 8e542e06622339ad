//! Error types for configuration loading and tracker operation.

use crate::types::GridSize;
use thiserror::Error;

/// Configuration rejected at load / initialisation time.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("number_of_scales must be odd, got {0}")]
    EvenScaleCount(usize),
    #[error("at least one feature type (hog, color names, gray, rgb) must be enabled")]
    NoFeatures,
    #[error("not a valid window function: {0:?} (expected hann, cheb or kaiser)")]
    UnknownWindow(String),
    #[error("invalid value for {key}: {reason}")]
    InvalidValue { key: &'static str, reason: String },
    #[error("config parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("config i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors surfaced by [`crate::CsrTracker`].
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("update called before a successful initialize")]
    NotInitialized,
    #[error("frame has no pixels")]
    EmptyFrame,
    #[error("frame plane is {got}, expected {expected}")]
    FrameShape { expected: GridSize, got: GridSize },
    #[error("invalid initial bounding box: {0}")]
    InvalidBoundingBox(String),
    #[error("feature channel is {got}, expected the {expected} feature grid")]
    FeatureShape { expected: GridSize, got: GridSize },
    #[error("feature extractor returned no channels")]
    NoFeatureChannels,
    #[error("feature extractor returned {got} channels, filter bank has {expected}")]
    ChannelCount { expected: usize, got: usize },
    #[error("failed to build worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
}
