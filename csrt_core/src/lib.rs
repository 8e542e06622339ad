//! `csrt_core`: Channel and spatial reliability correlation-filter tracking.
//!
//! # Module layout
//! - [`types`]: Frames, real/complex maps, boxes and points
//! - [`error`]: Configuration and tracker errors
//! - [`config`]: Tracker parameters (JSON load / save, validation)
//! - [`spectral`]: 2-D DFT capability and element-wise spectrum helpers
//! - [`window`]: Feature windows and the Gaussian desired response
//! - [`patch`]: Sub-window extraction, resizing, dilation
//! - [`features`]: Feature-extraction capability and the bundled extractor
//! - [`segmentation`]: Colour histograms and per-pixel foreground posterior
//! - [`prior`]: Epanechnikov spatial prior
//! - [`mask`]: Reliability mask construction with fallback
//! - [`trainer`]: Constrained filter training (ADMM), parallel per channel
//! - [`weights`]: Channel reliability weights
//! - [`response`]: Correlation response and sub-pixel peak search
//! - [`confidence`]: Sharpness statistic, drift monitor, role-indexed filters
//! - [`scale`]: Scale-estimation capability
//! - [`tracker`]: Per-frame orchestration
//! - [`metrics`]: Center error, IoU, precision / success rates

pub mod confidence;
pub mod config;
pub mod error;
pub mod features;
pub mod mask;
pub mod metrics;
pub mod patch;
pub mod prior;
pub mod response;
pub mod scale;
pub mod segmentation;
pub mod spectral;
pub mod tracker;
pub mod trainer;
pub mod types;
pub mod weights;
pub mod window;

pub use confidence::{ConfidenceParams, TrackState};
pub use config::TrackerConfig;
pub use error::{ConfigError, TrackerError};
pub use features::{BasicFeatureExtractor, FeatureExtractor, FeatureSettings};
pub use metrics::TrackingMetrics;
pub use scale::{FixedScale, ScaleEstimator, ScaleParams};
pub use segmentation::{HistogramSegmentation, Segmentation};
pub use spectral::{RustFftTransform, SpectralTransform};
pub use tracker::{Collaborators, CsrTracker, FrameOutput, TemplateGeometry};
pub use types::{BoundingBox, Frame, GridSize, Point2, RealMap, Size2, Spectrum};
