//! Tracker configuration: a flat key-value structure persisted as JSON.
//!
//! Every key is optional on load (`#[serde(default)]`); missing keys take the
//! defaults below. Loading validates eagerly so a bad file never reaches
//! [`crate::CsrTracker::initialize`].

use crate::{
    confidence::ConfidenceParams,
    error::ConfigError,
    features::FeatureSettings,
    scale::ScaleParams,
    window::WindowKind,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration for the correlation-filter tracker.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Request gradient-orientation histogram channels
    pub use_hog: bool,
    /// Request colour-name channels
    pub use_color_names: bool,
    /// Request a grayscale channel
    pub use_gray: bool,
    /// Request raw RGB channels
    pub use_rgb: bool,
    /// Feature window: "hann", "cheb" or "kaiser"
    pub window_function: String,
    pub kaiser_alpha: f64,
    /// Chebyshev side-lobe attenuation (dB)
    pub cheb_attenuation: f64,
    /// Template inflation factor relative to sqrt(target area)
    pub padding: f64,
    /// Nominal template side length (pixels) after rescaling
    pub template_size: f64,
    /// Bandwidth of the Gaussian desired response (cells)
    pub gsl_sigma: f64,
    pub hog_orientations: usize,
    pub hog_clip: f64,
    pub num_hog_channels_used: usize,
    /// EMA rate for tracking-filter updates
    pub filter_lr: f64,
    /// EMA rate for channel weights
    pub weights_lr: f64,
    pub admm_iterations: usize,
    /// Scale-search sample count (must be odd)
    pub number_of_scales: usize,
    pub scale_sigma_factor: f64,
    pub scale_model_max_area: f64,
    pub scale_lr: f64,
    pub scale_step: f64,
    pub use_channel_weights: bool,
    pub use_segmentation: bool,
    pub histogram_bins: usize,
    pub background_ratio: usize,
    pub histogram_lr: f64,
    /// Ratio of frame statistic to baseline at which drift is suspected
    pub confidence_threshold: f64,
    /// Distance penalty of the sharpness score
    pub sharpness_kappa: f64,
    /// Additive bias inside the sharpness exponent
    pub sharpness_bias: f64,
    /// Rolling window of the confidence baseline (frames)
    pub confidence_history_len: usize,
    /// Decay of the detector blend factor per drift frame
    pub detector_decay: f64,
    /// Worker threads for filter training (0 = rayon default)
    pub worker_threads: usize,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            use_hog: true,
            use_color_names: true,
            use_gray: true,
            use_rgb: false,
            window_function: "hann".to_string(),
            kaiser_alpha: 3.72,
            cheb_attenuation: 45.0,
            padding: 3.2,
            template_size: 200.0,
            gsl_sigma: 1.0,
            hog_orientations: 9,
            hog_clip: 0.15,
            num_hog_channels_used: 18,
            filter_lr: 0.02,
            weights_lr: 0.02,
            admm_iterations: 4,
            number_of_scales: 33,
            scale_sigma_factor: 0.25,
            scale_model_max_area: 512.0,
            scale_lr: 0.025,
            scale_step: 1.02,
            use_channel_weights: true,
            use_segmentation: true,
            histogram_bins: 16,
            background_ratio: 2,
            histogram_lr: 0.04,
            confidence_threshold: 3.006125,
            sharpness_kappa: 11.01,
            sharpness_bias: 0.3625,
            confidence_history_len: 100,
            detector_decay: 0.1,
            worker_threads: 0,
        }
    }
}

impl TrackerConfig {
    /// Check every constraint the tracker relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.number_of_scales % 2 == 0 {
            return Err(ConfigError::EvenScaleCount(self.number_of_scales));
        }
        if !(self.use_hog || self.use_color_names || self.use_gray || self.use_rgb) {
            return Err(ConfigError::NoFeatures);
        }
        self.window_kind()?;

        for (key, value) in [
            ("filter_lr", self.filter_lr),
            ("weights_lr", self.weights_lr),
            ("histogram_lr", self.histogram_lr),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::InvalidValue {
                    key,
                    reason: format!("{value} is outside [0, 1]"),
                });
            }
        }
        for (key, value) in [
            ("padding", self.padding),
            ("template_size", self.template_size),
            ("gsl_sigma", self.gsl_sigma),
            ("confidence_threshold", self.confidence_threshold),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::InvalidValue {
                    key,
                    reason: format!("{value} must be finite and positive"),
                });
            }
        }
        if self.use_segmentation && (self.histogram_bins == 0 || self.background_ratio == 0) {
            return Err(ConfigError::InvalidValue {
                key: "histogram_bins",
                reason: "histogram_bins and background_ratio must be non-zero".into(),
            });
        }
        if self.confidence_history_len == 0 {
            return Err(ConfigError::InvalidValue {
                key: "confidence_history_len",
                reason: "must keep at least one entry".into(),
            });
        }
        Ok(())
    }

    /// Parse the configured window name.
    pub fn window_kind(&self) -> Result<WindowKind, ConfigError> {
        self.window_function.parse()
    }

    pub fn feature_settings(&self) -> FeatureSettings {
        FeatureSettings {
            use_hog: self.use_hog,
            use_color_names: self.use_color_names,
            use_gray: self.use_gray,
            use_rgb: self.use_rgb,
            hog_orientations: self.hog_orientations,
            hog_clip: self.hog_clip,
            num_hog_channels_used: self.num_hog_channels_used,
        }
    }

    pub fn scale_params(&self) -> ScaleParams {
        ScaleParams {
            number_of_scales: self.number_of_scales,
            scale_sigma_factor: self.scale_sigma_factor,
            scale_model_max_area: self.scale_model_max_area,
            scale_lr: self.scale_lr,
            scale_step: self.scale_step,
        }
    }

    pub fn confidence_params(&self) -> ConfidenceParams {
        ConfidenceParams {
            threshold: self.confidence_threshold,
            kappa: self.sharpness_kappa,
            bias: self.sharpness_bias,
            history_len: self.confidence_history_len,
            detector_decay: self.detector_decay,
        }
    }

    /// Serialise to pretty JSON.
    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse and validate a JSON document.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: TrackerConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
