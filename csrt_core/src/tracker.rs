//! Tracker orchestrator: the full cycle for one video frame.
//!
//! # Processing steps per frame
//! 1. Normalise the frame to three channels (gray is broadcast)
//! 2. Extract features around the previous center and evaluate the tracking
//!    response (plain or channel-weighted sum)
//! 3. Score the response sharpness and feed the confidence monitor
//! 4. Peak → sub-pixel displacement → new center (clamped to the image)
//! 5. Scale from the scale estimator; bounding box = target size × scale
//! 6. Refresh colour histograms and the spatial mask (or use the default mask)
//! 7. Adapting: retrain, EMA the tracking filter, update channel weights.
//!    Drift suspected: blend the detector filter and let it override the
//!    position when its own statistic beats the baseline
//! 8. Update the scale estimator and report the box

use crate::{
    config::TrackerConfig,
    confidence::{
        sharpness, ConfidenceMonitor, FilterRole, FilterSet, TrackState, DETECTOR_SHARPNESS_CEILING,
        TRACKING_SHARPNESS_CEILING,
    },
    error::TrackerError,
    features::{BasicFeatureExtractor, FeatureExtractor},
    mask::{intersect_preset, MaskBuilder},
    patch::{get_subwindow, resize_frame},
    response::{evaluate_response, locate_peak, Peak},
    scale::{FixedScale, ScaleEstimator},
    segmentation::{HistogramSegmentation, RegionHistograms, Segmentation},
    spectral::{RustFftTransform, SpectralTransform},
    trainer::{AdmmParams, FilterTrainer},
    types::{BoundingBox, Frame, GridSize, Point2, RealMap, Size2, Spectrum},
    weights::{channel_scores, ChannelWeights},
    window::{build_window, gaussian_labels},
};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info, warn};

// ---------------------------------------------------------------------------
// Collaborators
// ---------------------------------------------------------------------------

/// External capabilities the tracker consumes.
pub struct Collaborators {
    pub features: Box<dyn FeatureExtractor>,
    pub transform: Box<dyn SpectralTransform>,
    pub segmentation: Box<dyn Segmentation>,
    pub scale: Box<dyn ScaleEstimator>,
}

impl Collaborators {
    /// The implementations shipped with this crate, configured from `config`.
    pub fn bundled(config: &TrackerConfig) -> Self {
        Self {
            features: Box::new(BasicFeatureExtractor::new(config.feature_settings())),
            transform: Box::new(RustFftTransform::new()),
            segmentation: Box::new(HistogramSegmentation::new(
                config.histogram_bins,
                config.background_ratio,
            )),
            scale: Box::new(FixedScale::default()),
        }
    }
}

// ---------------------------------------------------------------------------
// Geometry
// ---------------------------------------------------------------------------

/// Template geometry fixed at initialisation.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TemplateGeometry {
    /// Target size in the initial frame
    pub target: Size2,
    /// Square search template in image pixels
    pub template: Size2,
    /// Shrink factor from template to the nominal template size (≤ 1)
    pub rescale_ratio: f64,
    /// Template size after rescaling (pixels)
    pub rescaled: GridSize,
    /// Pixels per feature cell, 1 to 4
    pub cell_size: usize,
    /// Feature grid (`rescaled / cell_size`)
    pub grid: GridSize,
}

impl TemplateGeometry {
    pub fn new(target: Size2, padding: f64, template_size: f64) -> Result<Self, TrackerError> {
        let area = target.area();
        let cell_size = (area / 400.0).ceil().clamp(1.0, 4.0) as usize;

        let pad = padding * area.sqrt();
        let side = ((target.width + pad).floor() + (target.height + pad).floor()) / 2.0;
        let rescale_ratio = (template_size * template_size / (side * side)).sqrt().min(1.0);
        let rescaled_side = (side * rescale_ratio).floor() as usize;
        let rescaled = GridSize::new(rescaled_side, rescaled_side);
        let grid = GridSize::new(rescaled_side / cell_size, rescaled_side / cell_size);

        if grid.rows < 2 || grid.cols < 2 {
            return Err(TrackerError::InvalidBoundingBox(format!(
                "target {}x{} gives a degenerate {grid} feature grid",
                target.width, target.height
            )));
        }
        Ok(Self {
            target,
            template: Size2::new(side, side),
            rescale_ratio,
            rescaled,
            cell_size,
            grid,
        })
    }

    /// Target size on the feature grid.
    pub fn target_cells(&self) -> Size2 {
        let f = self.rescale_ratio / self.cell_size as f64;
        Size2::new((self.target.width * f).floor(), (self.target.height * f).floor())
    }

    /// Search patch `(width, height)` in image pixels at `scale`.
    pub fn patch_size(&self, scale: f64) -> (usize, usize) {
        (
            (self.template.width * scale).floor() as usize,
            (self.template.height * scale).floor() as usize,
        )
    }

    /// Image pixels per feature cell at `scale`.
    pub fn cell_extent(&self, scale: f64) -> f64 {
        self.cell_size as f64 / self.rescale_ratio * scale
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// Everything one frame produced.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FrameOutput {
    pub bbox: BoundingBox,
    pub state: TrackState,
    /// Sharpness × peak of the tracking response
    pub statistic: f64,
    pub baseline: f64,
    pub ratio: f64,
    /// The detector filter was rebuilt and evaluated
    pub detector_engaged: bool,
    /// The detector's position replaced the tracking position
    pub detector_override: bool,
    /// Sharpness × peak of the detector response, on drift frames
    pub detector_statistic: Option<f64>,
    /// The default mask replaced the segmentation mask
    pub mask_fallback: bool,
    pub elapsed_us: u64,
}

// ---------------------------------------------------------------------------
// Tracker
// ---------------------------------------------------------------------------

/// State created by a successful initialisation.
struct TrackModel {
    geometry: TemplateGeometry,
    image_size: GridSize,
    window: RealMap,
    labels: Spectrum,
    masks: MaskBuilder,
    mask: RealMap,
    histograms: Option<RegionHistograms>,
    filters: FilterSet,
    weights: Option<ChannelWeights>,
    monitor: ConfidenceMonitor,
    center: Point2,
    scale: f64,
    bbox: BoundingBox,
}

/// Single-object correlation-filter tracker.
pub struct CsrTracker {
    config: TrackerConfig,
    collab: Collaborators,
    trainer: FilterTrainer,
    model: Option<TrackModel>,
}

impl CsrTracker {
    /// Build a tracker; the configuration is validated by [`Self::initialize`].
    pub fn new(config: TrackerConfig, collaborators: Collaborators) -> Result<Self, TrackerError> {
        let trainer = FilterTrainer::new(
            AdmmParams::with_iterations(config.admm_iterations),
            config.worker_threads,
        )?;
        Ok(Self {
            config,
            collab: collaborators,
            trainer,
            model: None,
        })
    }

    /// Tracker wired to the bundled collaborators.
    pub fn with_bundled(config: TrackerConfig) -> Result<Self, TrackerError> {
        let collab = Collaborators::bundled(&config);
        Self::new(config, collab)
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn is_initialized(&self) -> bool {
        self.model.is_some()
    }

    pub fn bounding_box(&self) -> Option<BoundingBox> {
        self.model.as_ref().map(|m| m.bbox)
    }

    pub fn geometry(&self) -> Option<&TemplateGeometry> {
        self.model.as_ref().map(|m| &m.geometry)
    }

    pub fn channel_weights(&self) -> Option<&[f64]> {
        self.model
            .as_ref()
            .and_then(|m| m.weights.as_ref())
            .map(|w| w.as_slice())
    }

    /// Start a track on `frame` at `bbox`.
    ///
    /// `preset_mask` (any size) is centred into the first segmentation mask and
    /// multiplied with it; an all-zero preset is ignored. Nothing is committed
    /// unless every step succeeds.
    pub fn initialize(
        &mut self,
        frame: &Frame,
        bbox: BoundingBox,
        preset_mask: Option<&RealMap>,
    ) -> Result<(), TrackerError> {
        let config = &self.config;
        config.validate()?;
        let window_kind = config.window_kind()?;
        if !(bbox.x.is_finite() && bbox.y.is_finite() && bbox.width > 0.0 && bbox.height > 0.0) {
            return Err(TrackerError::InvalidBoundingBox(format!("{bbox:?}")));
        }

        let frame = frame.to_color();
        let fft = self.collab.transform.as_ref();
        let geometry = TemplateGeometry::new(bbox.size(), config.padding, config.template_size)?;
        let grid = geometry.grid;
        let labels = fft.forward(&gaussian_labels(config.gsl_sigma, grid));
        let window = build_window(window_kind, grid, config.cheb_attenuation, config.kaiser_alpha);
        let masks = MaskBuilder::new(grid, geometry.target_cells());
        let center = bbox.center();
        let scale = 1.0;

        let (histograms, mask) = if config.use_segmentation {
            let segmentation = self.collab.segmentation.as_ref();
            let hist = segmentation.extract_histograms(&frame, &bbox);
            let (pw, ph) = geometry.patch_size(scale);
            let mut patch_mask = masks.segment_region(
                &frame,
                center,
                pw,
                ph,
                geometry.target.scaled(scale),
                segmentation,
                &hist,
            );
            if let Some(preset) = preset_mask {
                match intersect_preset(&patch_mask, preset) {
                    Some(m) => patch_mask = m,
                    None => warn!("preset mask is empty, ignored"),
                }
            }
            let outcome = masks.finalize(&patch_mask);
            (Some(hist), outcome.mask)
        } else {
            (None, masks.default_mask().clone())
        };

        let spectra = extract_spectra(
            self.collab.features.as_ref(),
            fft,
            &geometry,
            &window,
            &frame,
            center,
            scale,
        )?;
        if spectra.is_empty() {
            return Err(TrackerError::NoFeatureChannels);
        }

        let bank = self.trainer.train(&spectra, &labels, &mask, fft);
        let weights = config
            .use_channel_weights
            .then(|| ChannelWeights::from_scores(&channel_scores(&spectra, &bank, fft)));

        self.collab
            .scale
            .init(&frame, &bbox, geometry.template, &config.scale_params());

        info!(
            target_w = bbox.width,
            target_h = bbox.height,
            grid = %grid,
            cell_size = geometry.cell_size,
            channels = spectra.len(),
            threads = self.trainer.num_threads(),
            "track initialised"
        );

        self.model = Some(TrackModel {
            geometry,
            image_size: frame.size(),
            window,
            labels,
            masks,
            mask,
            histograms,
            filters: FilterSet::new(bank),
            weights,
            monitor: ConfidenceMonitor::new(config.confidence_params()),
            center,
            scale,
            bbox,
        });
        Ok(())
    }

    /// Track into `frame` and return the new bounding box.
    pub fn update(&mut self, frame: &Frame) -> Result<BoundingBox, TrackerError> {
        self.step(frame).map(|out| out.bbox)
    }

    /// Track into `frame`, returning the box with per-frame diagnostics.
    pub fn step(&mut self, frame: &Frame) -> Result<FrameOutput, TrackerError> {
        let started = Instant::now();
        let Self {
            config,
            collab,
            trainer,
            model,
        } = self;
        let model = model.as_mut().ok_or(TrackerError::NotInitialized)?;

        let frame = frame.to_color();
        if frame.size() != model.image_size {
            return Err(TrackerError::FrameShape {
                expected: model.image_size,
                got: frame.size(),
            });
        }
        let fft = collab.transform.as_ref();
        let features = collab.features.as_ref();

        // Steps 2-3: tracking response and confidence
        let search = model.spectra(features, fft, &frame, model.center)?;
        let response = evaluate_response(
            &search,
            &model.filters[FilterRole::Tracking],
            model.weights.as_ref(),
            fft,
        );
        let peak = locate_peak(&response);
        let params = *model.monitor.params();
        let score = sharpness(
            &response,
            model.bbox.area(),
            params.kappa,
            params.bias,
            TRACKING_SHARPNESS_CEILING,
        );
        let assessment = model.monitor.observe(score * peak.value);

        // Steps 4-5: position and scale
        model.center = model.displaced(model.center, &peak);
        let scale = collab.scale.get_scale(&frame, model.center);
        if scale.is_finite() && scale > 0.0 {
            model.scale = scale;
        } else {
            warn!(scale, "scale estimator returned an unusable factor, keeping previous scale");
        }
        model.bbox = model.box_at(model.center);

        // Step 6: spatial mask
        let mask_fallback = model.refresh_mask(config, collab.segmentation.as_ref(), &frame);

        // Step 7: adapt or consult the detector
        let fresh = model.spectra(features, fft, &frame, model.center)?;
        let mut detector_override = false;
        let mut detector_statistic = None;
        match assessment.state {
            TrackState::Adapting => {
                let bank = trainer.train(&fresh, &model.labels, &model.mask, fft);
                if let Some(weights) = model.weights.as_mut() {
                    weights.update(&channel_scores(&fresh, &bank, fft), config.weights_lr);
                }
                model.filters.adapt_tracking(&bank, config.filter_lr);
            }
            TrackState::DriftSuspected => {
                let blend = model.monitor.register_drift();
                model.filters.blend_detector(blend);
                let det_response = evaluate_response(
                    &fresh,
                    &model.filters[FilterRole::Detector],
                    model.weights.as_ref(),
                    fft,
                );
                let det_peak = locate_peak(&det_response);
                let det_score = sharpness(
                    &det_response,
                    model.bbox.area(),
                    params.kappa,
                    params.bias,
                    DETECTOR_SHARPNESS_CEILING,
                );
                let det_statistic = det_score * det_peak.value;
                detector_statistic = Some(det_statistic);
                if det_statistic > assessment.baseline {
                    model.center = model.displaced(model.center, &det_peak);
                    model.bbox = model.box_at(model.center);
                    detector_override = true;
                }
                debug!(
                    blend,
                    drift_frames = model.monitor.drift_count(),
                    det_statistic,
                    detector_override,
                    "drift suspected"
                );
            }
        }

        // Step 8
        collab.scale.update(&frame, model.center);

        debug!(
            x = model.center.x,
            y = model.center.y,
            scale = model.scale,
            ratio = assessment.ratio,
            state = ?assessment.state,
            "frame tracked"
        );

        Ok(FrameOutput {
            bbox: model.bbox,
            state: assessment.state,
            statistic: assessment.statistic,
            baseline: assessment.baseline,
            ratio: assessment.ratio,
            detector_engaged: assessment.state == TrackState::DriftSuspected,
            detector_override,
            detector_statistic,
            mask_fallback,
            elapsed_us: u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX),
        })
    }
}

impl TrackModel {
    /// Windowed feature spectra of the search patch around `center`.
    fn spectra(
        &self,
        features: &dyn FeatureExtractor,
        fft: &dyn SpectralTransform,
        frame: &Frame,
        center: Point2,
    ) -> Result<Vec<Spectrum>, TrackerError> {
        let spectra = extract_spectra(features, fft, &self.geometry, &self.window, frame, center, self.scale)?;
        let expected = self.filters.channel_count();
        if spectra.len() != expected {
            return Err(TrackerError::ChannelCount {
                expected,
                got: spectra.len(),
            });
        }
        Ok(spectra)
    }

    /// Move `center` by a response peak's displacement, clamped to the image.
    fn displaced(&self, center: Point2, peak: &Peak) -> Point2 {
        let step = self.geometry.cell_extent(self.scale);
        let max_x = self.image_size.cols as f64 - 1.0;
        let max_y = self.image_size.rows as f64 - 1.0;
        Point2::new(
            (center.x + step * peak.dx).clamp(0.0, max_x),
            (center.y + step * peak.dy).clamp(0.0, max_y),
        )
    }

    fn box_at(&self, center: Point2) -> BoundingBox {
        BoundingBox::from_center(center, self.geometry.target.scaled(self.scale))
    }

    /// Refresh histograms and rebuild the mask at the current box; returns
    /// whether the default mask had to stand in.
    fn refresh_mask(&mut self, config: &TrackerConfig, segmentation: &dyn Segmentation, frame: &Frame) -> bool {
        let Some(hist) = self.histograms.as_mut().filter(|_| config.use_segmentation) else {
            self.mask = self.masks.default_mask().clone();
            return false;
        };
        let fresh = segmentation.extract_histograms(frame, &self.bbox);
        hist.blend(&fresh, config.histogram_lr);

        let (pw, ph) = self.geometry.patch_size(self.scale);
        let patch_mask = self.masks.segment_region(
            frame,
            self.center,
            pw,
            ph,
            self.geometry.target.scaled(self.scale),
            segmentation,
            hist,
        );
        let outcome = self.masks.finalize(&patch_mask);
        self.mask = outcome.mask;
        outcome.fell_back
    }
}

/// Patch at `center` → rescaled template → features × window → spectra.
fn extract_spectra(
    features: &dyn FeatureExtractor,
    fft: &dyn SpectralTransform,
    geometry: &TemplateGeometry,
    window: &RealMap,
    frame: &Frame,
    center: Point2,
    scale: f64,
) -> Result<Vec<Spectrum>, TrackerError> {
    let (pw, ph) = geometry.patch_size(scale);
    let (patch, _) = get_subwindow(frame, center, pw, ph);
    let patch = resize_frame(&patch, geometry.rescaled);
    features
        .extract(&patch, geometry.grid)
        .iter()
        .map(|channel| {
            let got = GridSize::of(channel);
            if got != geometry.grid {
                return Err(TrackerError::FeatureShape {
                    expected: geometry.grid,
                    got,
                });
            }
            Ok(fft.forward(&channel.component_mul(window)))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn gray_frame(value: f64) -> Frame {
        Frame::uniform(200, 200, 1, value)
    }

    /// Bright square with a soft gradient on a dark background.
    fn blob_frame(cx: f64, cy: f64) -> Frame {
        let plane = RealMap::from_fn(160, 160, |i, j| {
            let dx = j as f64 - cx;
            let dy = i as f64 - cy;
            if dx.abs() < 12.0 && dy.abs() < 12.0 {
                200.0 - 2.0 * (dx + dy)
            } else {
                30.0 + ((i * 7 + j * 13) % 11) as f64
            }
        });
        Frame::rgb(plane.clone(), plane.map(|v| v * 0.5), plane.map(|v| 255.0 - v)).unwrap()
    }

    #[test]
    fn geometry_matches_template_rules() {
        let g = TemplateGeometry::new(Size2::new(50.0, 50.0), 3.2, 200.0).unwrap();
        assert_eq!(g.cell_size, 4);
        assert_abs_diff_eq!(g.template.width, 210.0);
        assert!(g.rescale_ratio < 1.0);
        assert!(g.grid.rows >= 49 && g.grid.rows <= 50);
        let cells = g.target_cells();
        assert_eq!((cells.width, cells.height), (11.0, 11.0));
        let masks = MaskBuilder::new(g.grid, cells);
        assert_abs_diff_eq!(masks.default_area(), 121.0);

        let small = TemplateGeometry::new(Size2::new(10.0, 10.0), 3.2, 200.0).unwrap();
        assert_eq!(small.cell_size, 1);
        assert_abs_diff_eq!(small.rescale_ratio, 1.0);
        assert_eq!(small.grid, GridSize::new(42, 42));
    }

    #[test]
    fn tracker_can_move_across_threads() {
        fn assert_send<T: Send>() {}
        assert_send::<CsrTracker>();
    }

    #[test]
    fn update_before_initialize_fails() {
        let mut tracker = CsrTracker::with_bundled(TrackerConfig::default()).unwrap();
        let res = tracker.update(&gray_frame(128.0));
        assert!(matches!(res, Err(TrackerError::NotInitialized)));
    }

    #[test]
    fn unknown_window_fails_without_committing_state() {
        let config = TrackerConfig {
            window_function: "triangle".into(),
            ..Default::default()
        };
        let mut tracker = CsrTracker::with_bundled(config).unwrap();
        let res = tracker.initialize(&gray_frame(128.0), BoundingBox::new(75.0, 75.0, 50.0, 50.0), None);
        assert!(matches!(
            res,
            Err(TrackerError::Config(crate::error::ConfigError::UnknownWindow(_)))
        ));
        assert!(!tracker.is_initialized());
        assert!(matches!(
            tracker.update(&gray_frame(128.0)),
            Err(TrackerError::NotInitialized)
        ));
    }

    #[test]
    fn uniform_gray_frame_does_not_drift() {
        let mut tracker = CsrTracker::with_bundled(TrackerConfig::default()).unwrap();
        let frame = gray_frame(128.0);
        let init = BoundingBox::new(75.0, 75.0, 50.0, 50.0);
        tracker.initialize(&frame, init, None).unwrap();
        for _ in 0..20 {
            let bb = tracker.update(&frame).unwrap();
            assert!(bb.center().distance(&init.center()) < 1.0);
            assert_abs_diff_eq!(bb.width, 50.0, epsilon = 1e-9);
        }
        let weights = tracker.channel_weights().unwrap();
        assert_abs_diff_eq!(weights.iter().sum::<f64>(), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn frame_size_change_is_rejected() {
        let mut tracker = CsrTracker::with_bundled(TrackerConfig::default()).unwrap();
        tracker
            .initialize(&gray_frame(100.0), BoundingBox::new(75.0, 75.0, 50.0, 50.0), None)
            .unwrap();
        let res = tracker.update(&Frame::uniform(100, 100, 3, 100.0));
        assert!(matches!(res, Err(TrackerError::FrameShape { .. })));
    }

    #[test]
    fn only_color_names_yields_no_channels() {
        let config = TrackerConfig {
            use_hog: false,
            use_gray: false,
            use_rgb: false,
            use_color_names: true,
            ..Default::default()
        };
        let mut tracker = CsrTracker::with_bundled(config).unwrap();
        let res = tracker.initialize(&gray_frame(90.0), BoundingBox::new(75.0, 75.0, 50.0, 50.0), None);
        assert!(matches!(res, Err(TrackerError::NoFeatureChannels)));
        assert!(!tracker.is_initialized());
    }

    #[test]
    fn follows_a_shifted_blob() {
        let config = TrackerConfig {
            use_color_names: false,
            use_rgb: true,
            ..Default::default()
        };
        let mut tracker = CsrTracker::with_bundled(config).unwrap();
        tracker
            .initialize(&blob_frame(80.0, 80.0), BoundingBox::new(68.0, 68.0, 24.0, 24.0), None)
            .unwrap();
        let mut last = Point2::new(80.0, 80.0);
        for k in 1..=6 {
            let target = Point2::new(80.0 + 2.0 * k as f64, 80.0 + k as f64);
            let out = tracker.step(&blob_frame(target.x, target.y)).unwrap();
            last = out.bbox.center();
            assert!(out.statistic.is_finite());
        }
        assert!(last.distance(&Point2::new(92.0, 86.0)) < 4.0, "ended at {last:?}");
    }

    #[test]
    fn preset_mask_is_accepted() {
        let mut tracker = CsrTracker::with_bundled(TrackerConfig::default()).unwrap();
        let preset = RealMap::from_element(40, 40, 1.0);
        tracker
            .initialize(&blob_frame(80.0, 80.0), BoundingBox::new(68.0, 68.0, 24.0, 24.0), Some(&preset))
            .unwrap();
        assert!(tracker.is_initialized());
        assert!(tracker.update(&blob_frame(80.0, 80.0)).is_ok());
    }

    fn bank_distance(a: &[Spectrum], b: &[Spectrum]) -> f64 {
        a.iter().zip(b).map(|(x, y)| (x - y).norm()).sum()
    }

    #[test]
    fn drift_frames_blend_detector_and_freeze_tracking() {
        // A threshold far below 1 turns every update after the first into a
        // drift frame.
        let config = TrackerConfig {
            use_color_names: false,
            use_rgb: true,
            confidence_threshold: 1e-9,
            ..Default::default()
        };
        let mut tracker = CsrTracker::with_bundled(config).unwrap();
        tracker
            .initialize(&blob_frame(80.0, 80.0), BoundingBox::new(68.0, 68.0, 24.0, 24.0), None)
            .unwrap();

        let first = tracker.step(&blob_frame(81.0, 80.0)).unwrap();
        assert_eq!(first.state, TrackState::Adapting);
        assert!(!first.detector_engaged);
        assert!(first.detector_statistic.is_none());

        let model = tracker.model.as_ref().unwrap();
        let tracking = model.filters[FilterRole::Tracking].to_vec();
        let snapshot = model.filters[FilterRole::Snapshot].to_vec();
        let weights = model.weights.as_ref().unwrap().as_slice().to_vec();
        assert!(bank_distance(&tracking, &snapshot) > 0.0);
        assert_eq!(model.monitor.history().len(), 1);

        for k in 1..=3u32 {
            let out = tracker.step(&blob_frame(81.0 + k as f64, 80.0 + k as f64)).unwrap();
            assert_eq!(out.state, TrackState::DriftSuspected);
            assert!(out.detector_engaged);
            let det = out.detector_statistic.unwrap();
            assert_eq!(out.detector_override, det > out.baseline);

            let model = tracker.model.as_ref().unwrap();
            assert_eq!(model.monitor.drift_count(), k);
            assert_eq!(model.monitor.history().len(), 1);
            assert_eq!(bank_distance(&model.filters[FilterRole::Tracking], &tracking), 0.0);
            assert_eq!(bank_distance(&model.filters[FilterRole::Snapshot], &snapshot), 0.0);
            assert_eq!(model.weights.as_ref().unwrap().as_slice(), weights.as_slice());

            let b = (-0.1 * k as f64).exp();
            assert_abs_diff_eq!(model.monitor.blend_factor(), b, epsilon = 1e-12);
            let expected: Vec<Spectrum> = snapshot
                .iter()
                .zip(&tracking)
                .map(|(s, t)| crate::spectral::blend(s, 1.0 - b, t, b))
                .collect();
            let scale: f64 = expected.iter().map(|e| e.norm()).sum();
            let err = bank_distance(&model.filters[FilterRole::Detector], &expected);
            assert!(err <= 1e-9 * scale.max(1.0), "detector off by {err}");
        }
    }

    #[test]
    fn runs_without_segmentation() {
        let config = TrackerConfig {
            use_color_names: false,
            use_rgb: true,
            use_segmentation: false,
            ..Default::default()
        };
        let mut tracker = CsrTracker::with_bundled(config).unwrap();
        tracker
            .initialize(&blob_frame(80.0, 80.0), BoundingBox::new(68.0, 68.0, 24.0, 24.0), None)
            .unwrap();
        let default_mask = tracker.model.as_ref().unwrap().masks.default_mask().clone();
        for k in 1..=5 {
            let out = tracker.step(&blob_frame(80.0 + k as f64, 80.0)).unwrap();
            assert!(!out.mask_fallback);
            assert!(out.bbox.x.is_finite() && out.bbox.y.is_finite());
            assert!(out.elapsed_us < u64::MAX);
            assert_eq!(tracker.model.as_ref().unwrap().mask, default_mask);
        }
        assert!(tracker.model.as_ref().unwrap().histograms.is_none());
    }

    #[test]
    fn runs_without_channel_weights() {
        let config = TrackerConfig {
            use_color_names: false,
            use_rgb: true,
            use_channel_weights: false,
            ..Default::default()
        };
        let mut tracker = CsrTracker::with_bundled(config).unwrap();
        tracker
            .initialize(&blob_frame(80.0, 80.0), BoundingBox::new(68.0, 68.0, 24.0, 24.0), None)
            .unwrap();
        assert!(tracker.channel_weights().is_none());
        let mut last = Point2::new(80.0, 80.0);
        for k in 1..=5 {
            last = tracker.update(&blob_frame(80.0 + k as f64, 80.0)).unwrap().center();
        }
        assert!(tracker.channel_weights().is_none());
        assert!(last.distance(&Point2::new(85.0, 80.0)) < 4.0, "ended at {last:?}");
    }

    #[test]
    fn two_channel_frame_initializes() {
        let a = RealMap::from_fn(120, 120, |i, j| if (50..70).contains(&i) && (50..70).contains(&j) { 220.0 } else { 30.0 });
        let frame = Frame::from_channels(vec![a.clone(), a]).unwrap();
        let mut tracker = CsrTracker::with_bundled(TrackerConfig::default()).unwrap();
        tracker
            .initialize(&frame, BoundingBox::new(50.0, 50.0, 20.0, 20.0), None)
            .unwrap();
        assert!(tracker.update(&frame).is_ok());
    }

    #[test]
    fn degenerate_uniform_frame_does_not_panic() {
        let mut tracker = CsrTracker::with_bundled(TrackerConfig::default()).unwrap();
        let res = tracker.initialize(&Frame::uniform(0, 0, 3, 0.0), BoundingBox::new(0.0, 0.0, 1.0, 1.0), None);
        assert_eq!(res.is_ok(), tracker.is_initialized());
    }
}
