// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Staged edit pipeline.
//
// Stage order is fixed:
//   1. basic         brightness, exposure, contrast, gamma, sharpness
//   2. advanced      sketch                            (mode >= Advanced)
//   3. post-process  Gaussian blur, then dotwork        (mode >= PostProcess)
//   4. final         background removal, then B&W      (always)
//
// Each filter runs fail-soft. Cancellation is checked between stages.

use std::sync::Arc;

use image::RgbaImage;
use tracing::{debug, info, instrument};
use tsp_bridge::SegmentationAdapter;
use tsp_core::error::Result;
use tsp_core::human_errors::humanize_error;
use tsp_core::{AppConfig, CancelFlag, EditMode, EditParams, FilterKind};
use tsp_filters::fail_soft::{StageOutput, fail_soft};
use tsp_filters::{TextureSet, adjust, convolve, dotwork, raster, remove_background, sketch};

use crate::cache::{BasicKey, SketchKey, StageCache};

/// Pipeline knobs taken from the application config.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub preview_max_dimension: u32,
    pub sharpen_preserve_background: bool,
    pub segmentation_threshold: f32,
    pub stipple_seed: u64,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for PipelineSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            preview_max_dimension: config.preview_max_dimension,
            sharpen_preserve_background: config.sharpen_preserve_background,
            segmentation_threshold: config.segmentation_threshold,
            stipple_seed: tsp_filters::stipple::DEFAULT_SEED,
        }
    }
}

/// Everything needed to recompute the display for one edit state.
#[derive(Debug, Clone)]
pub struct PipelineRequest {
    pub base: Arc<RgbaImage>,
    /// Bumped whenever the base raster is replaced (load, crop, flip).
    pub base_version: u64,
    pub params: EditParams,
    pub mode: EditMode,
    /// Version of the edit state this request was produced from.
    pub state_version: u64,
}

/// Result of one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// Full-resolution result.
    pub committed: Arc<RgbaImage>,
    /// Result capped to the preview size.
    pub preview: Arc<RgbaImage>,
    pub state_version: u64,
    /// User-facing messages for stages that fell back to their input.
    pub notices: Vec<String>,
}

/// Sketch renderer: (input, details, gamma).
pub type SketchFilter = fn(&RgbaImage, f32, f32) -> Result<RgbaImage>;

fn pencil_sketch(image: &RgbaImage, details: f32, gamma: f32) -> Result<RgbaImage> {
    Ok(sketch::sketch(image, details, gamma))
}

/// The staged pipeline with its cache and collaborators.
pub struct Pipeline {
    segmenter: Arc<dyn SegmentationAdapter>,
    textures: TextureSet,
    settings: PipelineSettings,
    sketcher: SketchFilter,
    cache: StageCache,
}

impl Pipeline {
    pub fn new(
        segmenter: Arc<dyn SegmentationAdapter>,
        textures: TextureSet,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            segmenter,
            textures,
            settings,
            sketcher: pencil_sketch,
            cache: StageCache::default(),
        }
    }

    /// Replace the pencil sketch used by the advanced stage.
    pub fn with_sketch_filter(mut self, sketcher: SketchFilter) -> Self {
        self.sketcher = sketcher;
        self
    }

    pub fn cache(&self) -> &StageCache {
        &self.cache
    }

    /// Run every enabled stage for `request`.
    #[instrument(skip_all, fields(version = request.state_version, mode = %request.mode))]
    pub fn run(&mut self, request: &PipelineRequest, cancel: &CancelFlag) -> Result<PipelineOutput> {
        let mut notices = Vec::new();
        let params = &request.params;
        cancel.check()?;

        // -- 1. Basic ---------------------------------------------------------
        let basic_key = BasicKey::new(
            request.base_version,
            params,
            self.settings.sharpen_preserve_background,
        );
        let basic = match self.cache.basic(&basic_key) {
            Some(hit) => {
                debug!("basic stage cache hit");
                hit
            }
            None => {
                let before = notices.len();
                let out = Arc::new(self.basic_stage(&request.base, params, cancel, &mut notices)?);
                if notices.len() == before {
                    self.cache.put_basic(basic_key, Arc::clone(&out));
                }
                out
            }
        };
        cancel.check()?;

        // -- 2. Advanced ------------------------------------------------------
        let mut current = basic;
        if request.mode >= EditMode::Advanced {
            let sketch_key = SketchKey::new(basic_key, params);
            current = match self.cache.sketch(&sketch_key) {
                Some(hit) => {
                    debug!("sketch stage cache hit");
                    hit
                }
                None => {
                    let sketcher = self.sketcher;
                    let output = fail_soft("sketch", &current, |img| {
                        sketcher(img, params.sketch_details(), params.sketch_gamma())
                    });
                    let failed = output.failure.is_some();
                    let out = Arc::new(soft(output, &mut notices));
                    // A fallback is not the sketch; retry it next run.
                    if !failed {
                        self.cache.put_sketch(sketch_key, Arc::clone(&out));
                    }
                    out
                }
            };
            cancel.check()?;
        }

        // -- 3. Post-process --------------------------------------------------
        let mut owned: Option<RgbaImage> = None;
        if request.mode >= EditMode::PostProcess {
            if params.gaussian_blur() > 1.0 {
                let input = owned.as_ref().unwrap_or(&*current);
                owned = Some(soft(
                    fail_soft("gaussian_blur", input, |img| {
                        Ok(convolve::gaussian_blur(img, params.gaussian_blur()))
                    }),
                    &mut notices,
                ));
                cancel.check()?;
            }
            if params.dotwork_enabled() && request.mode == EditMode::Dotwork {
                let input = owned.as_ref().unwrap_or(&*current);
                owned = Some(soft(
                    fail_soft("dotwork", input, |img| {
                        dotwork(
                            img,
                            params.dot_density(),
                            params.dot_size(),
                            &self.textures,
                            self.settings.stipple_seed,
                        )
                    }),
                    &mut notices,
                ));
                cancel.check()?;
            }
        }

        // -- 4. Final ---------------------------------------------------------
        if params.remove_background() {
            let input = owned.as_ref().unwrap_or(&*current);
            let segmenter = Arc::clone(&self.segmenter);
            let threshold = self.settings.segmentation_threshold;
            owned = Some(soft(
                fail_soft("remove_background", input, |img| {
                    remove_background(img, segmenter.as_ref(), threshold)
                }),
                &mut notices,
            ));
            cancel.check()?;
        }
        if params.black_and_white() {
            let input = owned.as_ref().unwrap_or(&*current);
            owned = Some(raster::black_and_white(input));
        }

        let committed = match owned {
            Some(img) => Arc::new(img),
            None => current,
        };
        let preview = if committed.width().max(committed.height()) > self.settings.preview_max_dimension {
            Arc::new(raster::downscale_to_fit(
                &committed,
                self.settings.preview_max_dimension,
            ))
        } else {
            Arc::clone(&committed)
        };

        info!(
            width = committed.width(),
            height = committed.height(),
            notices = notices.len(),
            "Pipeline run complete"
        );
        Ok(PipelineOutput {
            committed,
            preview,
            state_version: request.state_version,
            notices,
        })
    }

    /// Drop every cached stage (new base image).
    pub fn invalidate(&mut self) {
        self.cache.clear();
    }

    fn basic_stage(
        &self,
        base: &RgbaImage,
        params: &EditParams,
        cancel: &CancelFlag,
        notices: &mut Vec<String>,
    ) -> Result<RgbaImage> {
        let stages: [(FilterKind, TonalFilter); 5] = [
            (FilterKind::Brightness, |img, v, _| adjust::brightness(img, v)),
            (FilterKind::Exposure, |img, v, _| adjust::exposure(img, v)),
            (FilterKind::Contrast, |img, v, _| adjust::contrast(img, v)),
            (FilterKind::Gamma, |img, v, _| adjust::gamma(img, v)),
            (FilterKind::Sharpness, convolve::sharpen),
        ];
        let preserve = self.settings.sharpen_preserve_background;

        let mut current: Option<RgbaImage> = None;
        for (kind, filter) in stages {
            if params.is_neutral(kind) {
                continue;
            }
            cancel.check()?;
            let value = params.get(kind);
            let input = current.as_ref().unwrap_or(base);
            let output = fail_soft(kind.label(), input, |img| Ok(filter(img, value, preserve)));
            current = Some(soft(output, notices));
        }
        Ok(current.unwrap_or_else(|| base.clone()))
    }
}

/// A basic-stage filter: (input, slider value, preserve background).
type TonalFilter = fn(&RgbaImage, f32, bool) -> RgbaImage;

/// Unwrap a fail-soft output, turning any failure into a user notice.
fn soft(output: StageOutput, notices: &mut Vec<String>) -> RgbaImage {
    if let Some(err) = &output.failure {
        notices.push(humanize_error(err).one_line());
    }
    output.into_image()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use image::Rgba;
    use tsp_bridge::LumaKeySegmenter;
    use tsp_core::error::TspError;
    use tsp_bridge::stub::StubBridge;

    fn pipeline() -> Pipeline {
        Pipeline::new(
            Arc::new(LumaKeySegmenter::default()),
            TextureSet::default(),
            PipelineSettings::default(),
        )
    }

    fn request(base: RgbaImage, params: EditParams, mode: EditMode) -> PipelineRequest {
        PipelineRequest {
            base: Arc::new(base),
            base_version: 1,
            params,
            mode,
            state_version: 1,
        }
    }

    fn gray(w: u32, h: u32, v: u8) -> RgbaImage {
        RgbaImage::from_pixel(w, h, Rgba([v, v, v, 255]))
    }

    #[test]
    fn default_params_are_identity() {
        let base = RgbaImage::from_fn(20, 10, |x, y| Rgba([x as u8 * 10, y as u8 * 20, 77, 255]));
        let out = pipeline()
            .run(&request(base.clone(), EditParams::default(), EditMode::Basic), &CancelFlag::new())
            .unwrap();
        assert_eq!(*out.committed, base);
        assert!(out.notices.is_empty());
    }

    #[test]
    fn brightness_end_to_end_at_phone_resolution() {
        let base = gray(1000, 1500, 100);
        let params = EditParams::default().with(FilterKind::Brightness, 20.0);
        let out = pipeline()
            .run(&request(base, params, EditMode::Basic), &CancelFlag::new())
            .unwrap();
        assert_eq!(out.committed.dimensions(), (1000, 1500));
        // 20 * 1.27 = 25.4, rounded to 25.
        assert_eq!(*out.committed.get_pixel(500, 750), Rgba([125, 125, 125, 255]));
        assert_eq!(out.preview.dimensions(), (960, 1440));
    }

    #[test]
    fn basic_stage_is_cached_between_runs() {
        let mut p = pipeline();
        let params = EditParams::default().with(FilterKind::Contrast, 1.5);
        let req = request(gray(8, 8, 90), params, EditMode::Basic);
        let first = p.run(&req, &CancelFlag::new()).unwrap();
        let second = p.run(&req, &CancelFlag::new()).unwrap();
        assert!(Arc::ptr_eq(&first.committed, &second.committed));
    }

    #[test]
    fn sketch_only_runs_from_advanced_mode() {
        let base = gray(16, 16, 100);
        let mut p = pipeline();
        let basic = p
            .run(&request(base.clone(), EditParams::default(), EditMode::Basic), &CancelFlag::new())
            .unwrap();
        assert_eq!(basic.committed.get_pixel(0, 0)[0], 100);
        let advanced = p
            .run(&request(base, EditParams::default(), EditMode::Advanced), &CancelFlag::new())
            .unwrap();
        // A flat image sketches to white paper.
        assert_eq!(advanced.committed.get_pixel(0, 0)[0], 255);
    }

    #[test]
    fn dotwork_needs_both_mode_and_toggle() {
        let base = gray(24, 24, 0);
        let mut params = EditParams::default();
        params.set_dotwork_enabled(true);
        params.set_dot_density(2.0);
        params.set_dot_size(8);
        let mut p = pipeline();
        let post = p
            .run(&request(base.clone(), params.clone(), EditMode::PostProcess), &CancelFlag::new())
            .unwrap();
        assert!(post.committed.pixels().all(|px| px[0] == 0));
        let dots = p
            .run(&request(base, params, EditMode::Dotwork), &CancelFlag::new())
            .unwrap();
        assert!(dots.committed.pixels().any(|px| px[0] == 255));
    }

    #[test]
    fn failing_segmenter_passes_image_through_with_notice() {
        let mut p = Pipeline::new(Arc::new(StubBridge), TextureSet::default(), PipelineSettings::default());
        let mut params = EditParams::default();
        params.set_remove_background(true);
        params.set_black_and_white(true);
        let base = RgbaImage::from_pixel(4, 4, Rgba([255, 0, 0, 255]));
        let out = p.run(&request(base, params, EditMode::Basic), &CancelFlag::new()).unwrap();
        assert_eq!(out.notices.len(), 1);
        // B&W still ran after the failed stage.
        let px = out.committed.get_pixel(0, 0);
        assert_eq!((px[0], px[3]), (54, 255));
    }

    static FLAKY_CALLS: AtomicUsize = AtomicUsize::new(0);

    fn broken_sketch(_: &RgbaImage, _: f32, _: f32) -> Result<RgbaImage> {
        Err(TspError::Filter("sketch model unavailable".into()))
    }

    /// Fails on the first call only.
    fn flaky_sketch(image: &RgbaImage, details: f32, gamma: f32) -> Result<RgbaImage> {
        if FLAKY_CALLS.fetch_add(1, Ordering::SeqCst) == 0 {
            panic!("first sketch crashes");
        }
        Ok(sketch::sketch(image, details, gamma))
    }

    #[test]
    fn failed_sketch_is_reported_on_every_run() {
        let mut p = pipeline().with_sketch_filter(broken_sketch);
        let req = request(gray(8, 8, 100), EditParams::default(), EditMode::Advanced);
        for _ in 0..2 {
            let out = p.run(&req, &CancelFlag::new()).unwrap();
            assert_eq!(out.notices.len(), 1);
            assert_eq!(out.committed.get_pixel(0, 0)[0], 100);
        }
        // Only the clean basic output was kept.
        let key = BasicKey::new(1, &req.params, PipelineSettings::default().sharpen_preserve_background);
        assert!(p.cache().basic(&key).is_some());
        assert!(p.cache().sketch(&SketchKey::new(key, &req.params)).is_none());
    }

    #[test]
    fn sketch_recovers_after_a_transient_failure() {
        let mut p = pipeline().with_sketch_filter(flaky_sketch);
        let req = request(gray(8, 8, 100), EditParams::default(), EditMode::Advanced);
        let first = p.run(&req, &CancelFlag::new()).unwrap();
        assert_eq!(first.notices.len(), 1);
        assert_eq!(first.committed.get_pixel(0, 0)[0], 100);

        let second = p.run(&req, &CancelFlag::new()).unwrap();
        assert!(second.notices.is_empty());
        assert_eq!(second.committed.get_pixel(0, 0)[0], 255);
    }

    #[test]
    fn cancelled_run_returns_cancelled() {
        let cancel = CancelFlag::new();
        cancel.cancel();
        let err = pipeline()
            .run(&request(gray(4, 4, 9), EditParams::default(), EditMode::Basic), &cancel)
            .unwrap_err();
        assert!(matches!(err, TspError::Cancelled));
    }
}
