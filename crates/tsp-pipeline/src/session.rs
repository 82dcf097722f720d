// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Edit session state machine.
//
// `EditState` is an immutable snapshot. `reduce` takes a state and an event
// and returns the next state (version + 1) together with the effects the
// host must carry out. Loading, cropping, or flipping replaces the base
// raster, resets every parameter, and bumps the base version so all cached
// stages miss.

use std::sync::Arc;

use image::RgbaImage;
use tracing::debug;
use tsp_core::error::TspError;
use tsp_core::human_errors::humanize_error;
use tsp_core::{EditMode, EditParams, FilterKind, PrintType};
use tsp_filters::raster;

use crate::pipeline::PipelineRequest;

/// Axis for the flip action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlipAxis {
    Horizontal,
    Vertical,
}

/// Immutable edit-state snapshot.
#[derive(Debug, Clone, Default)]
pub struct EditState {
    pub base: Option<Arc<RgbaImage>>,
    pub base_version: u64,
    pub params: EditParams,
    pub mode: EditMode,
    /// Incremented on every event.
    pub version: u64,
}

impl EditState {
    pub fn has_image(&self) -> bool {
        self.base.is_some()
    }

    /// Pipeline request for this snapshot, or `None` with no image loaded.
    pub fn request(&self) -> Option<PipelineRequest> {
        self.base.as_ref().map(|base| PipelineRequest {
            base: Arc::clone(base),
            base_version: self.base_version,
            params: self.params.clone(),
            mode: self.mode,
            state_version: self.version,
        })
    }

    fn with_base(&self, base: RgbaImage) -> Self {
        Self {
            base: Some(Arc::new(base)),
            base_version: self.base_version + 1,
            params: EditParams::default(),
            mode: self.mode,
            version: self.version,
        }
    }
}

/// Everything the editor UI can ask for.
#[derive(Debug, Clone)]
pub enum EditEvent {
    ImageLoaded(RgbaImage),
    /// Result of the external crop screen.
    Cropped(RgbaImage),
    Flip(FlipAxis),
    SetFilter { kind: FilterKind, value: f32 },
    SetSketchDetails(f32),
    SetSketchGamma(f32),
    SetDotDensity(f32),
    SetDotSize(u32),
    ToggleDotwork,
    ToggleBlackAndWhite,
    ToggleRemoveBackground,
    ChangeMode(EditMode),
    SaveRequested,
    PrintTypeSelected(PrintType),
}

/// Work the host performs after a state transition.
#[derive(Debug, Clone)]
pub enum EditEffect {
    /// Recompute the display from this request (last request wins).
    Recompute(PipelineRequest),
    /// Show a short message to the user.
    Notify(String),
    /// Persist the current committed output.
    Save,
    /// Open the print preview for the chosen layout.
    OpenPrintPreview(PrintType),
}

fn notify(err: &TspError) -> EditEffect {
    EditEffect::Notify(humanize_error(err).one_line())
}

/// Apply `event` to `state`.
pub fn reduce(state: &EditState, event: EditEvent) -> (EditState, Vec<EditEffect>) {
    let mut next = state.clone();
    let mut recompute = false;
    let mut effects = Vec::new();

    match event {
        EditEvent::ImageLoaded(image) | EditEvent::Cropped(image) => {
            next = state.with_base(image);
            recompute = true;
        }
        EditEvent::Flip(axis) => match &state.base {
            Some(base) => {
                let flipped = match axis {
                    FlipAxis::Horizontal => raster::flip_horizontal(base),
                    FlipAxis::Vertical => raster::flip_vertical(base),
                };
                next = state.with_base(flipped);
                recompute = true;
            }
            None => effects.push(notify(&TspError::NoImageLoaded)),
        },
        EditEvent::SetFilter { kind, value } => {
            next.params.set(kind, value);
            recompute = true;
        }
        EditEvent::SetSketchDetails(value) => {
            next.params.set_sketch_details(value);
            recompute = true;
        }
        EditEvent::SetSketchGamma(value) => {
            next.params.set_sketch_gamma(value);
            recompute = true;
        }
        EditEvent::SetDotDensity(value) => {
            next.params.set_dot_density(value);
            recompute = next.params.dotwork_enabled();
        }
        EditEvent::SetDotSize(value) => {
            next.params.set_dot_size(value);
            recompute = next.params.dotwork_enabled();
        }
        EditEvent::ToggleDotwork => {
            let enabled = !next.params.dotwork_enabled();
            next.params.set_dotwork_enabled(enabled);
            recompute = true;
        }
        EditEvent::ToggleBlackAndWhite => {
            let enabled = !next.params.black_and_white();
            next.params.set_black_and_white(enabled);
            recompute = true;
        }
        EditEvent::ToggleRemoveBackground => {
            if state.has_image() {
                let enabled = !next.params.remove_background();
                next.params.set_remove_background(enabled);
                recompute = true;
            } else {
                effects.push(notify(&TspError::NoImageLoaded));
            }
        }
        EditEvent::ChangeMode(mode) => {
            next.mode = mode;
            recompute = true;
        }
        EditEvent::SaveRequested => {
            if state.has_image() {
                effects.push(EditEffect::Save);
            } else {
                effects.push(notify(&TspError::NoImageLoaded));
            }
        }
        EditEvent::PrintTypeSelected(print_type) => {
            if state.has_image() {
                effects.push(EditEffect::OpenPrintPreview(print_type));
            } else {
                effects.push(notify(&TspError::NoImageLoaded));
            }
        }
    }

    next.version = state.version + 1;
    if recompute {
        if let Some(request) = next.request() {
            effects.insert(0, EditEffect::Recompute(request));
        }
    }
    debug!(version = next.version, effects = effects.len(), "Edit event reduced");
    (next, effects)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn loaded() -> EditState {
        let img = RgbaImage::from_pixel(4, 2, Rgba([9, 9, 9, 255]));
        reduce(&EditState::default(), EditEvent::ImageLoaded(img)).0
    }

    fn has_recompute(effects: &[EditEffect]) -> bool {
        effects.iter().any(|e| matches!(e, EditEffect::Recompute(_)))
    }

    #[test]
    fn every_event_bumps_the_version() {
        let state = loaded();
        assert_eq!(state.version, 1);
        let (next, _) = reduce(&state, EditEvent::SaveRequested);
        assert_eq!(next.version, 2);
        // The old snapshot is untouched.
        assert_eq!(state.version, 1);
    }

    #[test]
    fn slider_change_recomputes_with_clamped_value() {
        let (next, effects) = reduce(
            &loaded(),
            EditEvent::SetFilter {
                kind: FilterKind::Brightness,
                value: 400.0,
            },
        );
        assert_eq!(next.params.brightness(), 100.0);
        match &effects[..] {
            [EditEffect::Recompute(req)] => {
                assert_eq!(req.state_version, next.version);
                assert_eq!(req.params.brightness(), 100.0);
            }
            other => panic!("unexpected effects {other:?}"),
        }
    }

    #[test]
    fn loading_resets_params_and_bumps_base_version() {
        let (tweaked, _) = reduce(
            &loaded(),
            EditEvent::SetFilter {
                kind: FilterKind::Gamma,
                value: 2.0,
            },
        );
        let (flipped, effects) = reduce(&tweaked, EditEvent::Flip(FlipAxis::Horizontal));
        assert_eq!(flipped.params, EditParams::default());
        assert_eq!(flipped.base_version, tweaked.base_version + 1);
        assert!(has_recompute(&effects));

        let cropped_img = RgbaImage::new(2, 2);
        let (cropped, _) = reduce(&flipped, EditEvent::Cropped(cropped_img));
        assert_eq!(cropped.base.as_ref().map(|b| b.dimensions()), Some((2, 2)));
        assert_eq!(cropped.base_version, flipped.base_version + 1);
    }

    #[test]
    fn remove_background_without_image_notifies() {
        let (next, effects) = reduce(&EditState::default(), EditEvent::ToggleRemoveBackground);
        assert!(!next.params.remove_background());
        assert!(matches!(&effects[..], [EditEffect::Notify(_)]));
    }

    #[test]
    fn dot_changes_recompute_only_with_dotwork_enabled() {
        let state = loaded();
        let (off, effects) = reduce(&state, EditEvent::SetDotDensity(1.0));
        assert_eq!(off.params.dot_density(), 1.0);
        assert!(!has_recompute(&effects));

        let (on, _) = reduce(&off, EditEvent::ToggleDotwork);
        let (_, effects) = reduce(&on, EditEvent::SetDotSize(8));
        assert!(has_recompute(&effects));
    }

    #[test]
    fn print_and_save_need_an_image() {
        let (_, effects) = reduce(&EditState::default(), EditEvent::PrintTypeSelected(PrintType::Back));
        assert!(matches!(&effects[..], [EditEffect::Notify(_)]));
        let (_, effects) = reduce(&loaded(), EditEvent::PrintTypeSelected(PrintType::Back));
        assert!(matches!(&effects[..], [EditEffect::OpenPrintPreview(PrintType::Back)]));
        let (_, effects) = reduce(&loaded(), EditEvent::SaveRequested);
        assert!(matches!(&effects[..], [EditEffect::Save]));
    }

    #[test]
    fn no_recompute_without_image() {
        let (_, effects) = reduce(&EditState::default(), EditEvent::ChangeMode(EditMode::Dotwork));
        assert!(effects.is_empty());
    }
}
