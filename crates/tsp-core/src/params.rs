// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Edit parameters. Every write is clamped into the documented range; values
// are never rejected.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// The six slider-driven filters of the basic and post-process stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterKind {
    Brightness,
    Contrast,
    Exposure,
    Gamma,
    Sharpness,
    GaussianBlur,
}

impl FilterKind {
    pub const ALL: [FilterKind; 6] = [
        Self::Brightness,
        Self::Contrast,
        Self::Exposure,
        Self::Gamma,
        Self::Sharpness,
        Self::GaussianBlur,
    ];

    /// Inclusive (min, max) slider range.
    pub fn range(&self) -> (f32, f32) {
        match self {
            Self::Brightness => (-100.0, 100.0),
            Self::Contrast => (0.0, 3.0),
            Self::Exposure => (0.5, 3.0),
            Self::Gamma => (0.1, 3.0),
            Self::Sharpness => (0.0, 10.0),
            Self::GaussianBlur => (1.0, 25.0),
        }
    }

    /// Neutral value: the filter is skipped when set to this.
    pub fn default_value(&self) -> f32 {
        match self {
            Self::Brightness | Self::Sharpness => 0.0,
            Self::Contrast | Self::Exposure | Self::Gamma | Self::GaussianBlur => 1.0,
        }
    }

    /// Clamp `value` into range. NaN falls back to the neutral value.
    pub fn clamp(&self, value: f32) -> f32 {
        let (min, max) = self.range();
        clamp_or(value, min, max, self.default_value())
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Brightness => "Brightness",
            Self::Contrast => "Contrast",
            Self::Exposure => "Exposure",
            Self::Gamma => "Gamma",
            Self::Sharpness => "Sharpness",
            Self::GaussianBlur => "Gaussian blur",
        }
    }
}

pub const SKETCH_DETAILS_RANGE: (f32, f32) = (1.0, 50.0);
pub const SKETCH_GAMMA_RANGE: (f32, f32) = (0.1, 3.0);
pub const DOT_DENSITY_RANGE: (f32, f32) = (0.0, 2.0);
pub const DOT_SIZE_RANGE: (u32, u32) = (1, 50);

const DEFAULT_SKETCH_DETAILS: f32 = 10.0;
const DEFAULT_SKETCH_GAMMA: f32 = 1.0;
const DEFAULT_DOT_DENSITY: f32 = 0.3;
const DEFAULT_DOT_SIZE: u32 = 4;

fn clamp_or(value: f32, min: f32, max: f32, fallback: f32) -> f32 {
    if value.is_nan() {
        fallback
    } else {
        value.clamp(min, max)
    }
}

/// Full set of user-adjustable edit parameters for one image.
///
/// Fields are private so that every write goes through a clamping setter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditParams {
    brightness: f32,
    contrast: f32,
    exposure: f32,
    gamma: f32,
    sharpness: f32,
    gaussian_blur: f32,
    sketch_details: f32,
    sketch_gamma: f32,
    dot_density: f32,
    dot_size: u32,
    black_and_white: bool,
    remove_background: bool,
    dotwork_enabled: bool,
}

impl Default for EditParams {
    fn default() -> Self {
        Self {
            brightness: FilterKind::Brightness.default_value(),
            contrast: FilterKind::Contrast.default_value(),
            exposure: FilterKind::Exposure.default_value(),
            gamma: FilterKind::Gamma.default_value(),
            sharpness: FilterKind::Sharpness.default_value(),
            gaussian_blur: FilterKind::GaussianBlur.default_value(),
            sketch_details: DEFAULT_SKETCH_DETAILS,
            sketch_gamma: DEFAULT_SKETCH_GAMMA,
            dot_density: DEFAULT_DOT_DENSITY,
            dot_size: DEFAULT_DOT_SIZE,
            black_and_white: false,
            remove_background: false,
            dotwork_enabled: false,
        }
    }
}

impl EditParams {
    /// Parse a JSON preset, clamping every value into range.
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: EditParams = serde_json::from_str(json)?;
        Ok(raw.sanitized())
    }

    /// Re-apply every clamp. Used after deserialisation.
    pub fn sanitized(self) -> Self {
        let mut out = self.clone();
        for kind in FilterKind::ALL {
            out.set(kind, self.get(kind));
        }
        out.set_sketch_details(self.sketch_details);
        out.set_sketch_gamma(self.sketch_gamma);
        out.set_dot_density(self.dot_density);
        out.set_dot_size(self.dot_size);
        out
    }

    // -- Slider filters -------------------------------------------------------

    pub fn get(&self, kind: FilterKind) -> f32 {
        match kind {
            FilterKind::Brightness => self.brightness,
            FilterKind::Contrast => self.contrast,
            FilterKind::Exposure => self.exposure,
            FilterKind::Gamma => self.gamma,
            FilterKind::Sharpness => self.sharpness,
            FilterKind::GaussianBlur => self.gaussian_blur,
        }
    }

    pub fn set(&mut self, kind: FilterKind, value: f32) {
        let value = kind.clamp(value);
        match kind {
            FilterKind::Brightness => self.brightness = value,
            FilterKind::Contrast => self.contrast = value,
            FilterKind::Exposure => self.exposure = value,
            FilterKind::Gamma => self.gamma = value,
            FilterKind::Sharpness => self.sharpness = value,
            FilterKind::GaussianBlur => self.gaussian_blur = value,
        }
    }

    /// Builder form of [`EditParams::set`].
    pub fn with(mut self, kind: FilterKind, value: f32) -> Self {
        self.set(kind, value);
        self
    }

    /// True when `kind` is at its neutral value and its stage can be skipped.
    pub fn is_neutral(&self, kind: FilterKind) -> bool {
        self.get(kind) == kind.default_value()
    }

    pub fn brightness(&self) -> f32 {
        self.brightness
    }

    pub fn contrast(&self) -> f32 {
        self.contrast
    }

    pub fn exposure(&self) -> f32 {
        self.exposure
    }

    pub fn gamma(&self) -> f32 {
        self.gamma
    }

    pub fn sharpness(&self) -> f32 {
        self.sharpness
    }

    pub fn gaussian_blur(&self) -> f32 {
        self.gaussian_blur
    }

    // -- Sketch -----------------------------------------------------------------

    pub fn sketch_details(&self) -> f32 {
        self.sketch_details
    }

    pub fn set_sketch_details(&mut self, value: f32) {
        let (min, max) = SKETCH_DETAILS_RANGE;
        self.sketch_details = clamp_or(value, min, max, DEFAULT_SKETCH_DETAILS);
    }

    pub fn sketch_gamma(&self) -> f32 {
        self.sketch_gamma
    }

    pub fn set_sketch_gamma(&mut self, value: f32) {
        let (min, max) = SKETCH_GAMMA_RANGE;
        self.sketch_gamma = clamp_or(value, min, max, DEFAULT_SKETCH_GAMMA);
    }

    // -- Dotwork ----------------------------------------------------------------

    pub fn dot_density(&self) -> f32 {
        self.dot_density
    }

    pub fn set_dot_density(&mut self, value: f32) {
        let (min, max) = DOT_DENSITY_RANGE;
        self.dot_density = clamp_or(value, min, max, DEFAULT_DOT_DENSITY);
    }

    pub fn dot_size(&self) -> u32 {
        self.dot_size
    }

    pub fn set_dot_size(&mut self, value: u32) {
        let (min, max) = DOT_SIZE_RANGE;
        self.dot_size = value.clamp(min, max);
    }

    pub fn dotwork_enabled(&self) -> bool {
        self.dotwork_enabled
    }

    pub fn set_dotwork_enabled(&mut self, enabled: bool) {
        self.dotwork_enabled = enabled;
    }

    // -- Final stage toggles ----------------------------------------------------

    pub fn black_and_white(&self) -> bool {
        self.black_and_white
    }

    pub fn set_black_and_white(&mut self, enabled: bool) {
        self.black_and_white = enabled;
    }

    pub fn remove_background(&self) -> bool {
        self.remove_background
    }

    pub fn set_remove_background(&mut self, enabled: bool) {
        self.remove_background = enabled;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_neutral() {
        let params = EditParams::default();
        for kind in FilterKind::ALL {
            assert!(params.is_neutral(kind), "{kind:?} should start neutral");
        }
        assert_eq!(params.sketch_details(), 10.0);
        assert_eq!(params.dot_density(), 0.3);
        assert_eq!(params.dot_size(), 4);
    }

    #[test]
    fn out_of_range_values_are_clamped_not_rejected() {
        let mut params = EditParams::default();
        params.set(FilterKind::Brightness, 500.0);
        assert_eq!(params.brightness(), 100.0);
        params.set(FilterKind::Gamma, 0.0);
        assert_eq!(params.gamma(), 0.1);
        params.set_dot_size(0);
        assert_eq!(params.dot_size(), 1);
        params.set_dot_density(f32::NAN);
        assert_eq!(params.dot_density(), 0.3);
    }

    #[test]
    fn json_preset_is_sanitised() {
        let params =
            EditParams::from_json(r#"{"contrast": 9.0, "sharpness": -4.0, "dotwork_enabled": true}"#)
                .unwrap();
        assert_eq!(params.contrast(), 3.0);
        assert_eq!(params.sharpness(), 0.0);
        assert!(params.dotwork_enabled());
        // Missing fields take their defaults.
        assert_eq!(params.exposure(), 1.0);
    }
}
