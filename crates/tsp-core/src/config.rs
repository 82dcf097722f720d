// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Application configuration.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Persistent application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Longest edge of the preview raster. Previews are only ever downscaled.
    pub preview_max_dimension: u32,
    /// Quiet period before a burst of parameter changes triggers a recompute.
    pub debounce_ms: u64,
    /// Reference resolution for print canvases.
    pub print_dpi: u32,
    /// Sheet size each printed page is sliced to.
    pub paper_size: crate::PaperSize,
    /// Length of each crop-mark segment, in canvas pixels.
    pub crop_mark_length_px: u32,
    /// Stroke width of each crop-mark segment, in canvas pixels.
    pub crop_mark_thickness_px: u32,
    /// Copy near-white source pixels back after sharpening.
    pub sharpen_preserve_background: bool,
    /// Confidence above which a segmented pixel counts as foreground.
    pub segmentation_threshold: f32,
    /// Grain texture for the dotwork composite. A procedural grain is used when unset.
    pub grain_texture: Option<PathBuf>,
    /// Prefix for spooled print job names.
    pub job_name_prefix: String,
}

impl AppConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            preview_max_dimension: 1440,
            debounce_ms: 250,
            print_dpi: 300,
            paper_size: crate::PaperSize::A4,
            crop_mark_length_px: 75,
            crop_mark_thickness_px: 5,
            sharpen_preserve_background: true,
            segmentation_threshold: 0.5,
            grain_texture: None,
            job_name_prefix: "TSP".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_fills_defaults() {
        let config: AppConfig = serde_json::from_str(r#"{"print_dpi": 150}"#).unwrap();
        assert_eq!(config.print_dpi, 150);
        assert_eq!(config.crop_mark_length_px, 75);
        assert_eq!(config.debounce(), Duration::from_millis(250));
    }
}
