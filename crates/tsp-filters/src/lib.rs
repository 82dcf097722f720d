// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// tsp-filters: Pixel transforms for the TSP editor.
//
// Provides tonal adjustments (brightness, exposure, contrast, gamma),
// convolution filters (Gaussian blur, unsharp mask), the pencil-sketch
// effect, stippling, blend modes, the multi-layer dotwork composite,
// segmentation-based background removal, and raster utilities (decode,
// encode, flip, black & white, preview downscale).
//
// Every filter takes an RGBA raster and returns a new raster of identical
// dimensions.

pub mod adjust;
pub mod blend;
pub mod convolve;
pub mod dotwork;
pub mod fail_soft;
pub mod raster;
pub mod segmentation;
pub mod sketch;
pub mod stipple;

pub use dotwork::{TextureSet, dotwork};
pub use fail_soft::fail_soft;
pub use segmentation::remove_background;
