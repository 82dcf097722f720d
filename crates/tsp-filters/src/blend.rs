// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Layer blend modes. Colour channels are blended on [0, 1]; the result keeps
// the base layer's alpha.

use image::{Rgba, RgbaImage};
use rayon::prelude::*;
use tsp_core::error::{Result, TspError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendMode {
    /// The layer replaces the base (use opacity to mix).
    Normal,
    /// `1 - (1 - a)(1 - b)`: lightens, never darkens.
    Screen,
    /// Multiply in the shadows, screen in the highlights, per channel.
    Overlay,
    /// Posterise to 0 or 255: `a + b >= 255` on 8-bit values.
    HardMix,
}

impl BlendMode {
    fn apply(self, a: u8, b: u8) -> f32 {
        let (fa, fb) = (a as f32 / 255.0, b as f32 / 255.0);
        match self {
            Self::Normal => fb,
            Self::Screen => 1.0 - (1.0 - fa) * (1.0 - fb),
            Self::Overlay => {
                if fa < 0.5 {
                    2.0 * fa * fb
                } else {
                    1.0 - 2.0 * (1.0 - fa) * (1.0 - fb)
                }
            }
            Self::HardMix => {
                if a as u16 + b as u16 > 254 {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }
}

/// Blend `layer` over `base` with `mode`, then mix the result back into the
/// base by `opacity` (clamped to [0, 1]).
pub fn blend(base: &RgbaImage, layer: &RgbaImage, mode: BlendMode, opacity: f32) -> Result<RgbaImage> {
    if base.dimensions() != layer.dimensions() {
        return Err(TspError::DimensionMismatch {
            expected: base.dimensions(),
            actual: layer.dimensions(),
        });
    }
    let opacity = if opacity.is_nan() { 0.0 } else { opacity.clamp(0.0, 1.0) };

    let mut out = base.clone();
    out.par_chunks_exact_mut(4)
        .zip(layer.par_chunks_exact(4))
        .for_each(|(px, top)| {
            for c in 0..3 {
                let a = px[c] as f32 / 255.0;
                let blended = mode.apply(px[c], top[c]);
                let mixed = a * (1.0 - opacity) + blended * opacity;
                px[c] = (mixed * 255.0).round().clamp(0.0, 255.0) as u8;
            }
        });
    Ok(out)
}

/// Opaque raster of a single gray level, used as a flat blend plate.
pub fn flat_plate(width: u32, height: u32, level: u8) -> RgbaImage {
    RgbaImage::from_pixel(width, height, Rgba([level, level, level, 255]))
}
