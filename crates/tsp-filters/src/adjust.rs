// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Tonal adjustments. Each one is a per-channel function of the 8-bit input,
// so it is built once as a 256-entry lookup table and applied to R, G, B.
// Alpha is never touched.

use image::RgbaImage;
use rayon::prelude::*;
use tracing::{debug, instrument};

/// Scale applied to the brightness slider so that ±100 maps to ±127 levels.
pub const BRIGHTNESS_SCALE: f32 = 1.27;

/// Lowest gamma / contrast accepted before the formulas degenerate.
const MIN_FACTOR: f32 = 0.1;

/// 256-entry channel lookup table.
pub type Lut = [u8; 256];

fn build_lut(f: impl Fn(f32) -> f32) -> Lut {
    let mut lut = [0u8; 256];
    for (i, slot) in lut.iter_mut().enumerate() {
        *slot = f(i as f32).round().clamp(0.0, 255.0) as u8;
    }
    lut
}

/// Apply `lut` to the colour channels of every pixel.
pub fn apply_lut(image: &RgbaImage, lut: &Lut) -> RgbaImage {
    let mut out = image.clone();
    out.par_chunks_exact_mut(4).for_each(|px| {
        px[0] = lut[px[0] as usize];
        px[1] = lut[px[1] as usize];
        px[2] = lut[px[2] as usize];
    });
    out
}

/// Add `brightness * 1.27` to each colour channel, saturating at 0 and 255.
#[instrument(skip(image), fields(width = image.width(), height = image.height()))]
pub fn brightness(image: &RgbaImage, brightness: f32) -> RgbaImage {
    let delta = brightness * BRIGHTNESS_SCALE;
    debug!(delta, "Adjusting brightness");
    apply_lut(image, &build_lut(|v| v + delta))
}

/// Multiply each colour channel by `gain` (1.0 is neutral).
#[instrument(skip(image), fields(width = image.width(), height = image.height()))]
pub fn exposure(image: &RgbaImage, gain: f32) -> RgbaImage {
    let gain = gain.max(0.0);
    apply_lut(image, &build_lut(|v| v * gain))
}

/// Scale each colour channel around mid-gray: `c * v + (1 - c) * 128`.
///
/// `contrast` is floor-clamped to 0.1.
#[instrument(skip(image), fields(width = image.width(), height = image.height()))]
pub fn contrast(image: &RgbaImage, contrast: f32) -> RgbaImage {
    let c = contrast.max(MIN_FACTOR);
    apply_lut(image, &build_lut(|v| c * v + (1.0 - c) * 128.0))
}

/// Gamma lookup table: `lut[i] = round(255 * (i / 255) ^ (1 / gamma))`.
///
/// `gamma` is floor-clamped to 0.1. The table is monotonically non-decreasing.
pub fn gamma_lut(gamma: f32) -> Lut {
    let inv = 1.0 / gamma.max(MIN_FACTOR);
    build_lut(|v| 255.0 * (v / 255.0).powf(inv))
}

/// Apply gamma correction to the colour channels.
#[instrument(skip(image), fields(width = image.width(), height = image.height()))]
pub fn gamma(image: &RgbaImage, gamma: f32) -> RgbaImage {
    apply_lut(image, &gamma_lut(gamma))
}
