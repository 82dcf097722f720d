// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Probabilistic stippling: dark regions collect more dots than light ones.

use image::{Rgba, RgbaImage};
use imageproc::drawing::draw_filled_circle_mut;
use tracing::{debug, instrument};

use crate::sketch::to_gray;

const INK: Rgba<u8> = Rgba([0, 0, 0, 255]);
const PAPER: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Seed used when the caller does not care about reproducibility.
pub const DEFAULT_SEED: u64 = 0x5EED_D075;

/// Small deterministic generator (SplitMix64). A given seed always yields
/// the same sequence, so a stipple pattern is reproducible.
#[derive(Debug, Clone)]
pub struct StippleRng {
    state: u64,
}

impl StippleRng {
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    pub fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }

    /// Uniform draw in [0, 1).
    pub fn next_f32(&mut self) -> f32 {
        // Top 24 bits fill an f32 mantissa exactly.
        (self.next_u64() >> 40) as f32 / (1u64 << 24) as f32
    }
}

/// Stipple `image` onto white paper.
///
/// The image is walked in `dot_size` cells. Each cell samples the gray level
/// at its top-left pixel and draws one black dot of radius
/// `max(1, round(dot_size / 2))` at its centre with probability
/// `clamp((1 - intensity) * density, 0, 1)`.
#[instrument(skip(image), fields(width = image.width(), height = image.height()))]
pub fn stipple(image: &RgbaImage, density: f32, dot_size: u32, seed: u64) -> RgbaImage {
    let (w, h) = image.dimensions();
    let step = dot_size.max(1);
    let radius = ((step as f32 / 2.0).round() as i32).max(1);
    let gray = to_gray(image);
    let mut canvas = RgbaImage::from_pixel(w, h, PAPER);
    let mut rng = StippleRng::new(seed);
    let mut dots = 0usize;

    for y in (0..h).step_by(step as usize) {
        for x in (0..w).step_by(step as usize) {
            let intensity = gray.get_pixel(x, y).0[0] as f32 / 255.0;
            let probability = ((1.0 - intensity) * density).clamp(0.0, 1.0);
            if rng.next_f32() < probability {
                let centre = ((x + step / 2) as i32, (y + step / 2) as i32);
                draw_filled_circle_mut(&mut canvas, centre, radius, INK);
                dots += 1;
            }
        }
    }

    debug!(dots, radius, "Stipple complete");
    canvas
}
