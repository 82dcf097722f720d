// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Dotwork composite: a stipple layer roughened by a grain texture and then
// posterised, giving a hand-poked tattoo look.
//
// Layer stack, in order:
//   1. stipple the source onto white paper
//   2. screen with grain
//   3. normal with grain at 55% opacity
//   4. Gaussian blur, 3-tap
//   5. hard-mix with a flat mid-gray plate
//   6. Gaussian blur, 3-tap
//   7. overlay with a flat black plate
//   8. overlay with a flat black plate again
//
// Every intermediate buffer is dropped as soon as the next layer exists.

use std::path::Path;
use std::sync::Arc;

use image::RgbaImage;
use image::imageops::{self, FilterType};
use tracing::{debug, info, instrument, warn};
use tsp_core::error::{Result, TspError};

use crate::blend::{BlendMode, blend, flat_plate};
use crate::convolve::gaussian_blur_sized;
use crate::stipple::{StippleRng, stipple};

/// Opacity of the normal-mode grain pass.
const GRAIN_NORMAL_OPACITY: f32 = 0.55;
/// Gray level of the hard-mix plate.
const HARD_MIX_LEVEL: u8 = 128;
/// Side length of the procedural grain tile.
const PROCEDURAL_GRAIN_SIZE: u32 = 512;
/// Procedural grain levels lie in [GRAIN_MIN, GRAIN_MIN + GRAIN_SPAN).
const GRAIN_MIN: f32 = 32.0;
const GRAIN_SPAN: f32 = 88.0;

/// Immutable textures used by the dotwork composite. Built once per session
/// and shared between workers.
#[derive(Debug, Clone)]
pub struct TextureSet {
    grain: Arc<RgbaImage>,
}

impl TextureSet {
    pub fn new(grain: RgbaImage) -> Self {
        Self {
            grain: Arc::new(grain),
        }
    }

    /// Deterministic value-noise grain, used when no texture file is configured.
    pub fn procedural(seed: u64) -> Self {
        let mut rng = StippleRng::new(seed);
        let grain = RgbaImage::from_fn(PROCEDURAL_GRAIN_SIZE, PROCEDURAL_GRAIN_SIZE, |_, _| {
            let v = (GRAIN_MIN + rng.next_f32() * GRAIN_SPAN) as u8;
            image::Rgba([v, v, v, 255])
        });
        Self::new(grain)
    }

    /// Load a grain texture from disk.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let grain = image::open(path.as_ref())
            .map_err(|err| {
                TspError::ImageError(format!(
                    "failed to open grain texture {}: {}",
                    path.as_ref().display(),
                    err
                ))
            })?
            .to_rgba8();
        info!(width = grain.width(), height = grain.height(), "Grain texture loaded");
        Ok(Self::new(grain))
    }

    /// Load `path` if given, falling back to procedural grain when it is
    /// unset or unreadable.
    pub fn from_optional_path(path: Option<&Path>) -> Self {
        match path.map(Self::load) {
            Some(Ok(set)) => set,
            Some(Err(err)) => {
                warn!(error = %err, "Grain texture unavailable; using procedural grain");
                Self::procedural(crate::stipple::DEFAULT_SEED)
            }
            None => Self::procedural(crate::stipple::DEFAULT_SEED),
        }
    }

    pub fn grain(&self) -> &RgbaImage {
        &self.grain
    }

    /// Grain resized to `width` x `height`, borrowing when it already fits.
    fn grain_for(&self, width: u32, height: u32) -> std::borrow::Cow<'_, RgbaImage> {
        if self.grain.dimensions() == (width, height) {
            std::borrow::Cow::Borrowed(self.grain.as_ref())
        } else {
            std::borrow::Cow::Owned(imageops::resize(
                self.grain.as_ref(),
                width,
                height,
                FilterType::Triangle,
            ))
        }
    }
}

impl Default for TextureSet {
    fn default() -> Self {
        Self::procedural(crate::stipple::DEFAULT_SEED)
    }
}

/// Run the dotwork layer stack over `image`.
#[instrument(skip(image, textures), fields(width = image.width(), height = image.height()))]
pub fn dotwork(
    image: &RgbaImage,
    density: f32,
    dot_size: u32,
    textures: &TextureSet,
    seed: u64,
) -> Result<RgbaImage> {
    let (w, h) = image.dimensions();
    let grain = textures.grain_for(w, h);

    let layer = {
        let dots = stipple(image, density, dot_size, seed);
        let screened = blend(&dots, &grain, BlendMode::Screen, 1.0)?;
        drop(dots);
        blend(&screened, &grain, BlendMode::Normal, GRAIN_NORMAL_OPACITY)?
    };
    drop(grain);
    debug!("Grain applied");

    let layer = {
        let softened = gaussian_blur_sized(&layer, 3);
        drop(layer);
        let plate = flat_plate(w, h, HARD_MIX_LEVEL);
        blend(&softened, &plate, BlendMode::HardMix, 1.0)?
    };
    debug!("Posterised");

    let softened = gaussian_blur_sized(&layer, 3);
    drop(layer);
    let black = flat_plate(w, h, 0);
    let once = blend(&softened, &black, BlendMode::Overlay, 1.0)?;
    drop(softened);
    blend(&once, &black, BlendMode::Overlay, 1.0)
}
