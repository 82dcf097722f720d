// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Segmentation-based background removal.

use image::{Rgba, RgbaImage};
use rayon::prelude::*;
use tracing::{debug, instrument, warn};
use tsp_bridge::SegmentationAdapter;
use tsp_core::error::Result;

const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// Keep pixels whose foreground confidence exceeds `threshold`; make the
/// rest fully transparent.
///
/// The segmentation session is opened and closed inside this call, so it is
/// released on every exit path. A mask whose size differs from the source
/// is treated as unusable and the source is returned unchanged.
#[instrument(skip(image, segmenter), fields(width = image.width(), height = image.height()))]
pub fn remove_background(
    image: &RgbaImage,
    segmenter: &dyn SegmentationAdapter,
    threshold: f32,
) -> Result<RgbaImage> {
    let mask = {
        let mut session = segmenter.open()?;
        session.segment(image)?
    };

    if (mask.width, mask.height) != image.dimensions() {
        warn!(
            mask_w = mask.width,
            mask_h = mask.height,
            "Segmentation mask size mismatch; keeping source"
        );
        return Ok(image.clone());
    }

    let mut out = image.clone();
    out.par_chunks_exact_mut(4)
        .zip(mask.confidence.par_iter())
        .for_each(|(px, &confidence)| {
            if confidence <= threshold {
                px.copy_from_slice(&TRANSPARENT.0);
            }
        });
    debug!(threshold, "Background removed");
    Ok(out)
}
