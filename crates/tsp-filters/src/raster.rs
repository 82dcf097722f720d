// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Raster utilities: decode, encode, flip, crop, black & white, and preview
// downscaling. Operates on in-memory RGBA rasters using the `image` crate.

use std::path::Path;

use image::imageops::{self, FilterType};
use image::{ImageFormat, RgbaImage};
use rayon::prelude::*;
use tracing::{debug, info, instrument};
use tsp_core::IntRect;
use tsp_core::error::{Result, TspError};

/// Luminance weights used for black & white conversion.
const BW_WEIGHTS: [f32; 3] = [0.213, 0.715, 0.072];

// -- Decode / encode ----------------------------------------------------------

/// Decode raw encoded bytes (JPEG, PNG, etc.) into RGBA.
#[instrument(skip(data), fields(data_len = data.len()))]
pub fn decode(data: &[u8]) -> Result<RgbaImage> {
    let img = image::load_from_memory(data)
        .map_err(|err| TspError::ImageError(format!("failed to decode image: {}", err)))?;
    debug!(width = img.width(), height = img.height(), "Image decoded from bytes");
    Ok(img.to_rgba8())
}

/// Load an image file into RGBA.
#[instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn open(path: impl AsRef<Path>) -> Result<RgbaImage> {
    let img = image::open(path.as_ref()).map_err(|err| match err {
        image::ImageError::IoError(io) => TspError::Io(io),
        other => TspError::ImageError(format!(
            "failed to open {}: {}",
            path.as_ref().display(),
            other
        )),
    })?;
    info!(width = img.width(), height = img.height(), "Image loaded");
    Ok(img.to_rgba8())
}

/// Encode as PNG bytes.
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    image
        .write_to(&mut std::io::Cursor::new(&mut buffer), ImageFormat::Png)
        .map_err(|err| TspError::ImageError(format!("PNG encoding failed: {}", err)))?;
    Ok(buffer)
}

/// Encode as JPEG bytes with the given quality (1-100). Alpha is dropped.
pub fn encode_jpeg(image: &RgbaImage, quality: u8) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    let rgb = image::DynamicImage::ImageRgba8(image.clone()).to_rgb8();
    let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100));
    rgb.write_with_encoder(encoder)
        .map_err(|err| TspError::ImageError(format!("JPEG encoding failed: {}", err)))?;
    Ok(buffer)
}

/// Write the image to a file. The format is inferred from the file extension.
pub fn save(image: &RgbaImage, path: impl AsRef<Path>) -> Result<()> {
    image.save(path.as_ref()).map_err(|err| {
        TspError::ImageError(format!(
            "failed to save image to {}: {}",
            path.as_ref().display(),
            err
        ))
    })
}

// -- Geometry -----------------------------------------------------------------

pub fn flip_horizontal(image: &RgbaImage) -> RgbaImage {
    imageops::flip_horizontal(image)
}

pub fn flip_vertical(image: &RgbaImage) -> RgbaImage {
    imageops::flip_vertical(image)
}

/// Crop to `rect`, clamped to the image bounds. Returns `None` when nothing
/// of the rectangle lies inside the image.
#[instrument(skip(image), fields(width = image.width(), height = image.height()))]
pub fn crop(image: &RgbaImage, rect: IntRect) -> Option<RgbaImage> {
    let (w, h) = image.dimensions();
    let x = rect.x.min(w);
    let y = rect.y.min(h);
    let cw = rect.width.min(w - x);
    let ch = rect.height.min(h - y);
    if cw == 0 || ch == 0 {
        return None;
    }
    Some(imageops::crop_imm(image, x, y, cw, ch).to_image())
}

/// Downscale so the longest edge is at most `max_dimension`, preserving
/// aspect ratio. Never upscales.
#[instrument(skip(image), fields(width = image.width(), height = image.height()))]
pub fn downscale_to_fit(image: &RgbaImage, max_dimension: u32) -> RgbaImage {
    let (w, h) = image.dimensions();
    let longest = w.max(h);
    if max_dimension == 0 || longest <= max_dimension {
        return image.clone();
    }
    let scale = max_dimension as f64 / longest as f64;
    let nw = ((w as f64 * scale).round() as u32).max(1);
    let nh = ((h as f64 * scale).round() as u32).max(1);
    debug!(nw, nh, "Downscaling preview");
    imageops::resize(image, nw, nh, FilterType::Triangle)
}

// -- Colour -------------------------------------------------------------------

/// Fully desaturate, keeping alpha.
#[instrument(skip(image), fields(width = image.width(), height = image.height()))]
pub fn black_and_white(image: &RgbaImage) -> RgbaImage {
    let mut out = image.clone();
    out.par_chunks_exact_mut(4).for_each(|px| {
        let y = BW_WEIGHTS[0] * px[0] as f32 + BW_WEIGHTS[1] * px[1] as f32 + BW_WEIGHTS[2] * px[2] as f32;
        let v = y.round().clamp(0.0, 255.0) as u8;
        px[0] = v;
        px[1] = v;
        px[2] = v;
    });
    out
}
