// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pencil-sketch effect: colour-dodge a grayscale image against a blurred
// copy of its own negative, then apply a gamma curve.

use image::{GrayImage, Luma, RgbaImage};
use rayon::prelude::*;
use tracing::{debug, instrument};

use crate::adjust::gamma_lut;
use crate::convolve::{gaussian_blur_gray, luma};

/// Blur kernel size for a detail level: `max(1, round(details * 1.5))`
/// forced odd.
pub fn sketch_kernel_size(details: f32) -> usize {
    let base = (details * 1.5).round().max(1.0) as usize;
    ((base / 2) * 2 + 1).max(1)
}

/// Rec. 601 grayscale of an RGBA raster, rounded to 8 bits.
pub fn to_gray(image: &RgbaImage) -> GrayImage {
    let (w, h) = image.dimensions();
    let mut gray = GrayImage::new(w, h);
    gray.par_iter_mut()
        .zip(image.par_chunks_exact(4))
        .for_each(|(g, px)| *g = luma(px).round().clamp(0.0, 255.0) as u8);
    gray
}

/// Turn `image` into a pencil sketch.
///
/// gray -> invert -> Gaussian blur -> invert -> `gray * 255 / blurred`
/// (0 where the divisor is 0) -> gamma. The output is opaque grayscale RGBA.
#[instrument(skip(image), fields(width = image.width(), height = image.height()))]
pub fn sketch(image: &RgbaImage, details: f32, gamma: f32) -> RgbaImage {
    let k = sketch_kernel_size(details);
    debug!(kernel = k, gamma, "Rendering sketch");

    let gray = to_gray(image);
    let mut inverted = gray.clone();
    for v in inverted.iter_mut() {
        *v = 255 - *v;
    }
    let blurred = gaussian_blur_gray(&inverted, k);
    drop(inverted);

    let lut = gamma_lut(gamma);
    let (w, h) = image.dimensions();
    RgbaImage::from_fn(w, h, |x, y| {
        let Luma([g]) = *gray.get_pixel(x, y);
        let divisor = 255 - blurred.get_pixel(x, y).0[0];
        let dodged = if divisor == 0 {
            0
        } else {
            (g as f32 * 255.0 / divisor as f32).round().min(255.0) as u8
        };
        let v = lut[dodged as usize];
        image::Rgba([v, v, v, 255])
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn kernel_size_is_odd_and_grows_with_detail() {
        assert_eq!(sketch_kernel_size(0.0), 1);
        assert_eq!(sketch_kernel_size(1.0), 3);
        assert_eq!(sketch_kernel_size(10.0), 15);
        assert_eq!(sketch_kernel_size(50.0), 75);
    }

    #[test]
    fn flat_regions_dodge_to_white() {
        let img = RgbaImage::from_pixel(20, 20, Rgba([100, 100, 100, 255]));
        let out = sketch(&img, 10.0, 1.0);
        assert!(out.pixels().all(|p| *p == Rgba([255, 255, 255, 255])));
    }

    #[test]
    fn pure_black_stays_black() {
        let img = RgbaImage::from_pixel(8, 8, Rgba([0, 0, 0, 255]));
        let out = sketch(&img, 5.0, 1.0);
        assert!(out.pixels().all(|p| p[0] == 0));
    }

    #[test]
    fn dark_line_survives_as_a_stroke() {
        let img = RgbaImage::from_fn(31, 31, |x, _| {
            if x == 15 { Rgba([0, 0, 0, 255]) } else { Rgba([230, 230, 230, 255]) }
        });
        let out = sketch(&img, 4.0, 1.0);
        assert!(out.get_pixel(15, 15)[0] < 64, "stroke should be dark");
        assert_eq!(out.get_pixel(0, 15)[0], 255, "paper should be white");
        assert_eq!(out.dimensions(), img.dimensions());
    }
}
