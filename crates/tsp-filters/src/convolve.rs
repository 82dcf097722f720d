// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Convolution filters: separable Gaussian blur and unsharp-mask sharpening.

use image::{GrayImage, RgbaImage};
use rayon::prelude::*;
use tracing::{debug, instrument};

/// Luma above which a pixel counts as paper-white background when sharpening.
const BACKGROUND_LUMA: f32 = 240.0;

/// Sharpen amount per unit of the sharpness slider.
pub const SHARPEN_GAIN: f32 = 1.5;

/// Odd kernel size for a blur radius: `floor(radius) | 1`, never below 1.
pub fn kernel_size_for_radius(radius: f32) -> usize {
    let r = if radius.is_finite() { radius.max(1.0) as usize } else { 1 };
    (r / 2) * 2 + 1
}

/// Standard deviation for a kernel of size `k`, matching the usual
/// "sigma from aperture" rule: `0.3 * ((k - 1) / 2 - 1) + 0.8`.
pub fn sigma_for_kernel(k: usize) -> f32 {
    0.3 * ((k as f32 - 1.0) * 0.5 - 1.0) + 0.8
}

/// Normalised 1-D Gaussian kernel of odd length `k`.
pub fn gaussian_kernel(k: usize) -> Vec<f32> {
    let k = k.max(1) | 1;
    let sigma = sigma_for_kernel(k);
    let half = (k / 2) as f32;
    let mut kernel: Vec<f32> = (0..k)
        .map(|i| {
            let x = i as f32 - half;
            (-x * x / (2.0 * sigma * sigma)).exp()
        })
        .collect();
    let sum: f32 = kernel.iter().sum();
    for v in kernel.iter_mut() {
        *v /= sum;
    }
    kernel
}

/// Blur all four channels with a `k`-tap Gaussian. Edges replicate the
/// border pixel. `k == 1` returns a copy.
pub fn gaussian_blur_sized(image: &RgbaImage, k: usize) -> RgbaImage {
    let (width, height) = image.dimensions();
    if k <= 1 || width == 0 || height == 0 {
        return image.clone();
    }
    let data = blur_interleaved(image.as_raw(), width as usize, height as usize, 4, k);
    RgbaImage::from_raw(width, height, data).unwrap_or_else(|| image.clone())
}

/// Single-channel variant of [`gaussian_blur_sized`].
pub fn gaussian_blur_gray(image: &GrayImage, k: usize) -> GrayImage {
    let (width, height) = image.dimensions();
    if k <= 1 || width == 0 || height == 0 {
        return image.clone();
    }
    let data = blur_interleaved(image.as_raw(), width as usize, height as usize, 1, k);
    GrayImage::from_raw(width, height, data).unwrap_or_else(|| image.clone())
}

/// Separable Gaussian over an interleaved 8-bit buffer, via an f32 work
/// buffer. Rows are processed in parallel.
fn blur_interleaved(src: &[u8], w: usize, h: usize, channels: usize, k: usize) -> Vec<u8> {
    let kernel = gaussian_kernel(k);
    let half = (kernel.len() / 2) as i64;
    let stride = w * channels;

    // Horizontal pass.
    let mut temp = vec![0f32; stride * h];
    temp.par_chunks_mut(stride).enumerate().for_each(|(y, row)| {
        let src_row = &src[y * stride..(y + 1) * stride];
        for x in 0..w {
            for c in 0..channels {
                let mut sum = 0.0f32;
                for (ki, &kv) in kernel.iter().enumerate() {
                    let sx = (x as i64 + ki as i64 - half).clamp(0, w as i64 - 1) as usize;
                    sum += src_row[sx * channels + c] as f32 * kv;
                }
                row[x * channels + c] = sum;
            }
        }
    });

    // Vertical pass back to 8-bit.
    let mut out = vec![0u8; stride * h];
    out.par_chunks_mut(stride).enumerate().for_each(|(y, row)| {
        for (i, slot) in row.iter_mut().enumerate() {
            let mut sum = 0.0f32;
            for (ki, &kv) in kernel.iter().enumerate() {
                let sy = (y as i64 + ki as i64 - half).clamp(0, h as i64 - 1) as usize;
                sum += temp[sy * stride + i] * kv;
            }
            *slot = sum.round().clamp(0.0, 255.0) as u8;
        }
    });
    out
}

/// Gaussian blur with kernel size derived from `radius` (see
/// [`kernel_size_for_radius`]).
#[instrument(skip(image), fields(width = image.width(), height = image.height()))]
pub fn gaussian_blur(image: &RgbaImage, radius: f32) -> RgbaImage {
    let k = kernel_size_for_radius(radius);
    debug!(kernel = k, "Applying Gaussian blur");
    gaussian_blur_sized(image, k)
}

/// Unsharp mask: `src * (1 + a) - blur3x3(src) * a` with `a = 1.5 * sharpness`.
///
/// With `preserve_background`, pixels whose source luma is above 240 are
/// copied through unchanged so paper-white areas do not pick up halos.
#[instrument(skip(image), fields(width = image.width(), height = image.height()))]
pub fn sharpen(image: &RgbaImage, sharpness: f32, preserve_background: bool) -> RgbaImage {
    let amount = SHARPEN_GAIN * sharpness.max(0.0);
    if amount == 0.0 {
        return image.clone();
    }
    let blurred = gaussian_blur_sized(image, 3);

    let mut out = image.clone();
    out.par_chunks_exact_mut(4)
        .zip(blurred.par_chunks_exact(4))
        .for_each(|(px, blur)| {
            if preserve_background && luma(px) > BACKGROUND_LUMA {
                return;
            }
            for c in 0..3 {
                let v = px[c] as f32 * (1.0 + amount) - blur[c] as f32 * amount;
                px[c] = v.round().clamp(0.0, 255.0) as u8;
            }
        });
    out
}

/// Rec. 601 luma of an RGBA pixel slice.
pub(crate) fn luma(px: &[u8]) -> f32 {
    0.299 * px[0] as f32 + 0.587 * px[1] as f32 + 0.114 * px[2] as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn kernel_size_is_odd_floor_of_radius() {
        assert_eq!(kernel_size_for_radius(1.0), 1);
        assert_eq!(kernel_size_for_radius(2.0), 3);
        assert_eq!(kernel_size_for_radius(3.9), 3);
        assert_eq!(kernel_size_for_radius(4.0), 5);
        assert_eq!(kernel_size_for_radius(25.0), 25);
        assert_eq!(kernel_size_for_radius(0.0), 1);
    }

    #[test]
    fn kernel_is_normalised_and_symmetric() {
        let k = gaussian_kernel(7);
        assert_eq!(k.len(), 7);
        assert!((k.iter().sum::<f32>() - 1.0).abs() < 1e-5);
        assert!((k[0] - k[6]).abs() < 1e-7);
        assert!(k[3] > k[2]);
    }

    #[test]
    fn blur_radius_one_is_identity() {
        let img = RgbaImage::from_fn(9, 5, |x, y| Rgba([(x * 20) as u8, (y * 40) as u8, 7, 255]));
        assert_eq!(gaussian_blur(&img, 1.0), img);
    }

    #[test]
    fn blur_keeps_flat_regions_flat() {
        let img = RgbaImage::from_pixel(12, 12, Rgba([128, 128, 128, 255]));
        assert_eq!(gaussian_blur(&img, 9.0), img);
    }

    #[test]
    fn blur_softens_an_edge() {
        let img = RgbaImage::from_fn(10, 1, |x, _| {
            if x < 5 { Rgba([0, 0, 0, 255]) } else { Rgba([255, 255, 255, 255]) }
        });
        let out = gaussian_blur(&img, 5.0);
        let left = out.get_pixel(4, 0)[0];
        let right = out.get_pixel(5, 0)[0];
        assert!(left > 0 && left < 128, "left edge {left}");
        assert!(right > 128 && right < 255, "right edge {right}");
    }

    #[test]
    fn sharpen_zero_is_identity() {
        let img = RgbaImage::from_fn(6, 6, |x, y| Rgba([(x * 30) as u8, (y * 30) as u8, 90, 255]));
        assert_eq!(sharpen(&img, 0.0, false), img);
    }

    #[test]
    fn sharpen_increases_edge_contrast() {
        let img = RgbaImage::from_fn(10, 1, |x, _| {
            if x < 5 { Rgba([60, 60, 60, 255]) } else { Rgba([180, 180, 180, 255]) }
        });
        let out = sharpen(&img, 2.0, false);
        assert!(out.get_pixel(4, 0)[0] < 60);
        assert!(out.get_pixel(5, 0)[0] > 180);
        // Flat interior is unchanged.
        assert_eq!(out.get_pixel(0, 0)[0], 60);
    }

    #[test]
    fn sharpen_preserves_white_background() {
        let img = RgbaImage::from_fn(10, 1, |x, _| {
            if x < 5 { Rgba([0, 0, 0, 255]) } else { Rgba([250, 250, 250, 255]) }
        });
        let kept = sharpen(&img, 3.0, true);
        assert_eq!(*kept.get_pixel(5, 0), Rgba([250, 250, 250, 255]));
        let unkept = sharpen(&img, 3.0, false);
        assert_eq!(unkept.get_pixel(5, 0)[0], 255);
    }
}
