// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Full-area canvas rendering.

use std::borrow::Cow;

use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};
use tracing::{debug, instrument};

use tsp_core::error::{Result, TspError};
use tsp_core::{PaperSize, PixelSize, PrintType};

use crate::geometry::PositioningInfo;

const PAPER_WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Canvas size for a layout. Each non-zero dimension of `canvas_override`
/// replaces the layout default.
pub fn canvas_size(
    print_type: PrintType,
    paper: PaperSize,
    dpi: u32,
    canvas_override: Option<PixelSize>,
) -> PixelSize {
    let layout = print_type.canvas_size(paper, dpi);
    match canvas_override {
        Some(o) => PixelSize::new(
            if o.width > 0 { o.width } else { layout.width },
            if o.height > 0 { o.height } else { layout.height },
        ),
        None => layout,
    }
}

/// Render `source` onto a white canvas the size of the whole layout.
///
/// With positioning, the visible source region is resampled (bilinear) into
/// the destination rectangle. Without it, the whole source is fitted and
/// centred. Transparent source pixels come out as paper white.
#[instrument(skip_all, fields(
    width = source.width(),
    height = source.height(),
    print_type = %print_type,
    dpi = dpi,
    positioned = positioning.is_some(),
))]
pub fn render_full_area(
    source: &RgbaImage,
    positioning: Option<&PositioningInfo>,
    print_type: PrintType,
    paper: PaperSize,
    dpi: u32,
    canvas_override: Option<PixelSize>,
) -> Result<RgbaImage> {
    let (sw, sh) = source.dimensions();
    if sw == 0 || sh == 0 {
        return Err(TspError::DegenerateGeometry("source image has no pixels".into()));
    }
    let size = canvas_size(print_type, paper, dpi, canvas_override);
    if size.is_empty() {
        return Err(TspError::DegenerateGeometry("print canvas has no pixels".into()));
    }

    let (region, x, y, w, h) = match positioning {
        Some(info) => {
            let src = info.source_rect;
            if src.is_empty() || src.right() > sw || src.bottom() > sh {
                return Err(TspError::DegenerateGeometry(format!(
                    "source rect {src:?} outside {sw}x{sh} image"
                )));
            }
            let d = info.destination_rect;
            let (left, top) = (d.left.round(), d.top.round());
            let w = (d.right.round() - left) as u32;
            let h = (d.bottom.round() - top) as u32;
            let region = imageops::crop_imm(source, src.x, src.y, src.width, src.height).to_image();
            (Cow::Owned(region), left as i64, top as i64, w, h)
        }
        None => {
            let scale = (size.width as f32 / sw as f32).min(size.height as f32 / sh as f32);
            let w = (sw as f32 * scale).round() as u32;
            let h = (sh as f32 * scale).round() as u32;
            let x = (size.width.saturating_sub(w) / 2) as i64;
            let y = (size.height.saturating_sub(h) / 2) as i64;
            (Cow::Borrowed(source), x, y, w, h)
        }
    };
    if w == 0 || h == 0 {
        return Err(TspError::DegenerateGeometry("destination region is under one pixel".into()));
    }

    let mut canvas = RgbaImage::from_pixel(size.width, size.height, PAPER_WHITE);
    {
        let placed = if region.dimensions() == (w, h) {
            region
        } else {
            Cow::Owned(imageops::resize(&*region, w, h, FilterType::Triangle))
        };
        imageops::overlay(&mut canvas, &*placed, x, y);
    }

    debug!(
        canvas_w = size.width,
        canvas_h = size.height,
        x,
        y,
        w,
        h,
        "Canvas rendered"
    );
    Ok(canvas)
}
