// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page slicer.
//
// Cuts a full-area canvas into the sheet grid of its print type and draws
// crop marks on each sheet. Leftover rows go to the last row of sheets and
// leftover columns to the last column, so the sheets always tile the canvas
// exactly.

use image::imageops;
use image::{Rgba, RgbaImage};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;
use rayon::prelude::*;
use tracing::{debug, instrument, warn};

use tsp_core::{AppConfig, IntRect, PrintType};

const MARK_INK: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// Crop-mark stroke geometry, in canvas pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropMarkStyle {
    pub length: u32,
    pub thickness: u32,
}

impl Default for CropMarkStyle {
    fn default() -> Self {
        Self {
            length: 75,
            thickness: 5,
        }
    }
}

impl From<&AppConfig> for CropMarkStyle {
    fn from(config: &AppConfig) -> Self {
        Self {
            length: config.crop_mark_length_px,
            thickness: config.crop_mark_thickness_px,
        }
    }
}

/// One physical sheet, ready for the print adapter.
#[derive(Debug, Clone)]
pub struct PrintablePage {
    /// Position in print order, row-major.
    pub index: usize,
    /// Where this sheet was cut from on the canvas.
    pub region: IntRect,
    /// Sheet raster with crop marks drawn in.
    pub raster: RgbaImage,
    /// The crop-mark segments drawn on `raster`, in sheet coordinates.
    pub crop_marks: Vec<IntRect>,
}

/// The eight L-shaped crop-mark segments for a `width` x `height` sheet: one
/// horizontal and one vertical stroke per corner, kept inside the sheet.
pub fn crop_marks(width: u32, height: u32, style: CropMarkStyle) -> Vec<IntRect> {
    if width == 0 || height == 0 {
        return Vec::new();
    }
    let len = style.length.min(width).min(height).max(1);
    let t = style.thickness.min(len).max(1);
    let (right, bottom) = (width - len, height - len);
    let (right_t, bottom_t) = (width - t, height - t);
    vec![
        // top-left
        IntRect::new(0, 0, len, t),
        IntRect::new(0, 0, t, len),
        // top-right
        IntRect::new(right, 0, len, t),
        IntRect::new(right_t, 0, t, len),
        // bottom-left
        IntRect::new(0, bottom_t, len, t),
        IntRect::new(0, bottom, t, len),
        // bottom-right
        IntRect::new(right, bottom_t, len, t),
        IntRect::new(right_t, bottom, t, len),
    ]
}

fn draw_marks(raster: &mut RgbaImage, marks: &[IntRect]) {
    for m in marks {
        draw_filled_rect_mut(
            raster,
            Rect::at(m.x as i32, m.y as i32).of_size(m.width, m.height),
            MARK_INK,
        );
    }
}

/// Split `extent` into `parts` spans; the last span absorbs the remainder.
fn spans(extent: u32, parts: u32) -> Vec<(u32, u32)> {
    let base = extent / parts;
    let rem = extent % parts;
    (0..parts)
        .map(|i| {
            let len = if i == parts - 1 { base + rem } else { base };
            (i * base, len)
        })
        .collect()
}

/// Cell rectangles for `print_type` over a `width` x `height` canvas, in
/// print order. Empty when any cell would have no pixels.
pub fn page_regions(width: u32, height: u32, print_type: PrintType) -> Vec<IntRect> {
    let (cols, rows) = print_type.grid();
    if width < cols || height < rows {
        return Vec::new();
    }
    let columns = spans(width, cols);
    spans(height, rows)
        .into_iter()
        .flat_map(|(y, h)| columns.iter().map(move |&(x, w)| IntRect::new(x, y, w, h)))
        .collect()
}

/// Cut `canvas` into crop-marked sheets.
///
/// Returns exactly `print_type.page_count()` pages, or an empty `Vec` when
/// the canvas is too small to give every sheet at least one pixel. Callers
/// treat the empty case as a failure.
#[instrument(skip(canvas), fields(width = canvas.width(), height = canvas.height()))]
pub fn slice(canvas: &RgbaImage, print_type: PrintType, style: CropMarkStyle) -> Vec<PrintablePage> {
    let regions = page_regions(canvas.width(), canvas.height(), print_type);
    if regions.is_empty() {
        warn!("Canvas too small to slice");
        return Vec::new();
    }

    let pages: Vec<PrintablePage> = regions
        .into_par_iter()
        .enumerate()
        .map(|(index, region)| {
            let mut raster =
                imageops::crop_imm(canvas, region.x, region.y, region.width, region.height).to_image();
            let marks = crop_marks(region.width, region.height, style);
            draw_marks(&mut raster, &marks);
            PrintablePage {
                index,
                region,
                raster,
                crop_marks: marks,
            }
        })
        .collect();

    debug!(pages = pages.len(), "Canvas sliced");
    pages
}

#[cfg(test)]
mod tests {
    use super::*;

    fn white(w: u32, h: u32) -> RgbaImage {
        RgbaImage::from_pixel(w, h, Rgba([255, 255, 255, 255]))
    }

    #[test]
    fn page_counts_match_layouts() {
        let canvas = white(30, 45);
        assert_eq!(slice(&canvas, PrintType::Single, CropMarkStyle::default()).len(), 1);
        assert_eq!(slice(&canvas, PrintType::Sleeve, CropMarkStyle::default()).len(), 3);
        assert_eq!(slice(&canvas, PrintType::Back, CropMarkStyle::default()).len(), 9);
    }

    #[test]
    fn sleeve_remainder_goes_to_last_sheet() {
        let pages = slice(&white(10, 11), PrintType::Sleeve, CropMarkStyle::default());
        let heights: Vec<u32> = pages.iter().map(|p| p.raster.height()).collect();
        assert_eq!(heights, vec![3, 3, 5]);
        assert!(pages.iter().all(|p| p.raster.width() == 10));
        assert_eq!(heights.iter().sum::<u32>(), 11);
    }

    #[test]
    fn back_grid_tiles_the_canvas() {
        let pages = slice(&white(20, 17), PrintType::Back, CropMarkStyle::default());
        let widths: Vec<u32> = pages[..3].iter().map(|p| p.raster.width()).collect();
        let heights: Vec<u32> = pages.iter().step_by(3).map(|p| p.raster.height()).collect();
        assert_eq!(widths, vec![6, 6, 8]);
        assert_eq!(heights, vec![5, 5, 7]);
        let area: u32 = pages.iter().map(|p| p.raster.width() * p.raster.height()).sum();
        assert_eq!(area, 20 * 17);
        assert_eq!(pages[4].region, IntRect::new(6, 5, 6, 5));
        assert!(pages.iter().enumerate().all(|(i, p)| p.index == i));
    }

    #[test]
    fn empty_or_tiny_canvas_gives_no_pages() {
        assert!(slice(&RgbaImage::new(0, 10), PrintType::Single, CropMarkStyle::default()).is_empty());
        assert!(slice(&white(10, 2), PrintType::Sleeve, CropMarkStyle::default()).is_empty());
        assert!(slice(&white(2, 9), PrintType::Back, CropMarkStyle::default()).is_empty());
    }

    #[test]
    fn every_sheet_gets_eight_marks_in_its_corners() {
        let style = CropMarkStyle {
            length: 10,
            thickness: 2,
        };
        let pages = slice(&white(60, 90), PrintType::Sleeve, style);
        for page in &pages {
            assert_eq!(page.crop_marks.len(), 8);
            let (w, h) = page.raster.dimensions();
            for (x, y) in [(0, 0), (w - 1, 0), (0, h - 1), (w - 1, h - 1)] {
                assert_eq!(page.raster.get_pixel(x, y).0, [0, 0, 0, 255]);
            }
            // End of a stroke, and a point just past it.
            assert_eq!(page.raster.get_pixel(9, 0).0, [0, 0, 0, 255]);
            assert_eq!(page.raster.get_pixel(10, 0).0, [255, 255, 255, 255]);
            assert_eq!(page.raster.get_pixel(w / 2, h / 2).0, [255, 255, 255, 255]);
        }
    }

    #[test]
    fn marks_stay_inside_small_sheets() {
        for m in crop_marks(4, 3, CropMarkStyle::default()) {
            assert!(m.right() <= 4 && m.bottom() <= 3, "{m:?}");
        }
    }

    #[test]
    fn slicing_leaves_the_canvas_untouched() {
        let canvas = white(9, 9);
        let _ = slice(&canvas, PrintType::Back, CropMarkStyle::default());
        assert!(canvas.pixels().all(|p| p.0 == [255, 255, 255, 255]));
    }
}
