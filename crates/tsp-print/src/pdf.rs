// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF sheet writer built on `printpdf` 0.8.
//
// Each raster becomes one borderless page, scaled to fit the sheet while
// keeping its aspect ratio and centred. printpdf builds documents from
// `PdfPage` op lists and serialises them in one go, so pages are collected
// first and `finish` produces the bytes.

use image::{Rgb, RgbImage, RgbaImage};
use printpdf::{
    Mm, Op, PdfDocument, PdfPage, PdfSaveOptions, PdfWarnMsg, Pt, RawImage, RawImageData, RawImageFormat,
    XObjectTransform,
};
use tracing::{debug, info, instrument, warn};

use tsp_core::PaperSize;
use tsp_core::error::{Result, TspError};

/// Accumulates raster pages into a PDF document.
pub struct PdfSheetWriter {
    doc: PdfDocument,
    pages: Vec<PdfPage>,
    paper_size: PaperSize,
    dpi: f32,
}

impl PdfSheetWriter {
    pub fn new(title: &str, paper_size: PaperSize, dpi: u32) -> Self {
        Self {
            doc: PdfDocument::new(title),
            pages: Vec::new(),
            paper_size,
            dpi: dpi.max(1) as f32,
        }
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page_dimensions(&self) -> (Mm, Mm) {
        let (w_mm, h_mm) = self.paper_size.dimensions_mm();
        (Mm(w_mm as f32), Mm(h_mm as f32))
    }

    /// Add `raster` as the next page.
    #[instrument(skip_all, fields(page = self.pages.len(), width = raster.width(), height = raster.height()))]
    pub fn add_page(&mut self, raster: &RgbaImage) -> Result<()> {
        let (width, height) = raster.dimensions();
        if width == 0 || height == 0 {
            return Err(TspError::ImageError("page raster has no pixels".into()));
        }

        let rgb = flatten_on_white(raster);
        let raw = RawImage {
            pixels: RawImageData::U8(rgb.into_raw()),
            width: width as usize,
            height: height as usize,
            data_format: RawImageFormat::RGB8,
            tag: Vec::new(),
        };
        let xobject_id = self.doc.add_image(&raw);

        let (page_w, page_h) = self.page_dimensions();
        let page_w_pt = page_w.into_pt().0;
        let page_h_pt = page_h.into_pt().0;
        let img_w_pt = width as f32 / self.dpi * 72.0;
        let img_h_pt = height as f32 / self.dpi * 72.0;
        let scale = (page_w_pt / img_w_pt).min(page_h_pt / img_h_pt);
        let x_offset = (page_w_pt - img_w_pt * scale) / 2.0;
        let y_offset = (page_h_pt - img_h_pt * scale) / 2.0;

        let ops = vec![Op::UseXobject {
            id: xobject_id,
            transform: XObjectTransform {
                translate_x: Some(Pt(x_offset)),
                translate_y: Some(Pt(y_offset)),
                scale_x: Some(scale),
                scale_y: Some(scale),
                dpi: Some(self.dpi),
                rotate: None,
            },
        }];
        self.pages.push(PdfPage::new(page_w, page_h, ops));
        debug!(scale, x_offset, y_offset, "Page placed");
        Ok(())
    }

    /// Serialise every added page.
    pub fn finish(mut self) -> Result<Vec<u8>> {
        if self.pages.is_empty() {
            return Err(TspError::NoPages);
        }
        let count = self.pages.len();
        self.doc.with_pages(self.pages);

        let mut warnings: Vec<PdfWarnMsg> = Vec::new();
        let bytes = self.doc.save(&PdfSaveOptions::default(), &mut warnings);
        if !warnings.is_empty() {
            warn!(count = warnings.len(), "PDF serialiser reported warnings");
        }
        info!(pages = count, bytes = bytes.len(), "PDF document written");
        Ok(bytes)
    }
}

/// Composite an RGBA raster over white paper.
pub fn flatten_on_white(raster: &RgbaImage) -> RgbImage {
    RgbImage::from_fn(raster.width(), raster.height(), |x, y| {
        let [r, g, b, a] = raster.get_pixel(x, y).0;
        let over = |c: u8| ((c as u32 * a as u32 + 255 * (255 - a as u32) + 127) / 255) as u8;
        Rgb([over(r), over(g), over(b)])
    })
}
